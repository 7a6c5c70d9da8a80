//! Record lookup from id, email or name.

mod mocks;

use hubspot_mcp_server::client::HttpMethod;
use hubspot_mcp_server::error::ErrorKind;
use hubspot_mcp_server::matching::{FuzzyMatchResolver, LookupQuery};
use hubspot_mcp_server::models::ObjectType;
use mocks::ScriptedTransport;

const DEAL_SEARCH: &str = "/crm/v3/objects/deals/search";
const CONTACT_SEARCH: &str = "/crm/v3/objects/contacts/search";

#[tokio::test(start_paused = true)]
async fn test_name_lookup_picks_most_recently_updated() {
    let transport = ScriptedTransport::new();
    transport.respond(
        HttpMethod::Post,
        DEAL_SEARCH,
        200,
        r#"{
            "total": 2,
            "results": [
                {"id": "101", "properties": {"dealname": "Acme renewal"}, "updatedAt": "2024-01-02T09:00:00Z"},
                {"id": "102", "properties": {"dealname": "Acme renewal"}, "updatedAt": "2024-01-05T09:00:00Z"}
            ]
        }"#,
    );

    let resolver = FuzzyMatchResolver::new(transport.client(4), ObjectType::Deal);
    let deal = resolver
        .resolve(&LookupQuery::by_name("Acme renewal"))
        .await
        .unwrap();

    assert_eq!(deal.id, "102");
    assert_eq!(deal.property("dealname"), Some("Acme renewal"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let body = calls[0].request.body.as_ref().unwrap();
    assert_eq!(
        body["filterGroups"][0]["filters"][0]["propertyName"],
        "dealname"
    );
    assert_eq!(
        body["filterGroups"][0]["filters"][0]["operator"],
        "CONTAINS_TOKEN"
    );
}

#[tokio::test(start_paused = true)]
async fn test_id_takes_precedence() {
    let transport = ScriptedTransport::new();
    transport.respond(
        HttpMethod::Get,
        "/crm/v3/objects/deals/9",
        200,
        r#"{"id": "9", "properties": {"dealname": "Globex"}}"#,
    );

    let resolver = FuzzyMatchResolver::new(transport.client(4), ObjectType::Deal);
    let query = LookupQuery::new(Some("9".to_string()), None, Some("Acme".to_string()));
    let deal = resolver.resolve(&query).await.unwrap();

    assert_eq!(deal.id, "9");
    assert!(transport.calls_to(HttpMethod::Post, DEAL_SEARCH).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_email_lookup_uses_exact_match() {
    let transport = ScriptedTransport::new();
    transport.respond(
        HttpMethod::Post,
        CONTACT_SEARCH,
        200,
        r#"{"total": 1, "results": [{"id": "7", "properties": {"email": "jane@acme.io", "firstname": "Jane"}}]}"#,
    );

    let resolver = FuzzyMatchResolver::new(transport.client(4), ObjectType::Contact);
    let contact = resolver
        .resolve(&LookupQuery::by_email("jane@acme.io"))
        .await
        .unwrap();

    assert_eq!(contact.id, "7");
    let body = transport.calls()[0].request.body.clone().unwrap();
    assert_eq!(body["filterGroups"][0]["filters"][0]["propertyName"], "email");
    assert_eq!(body["filterGroups"][0]["filters"][0]["operator"], "EQ");
    assert_eq!(body["filterGroups"][0]["filters"][0]["value"], "jane@acme.io");
}

#[tokio::test(start_paused = true)]
async fn test_no_match_is_not_found() {
    let transport = ScriptedTransport::new();
    transport.respond(HttpMethod::Post, DEAL_SEARCH, 200, r#"{"total": 0, "results": []}"#);

    let resolver = FuzzyMatchResolver::new(transport.client(4), ObjectType::Deal);
    let err = resolver
        .resolve(&LookupQuery::by_name("Nothing like it"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.context.unwrap().action, "resolve");
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_is_not_found_without_calls() {
    let transport = ScriptedTransport::new();
    let resolver = FuzzyMatchResolver::new(transport.client(4), ObjectType::Contact);

    let query = LookupQuery::new(Some("  ".to_string()), None, Some(String::new()));
    let err = resolver.resolve(&query).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_email_on_deal_is_validation() {
    let transport = ScriptedTransport::new();
    let resolver = FuzzyMatchResolver::new(transport.client(4), ObjectType::Deal);

    let err = resolver
        .resolve(&LookupQuery::by_email("ops@acme.io"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(transport.call_count(), 0);
}
