//! Meeting and note operations against a scripted transport.

mod mocks;

use hubspot_mcp_server::client::HttpMethod;
use hubspot_mcp_server::error::ErrorKind;
use hubspot_mcp_server::models::SortDirection;
use hubspot_mcp_server::services::{
    CreateMeetingParams, DealMeetingsParams, DealNotesParams, MeetingService, MeetingServiceImpl,
    NoteService, NoteServiceImpl, SearchMeetingsParams,
};
use mocks::ScriptedTransport;

const MEETING_SEARCH: &str = "/crm/v3/objects/meetings/search";

fn ids(objects: &[hubspot_mcp_server::CrmObject]) -> Vec<&str> {
    objects.iter().map(|o| o.id.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_deal_meetings_filter_sort_and_limit() {
    let transport = ScriptedTransport::new();
    transport
        .respond(
            HttpMethod::Get,
            "/crm/v4/objects/deal/500/associations/meeting",
            200,
            r#"{"results": [{"toObjectId": 1}, {"toObjectId": 2}, {"toObjectId": 3}, {"toObjectId": 4}]}"#,
        )
        .respond(
            HttpMethod::Post,
            MEETING_SEARCH,
            200,
            r#"{
                "total": 4,
                "results": [
                    {"id": "1", "properties": {"hs_meeting_title": "Scoping", "hs_meeting_start_time": "2024-01-10T10:00:00Z"}},
                    {"id": "2", "properties": {"hs_meeting_title": "Intro", "hs_meeting_external_url": "https://calendly.com/acme/intro", "hs_meeting_start_time": "2024-03-01T10:00:00Z"}},
                    {"id": "3", "properties": {"hs_meeting_title": "Pricing review", "hs_meeting_start_time": null}},
                    {"id": "4", "properties": {"hs_meeting_title": "Kickoff", "hs_meeting_start_time": "2024-02-01T10:00:00Z"}}
                ]
            }"#,
        );

    let service = MeetingServiceImpl::new(transport.client(4));
    let result = service
        .get_deal_meetings(DealMeetingsParams {
            deal_id: "500".to_string(),
            limit: 2,
            outcome_filter: Some("COMPLETED".to_string()),
            exclude_calendly: true,
            sort_direction: SortDirection::Descending,
        })
        .await
        .unwrap();

    assert_eq!(result.deal_id, "500");
    assert_eq!(ids(&result.list.results), vec!["4", "1"]);

    let body = transport.calls_to(HttpMethod::Post, MEETING_SEARCH)[0]
        .request
        .body
        .clone()
        .unwrap();
    let filters = body["filterGroups"][0]["filters"].as_array().unwrap();
    assert_eq!(filters[0]["propertyName"], "hs_object_id");
    assert_eq!(filters[0]["operator"], "IN");
    assert_eq!(filters[0]["values"].as_array().unwrap().len(), 4);
    assert_eq!(filters[1]["propertyName"], "hs_meeting_outcome");
    assert_eq!(filters[1]["value"], "COMPLETED");
}

#[tokio::test(start_paused = true)]
async fn test_deal_without_meetings_skips_search() {
    let transport = ScriptedTransport::new();
    transport.respond(
        HttpMethod::Get,
        "/crm/v4/objects/deal/500/associations/meeting",
        200,
        r#"{"results": []}"#,
    );

    let service = MeetingServiceImpl::new(transport.client(4));
    let result = service
        .get_deal_meetings(DealMeetingsParams {
            deal_id: "500".to_string(),
            limit: 100,
            outcome_filter: None,
            exclude_calendly: false,
            sort_direction: SortDirection::Ascending,
        })
        .await
        .unwrap();

    assert!(result.list.results.is_empty());
    assert!(transport.calls_to(HttpMethod::Post, MEETING_SEARCH).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_meeting_falls_back_to_workshop() {
    let transport = ScriptedTransport::new();
    transport.respond(
        HttpMethod::Post,
        "/crm/v3/objects/meetings",
        201,
        r#"{"id": "77", "properties": {"hs_meeting_title": "Kickoff", "hs_activity_type": "Workshop"}}"#,
    );

    let service = MeetingServiceImpl::new(transport.client(4));
    let created = service
        .create_meeting(CreateMeetingParams {
            title: "Kickoff".to_string(),
            start_time: "2024-01-15T10:00:00Z".to_string(),
            contact_ids: vec!["600".to_string()],
            deal_ids: vec!["500".to_string()],
            meeting_type: Some("Demo".to_string()),
            ..CreateMeetingParams::default()
        })
        .await
        .unwrap();

    assert_eq!(created.meeting.id, "77");
    assert_eq!(created.warnings.len(), 1);

    let body = transport.calls()[0].request.body.clone().unwrap();
    assert_eq!(body["properties"]["hs_activity_type"], "Workshop");
    assert_eq!(body["properties"]["hs_timestamp"], "1705312800000");
    let links = body["associations"].as_array().unwrap();
    assert_eq!(links[0]["types"][0]["associationTypeId"], 200);
    assert_eq!(links[1]["types"][0]["associationTypeId"], 212);
}

#[tokio::test(start_paused = true)]
async fn test_create_meeting_requires_title() {
    let transport = ScriptedTransport::new();
    let service = MeetingServiceImpl::new(transport.client(4));

    let err = service
        .create_meeting(CreateMeetingParams {
            title: "   ".to_string(),
            start_time: "2024-01-15T10:00:00Z".to_string(),
            ..CreateMeetingParams::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_search_meetings_orders_locally() {
    let transport = ScriptedTransport::new();
    transport.respond(
        HttpMethod::Post,
        MEETING_SEARCH,
        200,
        r#"{
            "total": 2,
            "results": [
                {"id": "1", "properties": {"hs_meeting_start_time": "2024-01-10T10:00:00Z"}},
                {"id": "2", "properties": {"hs_meeting_start_time": "2024-02-10T10:00:00Z"}}
            ]
        }"#,
    );

    let service = MeetingServiceImpl::new(transport.client(4));
    let list = service
        .search_meetings(SearchMeetingsParams {
            search_term: "renewal".to_string(),
            limit: 10,
            sort_direction: SortDirection::Descending,
        })
        .await
        .unwrap();

    assert_eq!(ids(&list.results), vec!["2", "1"]);
    let body = transport.calls()[0].request.body.clone().unwrap();
    assert_eq!(body["filterGroups"][0]["filters"][0]["operator"], "CONTAINS_TOKEN");
    assert_eq!(body["filterGroups"][0]["filters"][0]["value"], "renewal");
    assert_eq!(body["sorts"][0]["propertyName"], "hs_meeting_start_time");
}

#[tokio::test(start_paused = true)]
async fn test_deal_notes_sorted_by_timestamp() {
    let transport = ScriptedTransport::new();
    transport
        .respond(
            HttpMethod::Get,
            "/crm/v4/objects/deal/500/associations/note",
            200,
            r#"{"results": [{"toObjectId": 11}, {"toObjectId": 12}]}"#,
        )
        .respond(
            HttpMethod::Post,
            "/crm/v3/objects/notes/search",
            200,
            r#"{
                "total": 2,
                "results": [
                    {"id": "11", "properties": {"hs_note_body": "First call", "hs_timestamp": "1704067200000"}},
                    {"id": "12", "properties": {"hs_note_body": "Follow-up", "hs_timestamp": "1706745600000"}}
                ]
            }"#,
        );

    let service = NoteServiceImpl::new(transport.client(4));
    let result = service
        .get_deal_notes(DealNotesParams {
            deal_id: "500".to_string(),
            limit: 100,
            sort_direction: SortDirection::Descending,
        })
        .await
        .unwrap();

    assert_eq!(ids(&result.list.results), vec!["12", "11"]);
}

#[tokio::test(start_paused = true)]
async fn test_deal_notes_surfaces_search_failure() {
    let transport = ScriptedTransport::new();
    transport
        .respond(
            HttpMethod::Get,
            "/crm/v4/objects/deal/500/associations/note",
            200,
            r#"{"results": [{"toObjectId": 11}]}"#,
        )
        .respond(
            HttpMethod::Post,
            "/crm/v3/objects/notes/search",
            403,
            r#"{"message": "This app hasn't been granted all required scopes"}"#,
        );

    let service = NoteServiceImpl::new(transport.client(4));
    let err = service
        .get_deal_notes(DealNotesParams {
            deal_id: "500".to_string(),
            limit: 100,
            sort_direction: SortDirection::Descending,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Permission);
    assert_eq!(err.context.unwrap().action, "search");
    assert_eq!(
        transport
            .calls_to(HttpMethod::Post, "/crm/v3/objects/notes/search")
            .len(),
        1
    );
}
