//! HTTP client for the HubSpot CRM v3/v4 APIs.
//!
//! [`CrmClient`] builds requests for each logical operation and runs them
//! through the [`RetryEngine`]. Every error it returns is a classified
//! [`CrmApiError`] tagged with the operation it came from.

pub mod classifier;
pub mod retry;
pub mod transport;

pub use classifier::ErrorClassifier;
pub use retry::{RetryEngine, RetryPolicy, RetryState};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, Transport, UreqTransport};

use crate::associations::AssociationResolver;
use crate::config::Config;
use crate::error::{CrmApiError, CrmResult, OperationContext};
use crate::metrics::Metrics;
use crate::models::object::json_scalar_to_string;
use crate::models::{AssociationTarget, CrmObject, ObjectType, RawObject, SearchRequest};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Largest page the search and batch endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when listing associations.
pub const ASSOCIATION_PAGE_SIZE: u32 = 500;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    results: Vec<RawObject>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<RawObject>,
    #[serde(default)]
    errors: Vec<BatchError>,
}

#[derive(Debug, Deserialize)]
struct BatchError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AssociationResponse {
    #[serde(default)]
    results: Vec<AssociationEntry>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssociationEntry {
    to_object_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<PagingNext>,
}

#[derive(Debug, Deserialize)]
struct PagingNext {
    after: Option<String>,
}

impl Paging {
    fn next_after(self) -> Option<String> {
        self.next.and_then(|n| n.after).filter(|a| !a.is_empty())
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub results: Vec<CrmObject>,
    pub total: usize,
    pub next_after: Option<String>,
    pub warnings: Vec<String>,
}

/// One page of associated record ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationPage {
    pub ids: Vec<String>,
    pub next_after: Option<String>,
}

/// Clamp a requested page size to the API maximum, with a warning when it had to change.
pub fn clamp_page_size(requested: u32) -> (u32, Option<String>) {
    if requested > MAX_PAGE_SIZE {
        let warning = format!(
            "Requested limit {} exceeds the maximum page size of {}; using {}",
            requested, MAX_PAGE_SIZE, MAX_PAGE_SIZE
        );
        tracing::warn!("{}", warning);
        (MAX_PAGE_SIZE, Some(warning))
    } else {
        (requested.max(1), None)
    }
}

/// HubSpot CRM client.
///
/// Cheap to clone; clones share the transport, retry policy and metrics.
#[derive(Clone)]
pub struct CrmClient {
    engine: Arc<RetryEngine>,
}

impl CrmClient {
    /// Create a client backed by a `ureq` transport.
    pub fn new(config: &Config) -> Self {
        let transport = Arc::new(UreqTransport::new(config)) as Arc<dyn Transport>;
        Self::with_transport(transport, RetryPolicy::from_config(config))
    }

    /// Create a client over any transport (useful for testing).
    pub fn with_transport(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            engine: Arc::new(RetryEngine::new(transport, policy)),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        self.engine.metrics()
    }

    async fn execute(
        &self,
        request: ApiRequest,
        context: &OperationContext,
    ) -> CrmResult<ApiResponse> {
        self.engine
            .execute(&request)
            .await
            .map_err(|e| e.with_context(context.clone()))
    }

    fn decode<T: DeserializeOwned>(
        response: &ApiResponse,
        context: &OperationContext,
    ) -> CrmResult<T> {
        response.json().map_err(|e| {
            ErrorClassifier::undecodable(response, &e).with_context(context.clone())
        })
    }

    fn objects_path(object_type: ObjectType) -> String {
        format!("/crm/v3/objects/{}", object_type.plural())
    }

    fn object_path(object_type: ObjectType, id: &str) -> String {
        format!(
            "/crm/v3/objects/{}/{}",
            object_type.plural(),
            urlencoding::encode(id)
        )
    }

    fn require_id(id: &str, context: &OperationContext) -> CrmResult<()> {
        if id.trim().is_empty() {
            return Err(
                CrmApiError::validation("Object id cannot be empty").with_context(context.clone())
            );
        }
        Ok(())
    }

    /// Fetch one object by id.
    pub async fn get_object(
        &self,
        object_type: ObjectType,
        id: &str,
        properties: &[String],
    ) -> CrmResult<CrmObject> {
        let context = OperationContext::new("get", object_type).with_id(id);
        Self::require_id(id, &context)?;

        let mut request = ApiRequest::get(Self::object_path(object_type, id));
        if !properties.is_empty() {
            request = request.with_query("properties", properties.join(","));
        }

        tracing::debug!("Fetching {} {}", object_type, id);
        let response = self.execute(request, &context).await?;
        let raw: RawObject = Self::decode(&response, &context)?;
        self.metrics().record_objects_fetched(1);
        Ok(CrmObject::from_raw(object_type, raw))
    }

    /// Run one search page. Limits above [`MAX_PAGE_SIZE`] are clamped and
    /// reported in `warnings`.
    pub async fn search(
        &self,
        object_type: ObjectType,
        mut request: SearchRequest,
    ) -> CrmResult<SearchPage> {
        let context = OperationContext::new("search", object_type);
        let (limit, warning) = clamp_page_size(request.limit);
        request.limit = limit;

        let body = serde_json::to_value(&request).map_err(|e| {
            CrmApiError::validation(format!("Failed to encode search request: {}", e))
                .with_context(context.clone())
        })?;

        tracing::debug!(
            "Searching {} with {} filter group(s)",
            object_type,
            request.filter_groups.len()
        );
        let response = self
            .execute(
                ApiRequest::post(format!("{}/search", Self::objects_path(object_type)), body),
                &context,
            )
            .await?;
        let parsed: SearchResponse = Self::decode(&response, &context)?;

        let results: Vec<CrmObject> = parsed
            .results
            .into_iter()
            .map(|raw| CrmObject::from_raw(object_type, raw))
            .collect();
        self.metrics().record_objects_fetched(results.len());

        Ok(SearchPage {
            total: parsed.total.max(results.len()),
            results,
            next_after: parsed.paging.and_then(Paging::next_after),
            warnings: warning.into_iter().collect(),
        })
    }

    /// Follow search pages until exhausted or `max_pages` have been read.
    pub async fn search_all(
        &self,
        object_type: ObjectType,
        request: SearchRequest,
        max_pages: usize,
    ) -> CrmResult<SearchPage> {
        let mut combined = SearchPage {
            results: Vec::new(),
            total: 0,
            next_after: None,
            warnings: Vec::new(),
        };
        let mut after: Option<String> = None;

        for _ in 0..max_pages.max(1) {
            let page = self
                .search(object_type, request.clone().after(after.take()))
                .await?;
            combined.total = page.total;
            combined.results.extend(page.results);
            for warning in page.warnings {
                if !combined.warnings.contains(&warning) {
                    combined.warnings.push(warning);
                }
            }
            match page.next_after {
                Some(next) => after = Some(next),
                None => return Ok(combined),
            }
        }

        tracing::warn!(
            "Stopped paging {} search after {} page(s)",
            object_type,
            max_pages
        );
        combined.next_after = after;
        Ok(combined)
    }

    /// Batch read objects by id, in chunks of [`MAX_PAGE_SIZE`].
    ///
    /// Ids the API reports as missing are logged and left out of the result.
    pub async fn batch_read(
        &self,
        object_type: ObjectType,
        ids: &[String],
        properties: &[String],
    ) -> CrmResult<Vec<CrmObject>> {
        let context = OperationContext::new("batch read", object_type);
        let mut objects = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_PAGE_SIZE as usize) {
            let inputs: Vec<_> = chunk.iter().map(|id| json!({ "id": id })).collect();
            let body = json!({ "inputs": inputs, "properties": properties });
            let response = self
                .execute(
                    ApiRequest::post(format!("{}/batch/read", Self::objects_path(object_type)), body),
                    &context,
                )
                .await?;
            let parsed: BatchResponse = Self::decode(&response, &context)?;

            for error in &parsed.errors {
                tracing::warn!("Batch read of {} reported: {}", object_type, error.message);
            }
            objects.extend(
                parsed
                    .results
                    .into_iter()
                    .map(|raw| CrmObject::from_raw(object_type, raw)),
            );
        }

        self.metrics().record_objects_fetched(objects.len());
        Ok(objects)
    }

    /// Create an object, linking it to `associations` in the same request.
    ///
    /// Association payloads are resolved before anything is sent, so an
    /// unregistered pair fails without a network call.
    pub async fn create_object(
        &self,
        object_type: ObjectType,
        properties: BTreeMap<String, String>,
        associations: &[AssociationTarget],
    ) -> CrmResult<CrmObject> {
        let context = OperationContext::new("create", object_type);
        let links = AssociationResolver::build_payloads(object_type, associations)
            .map_err(|e| e.with_context(context.clone()))?;

        let mut body = json!({ "properties": properties });
        if !links.is_empty() {
            body["associations"] = serde_json::to_value(&links).map_err(|e| {
                CrmApiError::validation(format!("Failed to encode associations: {}", e))
                    .with_context(context.clone())
            })?;
        }

        tracing::debug!(
            "Creating {} with {} association(s)",
            object_type.singular(),
            links.len()
        );
        let response = self
            .execute(ApiRequest::post(Self::objects_path(object_type), body), &context)
            .await?;
        let raw: RawObject = Self::decode(&response, &context)?;
        tracing::info!("Created {} {}", object_type.singular(), raw.id);
        Ok(CrmObject::from_raw(object_type, raw))
    }

    /// Patch properties of an existing object.
    pub async fn update_object(
        &self,
        object_type: ObjectType,
        id: &str,
        properties: BTreeMap<String, String>,
    ) -> CrmResult<CrmObject> {
        let context = OperationContext::new("update", object_type).with_id(id);
        Self::require_id(id, &context)?;
        if properties.is_empty() {
            return Err(CrmApiError::validation("No properties provided to update")
                .with_context(context));
        }

        let body = json!({ "properties": properties });
        let response = self
            .execute(ApiRequest::patch(Self::object_path(object_type, id), body), &context)
            .await?;
        let raw: RawObject = Self::decode(&response, &context)?;
        tracing::info!("Updated {} {}", object_type.singular(), id);
        Ok(CrmObject::from_raw(object_type, raw))
    }

    /// Fetch one page of ids associated with an object.
    pub async fn list_association_page(
        &self,
        from_type: ObjectType,
        from_id: &str,
        to_type: ObjectType,
        after: Option<&str>,
    ) -> CrmResult<AssociationPage> {
        let context = OperationContext::new("list associations", from_type).with_id(from_id);
        Self::require_id(from_id, &context)?;

        let path = format!(
            "/crm/v4/objects/{}/{}/associations/{}",
            from_type.singular(),
            urlencoding::encode(from_id),
            to_type.singular()
        );
        let mut request = ApiRequest::get(path).with_query("limit", ASSOCIATION_PAGE_SIZE.to_string());
        if let Some(after) = after {
            request = request.with_query("after", after);
        }

        let response = self.execute(request, &context).await?;
        let parsed: AssociationResponse = Self::decode(&response, &context)?;

        Ok(AssociationPage {
            ids: parsed
                .results
                .iter()
                .filter_map(|entry| json_scalar_to_string(&entry.to_object_id))
                .collect(),
            next_after: parsed.paging.and_then(Paging::next_after),
        })
    }
}
