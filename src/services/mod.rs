//! Application service layer.
//!
//! Services implement the logical operations exposed as MCP tools. They
//! validate input, orchestrate the client and resolvers, and post-process the
//! results. They provide a clean boundary between the MCP handlers and the
//! client engine.

mod meeting_service;
mod note_service;
mod task_service;

pub use meeting_service::{
    CreateMeetingParams, DealMeetingsParams, MeetingService, MeetingServiceImpl,
    SearchMeetingsParams, DEFAULT_MEETING_TYPE,
};
pub use note_service::{DealNotesParams, NoteService, NoteServiceImpl};
pub use task_service::{
    CompleteTaskParams, ContactTasksParams, CreateTaskParams, DealTasksParams, GetTasksParams,
    OverdueTasksParams, TaskPriority, TaskService, TaskServiceImpl, UpdateTaskParams,
};

use crate::client::{CrmClient, MAX_PAGE_SIZE};
use crate::error::{CrmApiError, CrmResult, OperationContext};
use crate::models::properties::common;
use crate::models::{CrmObject, FilterGroup, ObjectType, SearchFilter, SearchRequest};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;

/// Source of "now" for time-dependent operations.
pub type Clock = fn() -> DateTime<Utc>;

pub fn system_clock() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn default_limit() -> u32 {
    100
}

pub(crate) fn default_search_limit() -> u32 {
    10
}

/// Reject blank required input with a `Validation` error.
pub(crate) fn require_non_blank(
    value: &str,
    field: &str,
    context: &OperationContext,
) -> CrmResult<()> {
    if value.trim().is_empty() {
        return Err(CrmApiError::validation(format!("{} cannot be empty", field))
            .with_context(context.clone()));
    }
    Ok(())
}

/// Fetch objects by id through the search API, so extra filters can apply.
///
/// Ids are queried in chunks of [`MAX_PAGE_SIZE`] (the `IN` operator's limit),
/// concurrently. Result order is unspecified.
pub(crate) async fn search_by_ids(
    client: &CrmClient,
    object_type: ObjectType,
    ids: &[String],
    extra_filters: &[SearchFilter],
    properties: Vec<String>,
) -> CrmResult<Vec<CrmObject>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let searches = ids.chunks(MAX_PAGE_SIZE as usize).map(|chunk| {
        let mut group = FilterGroup::new().and(SearchFilter::is_in(common::OBJECT_ID, chunk.to_vec()));
        for filter in extra_filters {
            group = group.and(filter.clone());
        }
        let request = SearchRequest::new()
            .with_group(group)
            .limit(MAX_PAGE_SIZE)
            .properties(properties.clone());
        client.search_all(object_type, request, 1 + chunk.len() / MAX_PAGE_SIZE as usize)
    });

    let pages = try_join_all(searches).await?;
    Ok(pages.into_iter().flat_map(|page| page.results).collect())
}
