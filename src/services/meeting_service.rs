//! Meeting service layer.
//!
//! Fetch, create and list meetings, including deal-scoped listings with
//! client-side filtering and ordering.

use crate::associations::AssociationResolver;
use crate::client::CrmClient;
use crate::domain::{exclude_automated_bookings, DateConverter, SortFallback};
use crate::error::{CrmApiError, CrmResult, OperationContext};
use crate::models::properties::{common, meeting};
use crate::models::{
    AssociationTarget, CrmObject, DealObjects, FilterGroup, ObjectList, ObjectType, SearchFilter,
    SearchRequest, SortDirection,
};
use crate::services::{default_limit, default_search_limit, require_non_blank, search_by_ids};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The only activity type configured for meetings in the portal.
pub const DEFAULT_MEETING_TYPE: &str = "Workshop";

const VALID_MEETING_TYPES: &[&str] = &[DEFAULT_MEETING_TYPE];

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CreateMeetingParams {
    /// Meeting title
    pub title: String,
    /// Start time, ISO-8601
    pub start_time: String,
    /// End time, ISO-8601
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// HubSpot owner id of the meeting creator
    #[serde(default)]
    pub owner_id: Option<String>,
    /// SCHEDULED, COMPLETED, RESCHEDULED, NO_SHOW or CANCELED
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact_ids: Vec<String>,
    #[serde(default)]
    pub deal_ids: Vec<String>,
    /// Activity type; only "Workshop" is configured
    #[serde(default)]
    pub meeting_type: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DealMeetingsParams {
    pub deal_id: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Only meetings with this outcome, e.g. COMPLETED
    #[serde(default)]
    pub outcome_filter: Option<String>,
    /// Drop meetings booked through scheduling links such as Calendly
    #[serde(default)]
    pub exclude_calendly: bool,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchMeetingsParams {
    /// Term to look for in meeting bodies
    pub search_term: String,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

/// A created object and any adjustments made to the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedMeeting {
    #[serde(flatten)]
    pub meeting: CrmObject,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait MeetingService: Send + Sync {
    async fn get_meeting_details(
        &self,
        meeting_id: &str,
        properties: Option<Vec<String>>,
    ) -> CrmResult<CrmObject>;

    async fn create_meeting(&self, params: CreateMeetingParams) -> CrmResult<CreatedMeeting>;

    async fn get_deal_meetings(&self, params: DealMeetingsParams)
        -> CrmResult<DealObjects<CrmObject>>;

    async fn search_meetings(&self, params: SearchMeetingsParams)
        -> CrmResult<ObjectList<CrmObject>>;
}

pub struct MeetingServiceImpl {
    client: CrmClient,
    associations: AssociationResolver,
}

impl MeetingServiceImpl {
    pub fn new(client: CrmClient) -> Self {
        Self {
            associations: AssociationResolver::new(client.clone()),
            client,
        }
    }

    /// Map the requested meeting type onto a configured one.
    fn resolve_meeting_type(requested: Option<&str>) -> (String, Option<String>) {
        match requested.map(str::trim).filter(|t| !t.is_empty()) {
            None => (DEFAULT_MEETING_TYPE.to_string(), None),
            Some(t) if VALID_MEETING_TYPES.contains(&t) => (t.to_string(), None),
            Some(t) => {
                let warning = format!(
                    "Meeting type '{}' is not configured; using '{}'",
                    t, DEFAULT_MEETING_TYPE
                );
                tracing::warn!("{}", warning);
                (DEFAULT_MEETING_TYPE.to_string(), Some(warning))
            }
        }
    }

    fn build_properties(
        params: &CreateMeetingParams,
        meeting_type: String,
        context: &OperationContext,
    ) -> CrmResult<BTreeMap<String, String>> {
        let start_ms = DateConverter::to_remote_units(&params.start_time)
            .map_err(|e| e.with_context(context.clone()))?;

        let mut properties = BTreeMap::new();
        properties.insert(meeting::TITLE.to_string(), params.title.trim().to_string());
        properties.insert(common::TIMESTAMP.to_string(), start_ms.to_string());
        properties.insert(meeting::START_TIME.to_string(), start_ms.to_string());
        properties.insert(meeting::ACTIVITY_TYPE.to_string(), meeting_type);

        if let Some(end_time) = &params.end_time {
            let end_ms = DateConverter::to_remote_units(end_time)
                .map_err(|e| e.with_context(context.clone()))?;
            if end_ms < start_ms {
                return Err(CrmApiError::validation("Meeting end time is before its start time")
                    .with_context(context.clone()));
            }
            properties.insert(meeting::END_TIME.to_string(), end_ms.to_string());
        }

        let optional = [
            (meeting::BODY, &params.description),
            (common::OWNER_ID, &params.owner_id),
            (meeting::OUTCOME, &params.outcome),
            (meeting::LOCATION, &params.location),
            (meeting::INTERNAL_NOTES, &params.internal_notes),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                properties.insert(key.to_string(), value.to_string());
            }
        }

        Ok(properties)
    }
}

#[async_trait]
impl MeetingService for MeetingServiceImpl {
    async fn get_meeting_details(
        &self,
        meeting_id: &str,
        properties: Option<Vec<String>>,
    ) -> CrmResult<CrmObject> {
        let properties = properties
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ObjectType::Meeting.default_properties());
        self.client
            .get_object(ObjectType::Meeting, meeting_id, &properties)
            .await
    }

    async fn create_meeting(&self, params: CreateMeetingParams) -> CrmResult<CreatedMeeting> {
        let context = OperationContext::new("create", ObjectType::Meeting);
        require_non_blank(&params.title, "Meeting title", &context)?;

        let (meeting_type, warning) = Self::resolve_meeting_type(params.meeting_type.as_deref());
        let properties = Self::build_properties(&params, meeting_type, &context)?;

        let targets: Vec<AssociationTarget> = params
            .contact_ids
            .iter()
            .map(|id| AssociationTarget::new(ObjectType::Contact, id.as_str()))
            .chain(
                params
                    .deal_ids
                    .iter()
                    .map(|id| AssociationTarget::new(ObjectType::Deal, id.as_str())),
            )
            .collect();

        tracing::info!("Creating meeting '{}'", params.title.trim());
        let meeting = self
            .client
            .create_object(ObjectType::Meeting, properties, &targets)
            .await?;

        Ok(CreatedMeeting {
            meeting,
            warnings: warning.into_iter().collect(),
        })
    }

    async fn get_deal_meetings(
        &self,
        params: DealMeetingsParams,
    ) -> CrmResult<DealObjects<CrmObject>> {
        let context = OperationContext::new("get deal meetings", ObjectType::Deal);
        require_non_blank(&params.deal_id, "Deal id", &context)?;
        let deal_id = params.deal_id.trim();

        let meeting_ids = self
            .associations
            .list_associated(ObjectType::Deal, deal_id, ObjectType::Meeting)
            .await?;

        let mut filters = Vec::new();
        if let Some(outcome) = params.outcome_filter.as_deref().filter(|o| !o.trim().is_empty()) {
            filters.push(SearchFilter::eq(meeting::OUTCOME, outcome.trim()));
        }

        let mut meetings = search_by_ids(
            &self.client,
            ObjectType::Meeting,
            &meeting_ids,
            &filters,
            ObjectType::Meeting.default_properties(),
        )
        .await?;

        if params.exclude_calendly {
            meetings = exclude_automated_bookings(meetings);
        }
        SortFallback::sort_by_start_time(&mut meetings, params.sort_direction);
        meetings.truncate(params.limit as usize);

        tracing::info!("Found {} meeting(s) for deal {}", meetings.len(), deal_id);
        Ok(DealObjects {
            deal_id: deal_id.to_string(),
            list: ObjectList::new(meetings),
        })
    }

    async fn search_meetings(
        &self,
        params: SearchMeetingsParams,
    ) -> CrmResult<ObjectList<CrmObject>> {
        let context = OperationContext::new("search", ObjectType::Meeting);
        require_non_blank(&params.search_term, "Search term", &context)?;

        let request = SearchRequest::new()
            .with_group(
                FilterGroup::new()
                    .and(SearchFilter::contains_token(meeting::BODY, params.search_term.trim())),
            )
            .sort_by(meeting::START_TIME, params.sort_direction)
            .limit(params.limit)
            .properties(ObjectType::Meeting.default_properties());

        let page = self.client.search(ObjectType::Meeting, request).await?;
        let mut meetings = page.results;
        SortFallback::sort_by_start_time(&mut meetings, params.sort_direction);

        Ok(ObjectList::new(meetings)
            .with_total(page.total)
            .with_warnings(page.warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_type_fallback() {
        assert_eq!(
            MeetingServiceImpl::resolve_meeting_type(None),
            ("Workshop".to_string(), None)
        );
        assert_eq!(
            MeetingServiceImpl::resolve_meeting_type(Some("Workshop")),
            ("Workshop".to_string(), None)
        );
        let (meeting_type, warning) = MeetingServiceImpl::resolve_meeting_type(Some("Demo"));
        assert_eq!(meeting_type, "Workshop");
        assert!(warning.unwrap().contains("Demo"));
    }

    #[test]
    fn test_build_properties() {
        let params = CreateMeetingParams {
            title: "Kickoff".to_string(),
            start_time: "2024-01-15T10:00:00Z".to_string(),
            end_time: Some("2024-01-15T11:00:00Z".to_string()),
            location: Some("  ".to_string()),
            outcome: Some("SCHEDULED".to_string()),
            ..CreateMeetingParams::default()
        };
        let context = OperationContext::new("create", ObjectType::Meeting);
        let properties =
            MeetingServiceImpl::build_properties(&params, "Workshop".to_string(), &context).unwrap();

        assert_eq!(properties["hs_meeting_title"], "Kickoff");
        assert_eq!(properties["hs_timestamp"], "1705312800000");
        assert_eq!(properties["hs_meeting_start_time"], "1705312800000");
        assert_eq!(properties["hs_meeting_end_time"], "1705316400000");
        assert_eq!(properties["hs_meeting_outcome"], "SCHEDULED");
        assert_eq!(properties["hs_activity_type"], "Workshop");
        assert!(!properties.contains_key("hs_meeting_location"));
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let params = CreateMeetingParams {
            title: "Kickoff".to_string(),
            start_time: "2024-01-15T10:00:00Z".to_string(),
            end_time: Some("2024-01-15T09:00:00Z".to_string()),
            ..CreateMeetingParams::default()
        };
        let context = OperationContext::new("create", ObjectType::Meeting);
        let err = MeetingServiceImpl::build_properties(&params, "Workshop".to_string(), &context)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }
}
