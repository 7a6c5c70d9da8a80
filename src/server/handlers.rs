//! MCP tool handlers for the HubSpot server.
//!
//! This module implements all the MCP tools using the rmcp SDK's tool_router pattern.

use crate::client::CrmClient;
use crate::error::{CrmApiError, ErrorKind};
use crate::services::{
    CompleteTaskParams, ContactTasksParams, CreateMeetingParams, CreateTaskParams,
    DealMeetingsParams, DealNotesParams, DealTasksParams, GetTasksParams, MeetingService,
    MeetingServiceImpl, NoteService, NoteServiceImpl, OverdueTasksParams, SearchMeetingsParams,
    TaskService, TaskServiceImpl, UpdateTaskParams,
};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// The MCP server exposing HubSpot meetings, tasks and notes as tools.
#[derive(Clone)]
pub struct HubSpotMcpServer {
    meeting_service: Arc<dyn MeetingService>,
    task_service: Arc<dyn TaskService>,
    note_service: Arc<dyn NoteService>,
    tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for HubSpotMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "hubspot-mcp-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some("MCP server for HubSpot CRM - provides meeting, task and note management for deals and contacts.".into()),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MeetingIdParams {
    meeting_id: String,
    /// Properties to return; defaults to the standard meeting set
    #[serde(default)]
    properties: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TaskIdParams {
    task_id: String,
    /// Properties to return; defaults to the standard task set
    #[serde(default)]
    properties: Option<Vec<String>>,
}

/// Convert a classified client error into an MCP error.
///
/// Caller mistakes become `INVALID_PARAMS`; everything else is an internal
/// error. The kind, status and operation context travel in `data`.
pub fn to_mcp_error(e: CrmApiError) -> McpError {
    let code = match e.kind {
        ErrorKind::Validation | ErrorKind::UnregisteredAssociationPair => {
            ErrorCode::INVALID_PARAMS
        }
        _ => ErrorCode::INTERNAL_ERROR,
    };
    tracing::error!("Tool call failed: {}", e);

    McpError {
        code,
        message: Cow::from(e.to_string()),
        data: Some(serde_json::json!({
            "kind": e.kind,
            "status": e.status,
            "context": e.context,
        })),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json_response = serde_json::to_string_pretty(value).map_err(|e| McpError {
        code: ErrorCode::INTERNAL_ERROR,
        message: Cow::from(e.to_string()),
        data: None,
    })?;
    Ok(CallToolResult::success(vec![Content::text(json_response)]))
}

#[tool_router]
impl HubSpotMcpServer {
    /// Create a server from explicit service implementations.
    pub fn new(
        meeting_service: Arc<dyn MeetingService>,
        task_service: Arc<dyn TaskService>,
        note_service: Arc<dyn NoteService>,
    ) -> Self {
        Self {
            meeting_service,
            task_service,
            note_service,
            tool_router: Self::tool_router(),
        }
    }

    /// Create a server whose services all share one client.
    pub fn from_client(client: CrmClient) -> Self {
        Self::new(
            Arc::new(MeetingServiceImpl::new(client.clone())),
            Arc::new(TaskServiceImpl::new(client.clone())),
            Arc::new(NoteServiceImpl::new(client)),
        )
    }

    #[tool(description = "Get full details for a HubSpot meeting by ID")]
    async fn get_meeting_details(
        &self,
        params: Parameters<MeetingIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let meeting = self
            .meeting_service
            .get_meeting_details(&params.meeting_id, params.properties)
            .await
            .map_err(to_mcp_error)?;
        json_result(&meeting)
    }

    #[tool(
        description = "Create a meeting, optionally associated with contacts and deals. Times are ISO-8601. Meeting type defaults to Workshop."
    )]
    async fn create_meeting(
        &self,
        params: Parameters<CreateMeetingParams>,
    ) -> Result<CallToolResult, McpError> {
        let created = self
            .meeting_service
            .create_meeting(params.0)
            .await
            .map_err(to_mcp_error)?;
        tracing::info!("Meeting created: id={}", created.meeting.id);
        json_result(&created)
    }

    #[tool(
        description = "List meetings associated with a deal, optionally filtered by outcome and excluding Calendly bookings, sorted by start time"
    )]
    async fn get_deal_meetings(
        &self,
        params: Parameters<DealMeetingsParams>,
    ) -> Result<CallToolResult, McpError> {
        let meetings = self
            .meeting_service
            .get_deal_meetings(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&meetings)
    }

    #[tool(description = "Search meetings whose body contains a term")]
    async fn search_meetings(
        &self,
        params: Parameters<SearchMeetingsParams>,
    ) -> Result<CallToolResult, McpError> {
        let meetings = self
            .meeting_service
            .search_meetings(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&meetings)
    }

    #[tool(description = "List notes associated with a deal, sorted by timestamp")]
    async fn get_deal_notes(
        &self,
        params: Parameters<DealNotesParams>,
    ) -> Result<CallToolResult, McpError> {
        let notes = self
            .note_service
            .get_deal_notes(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&notes)
    }

    #[tool(
        description = "Create a task assigned to a HubSpot owner, optionally linked to a contact and a deal"
    )]
    async fn create_task(
        &self,
        params: Parameters<CreateTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        let task = self
            .task_service
            .create_task(params.0)
            .await
            .map_err(to_mcp_error)?;
        tracing::info!("Task created: id={}", task.id);
        json_result(&task)
    }

    #[tool(
        description = "List tasks filtered by owner, contact, deal, status and due date range. Each task carries overdue fields."
    )]
    async fn get_tasks(
        &self,
        params: Parameters<GetTasksParams>,
    ) -> Result<CallToolResult, McpError> {
        let tasks = self
            .task_service
            .get_tasks(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&tasks)
    }

    #[tool(description = "Get full details for a task by ID, including overdue status")]
    async fn get_task_details(
        &self,
        params: Parameters<TaskIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let task = self
            .task_service
            .get_task_details(&params.task_id, params.properties)
            .await
            .map_err(to_mcp_error)?;
        json_result(&task)
    }

    #[tool(description = "Update fields of an existing task")]
    async fn update_task(
        &self,
        params: Parameters<UpdateTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        let task = self
            .task_service
            .update_task(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&task)
    }

    #[tool(description = "Mark a task as completed, optionally recording completion notes")]
    async fn complete_task(
        &self,
        params: Parameters<CompleteTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        let task = self
            .task_service
            .complete_task(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&task)
    }

    #[tool(
        description = "List open tasks past their due date, with linked deal names and contact names/emails"
    )]
    async fn get_overdue_tasks(
        &self,
        params: Parameters<OverdueTasksParams>,
    ) -> Result<CallToolResult, McpError> {
        let tasks = self
            .task_service
            .get_overdue_tasks(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&tasks)
    }

    #[tool(
        description = "List tasks for a deal identified by ID or name. When several deals match a name, the most recently updated one is used."
    )]
    async fn get_tasks_for_deal(
        &self,
        params: Parameters<DealTasksParams>,
    ) -> Result<CallToolResult, McpError> {
        let tasks = self
            .task_service
            .get_tasks_for_deal(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&tasks)
    }

    #[tool(
        description = "List tasks for a contact identified by ID, email or name. When several contacts match a name, the most recently updated one is used."
    )]
    async fn get_tasks_for_contact(
        &self,
        params: Parameters<ContactTasksParams>,
    ) -> Result<CallToolResult, McpError> {
        let tasks = self
            .task_service
            .get_tasks_for_contact(params.0)
            .await
            .map_err(to_mcp_error)?;
        json_result(&tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationContext;
    use crate::models::ObjectType;

    #[test]
    fn test_validation_maps_to_invalid_params() {
        let err = CrmApiError::validation("No fields provided to update").with_context(
            OperationContext::new("update", ObjectType::Task).with_id("42"),
        );
        let mcp = to_mcp_error(err);
        assert_eq!(mcp.code, ErrorCode::INVALID_PARAMS);
        assert!(mcp.message.contains("update tasks 42"));

        let data = mcp.data.unwrap();
        assert_eq!(data["kind"], "Validation");
        assert_eq!(data["context"]["object_id"], "42");
    }

    #[test]
    fn test_api_errors_map_to_internal() {
        let err = CrmApiError::new(ErrorKind::RateLimited, Some(429), "slow down");
        let mcp = to_mcp_error(err);
        assert_eq!(mcp.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(mcp.data.unwrap()["status"], 429);

        let err = CrmApiError::unregistered_pair(ObjectType::Note, ObjectType::Task);
        assert_eq!(to_mcp_error(err).code, ErrorCode::INVALID_PARAMS);
    }
}
