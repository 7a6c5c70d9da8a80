//! MCP server for HubSpot CRM.
//!
//! Exposes the meeting, task and note services to AI assistants through the
//! Model Context Protocol.

pub mod handlers;

pub use handlers::{to_mcp_error, HubSpotMcpServer};

use anyhow::Result;
use rmcp::transport::io::stdio;
use rmcp::ServiceExt;

/// Run the server over stdio until the client disconnects.
pub async fn run_server(server: HubSpotMcpServer) -> Result<()> {
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
