//! HubSpot MCP Server - Main entry point
//!
//! Serves HubSpot meeting, task and note tools over the Model Context
//! Protocol on stdio.

use anyhow::Result;
use hubspot_mcp_server::{Config, CrmClient, HubSpotMcpServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let loaded = Config::from_env();

    // stderr only; stdout carries the MCP protocol
    let level = loaded
        .as_ref()
        .map(|cfg| cfg.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match loaded {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Starting HubSpot MCP Server with API URL: {}",
        config.hubspot_api_url
    );
    info!(
        "Retry policy: {} attempt(s), {}ms base delay, {}s per attempt",
        config.retry_max_attempts, config.retry_base_delay_ms, config.request_timeout
    );

    let client = CrmClient::new(&config);
    let server = HubSpotMcpServer::from_client(client.clone());

    info!("Starting MCP server with stdio transport");
    hubspot_mcp_server::server::run_server(server).await?;

    let summary = client.metrics().summary();
    info!(
        "HubSpot MCP Server shutdown complete ({} attempt(s), {} retries)",
        summary.attempts_total, summary.retries_total
    );
    Ok(())
}
