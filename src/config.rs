//! Configuration management for the HubSpot MCP Server.
//!
//! This module handles loading and validating configuration from environment variables.
//! A `.env` file is honoured through `dotenvy`, which never writes to stdout
//! (stdout carries the MCP protocol).

use crate::error::{ConfigError, ConfigResult};
use std::env;

pub const DEFAULT_API_BASE_URL: &str = "https://api.hubapi.com";

/// Configuration for the HubSpot MCP Server.
#[derive(Debug, Clone)]
pub struct Config {
    /// HubSpot private app access token
    pub hubspot_access_token: String,

    /// HubSpot API base URL (default: https://api.hubapi.com)
    pub hubspot_api_url: String,

    /// Per-attempt HTTP timeout in seconds (default: 30)
    pub request_timeout: u64,

    /// Attempts per logical request, including the first (default: 4)
    pub retry_max_attempts: u32,

    /// Backoff base delay in milliseconds (default: 1000)
    pub retry_base_delay_ms: u64,

    /// Log level (default: "info")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `HUBSPOT_ACCESS_TOKEN`: private app access token
    ///
    /// Optional environment variables:
    /// - `HUBSPOT_API_BASE_URL`: API base URL (default: https://api.hubapi.com)
    /// - `REQUEST_TIMEOUT`: per-attempt timeout in seconds (default: 30)
    /// - `RETRY_MAX_ATTEMPTS`: attempts per request, 1-10 (default: 4)
    /// - `RETRY_BASE_DELAY_MS`: backoff base delay (default: 1000)
    /// - `LOG_LEVEL`: logging level (default: "info")
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();

        let hubspot_access_token = env::var("HUBSPOT_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingVar("HUBSPOT_ACCESS_TOKEN".to_string()))?;

        if hubspot_access_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "HUBSPOT_ACCESS_TOKEN".to_string(),
                reason: "Cannot be empty".to_string(),
            });
        }

        let hubspot_api_url =
            env::var("HUBSPOT_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        if !hubspot_api_url.starts_with("http://") && !hubspot_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                var: "HUBSPOT_API_BASE_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        let request_timeout = Self::parse_env_u64("REQUEST_TIMEOUT", 30)?;
        if request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                var: "REQUEST_TIMEOUT".to_string(),
                reason: "Must be at least 1 second".to_string(),
            });
        }

        let retry_max_attempts = Self::parse_env_u64("RETRY_MAX_ATTEMPTS", 4)?;
        if !(1..=10).contains(&retry_max_attempts) {
            return Err(ConfigError::InvalidValue {
                var: "RETRY_MAX_ATTEMPTS".to_string(),
                reason: "Must be between 1 and 10".to_string(),
            });
        }

        let retry_base_delay_ms = Self::parse_env_u64("RETRY_BASE_DELAY_MS", 1000)?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            hubspot_access_token,
            hubspot_api_url,
            request_timeout,
            retry_max_attempts: retry_max_attempts as u32,
            retry_base_delay_ms,
            log_level,
        })
    }

    /// Parse an environment variable as u64 with a default value.
    fn parse_env_u64(var_name: &str, default: u64) -> ConfigResult<u64> {
        match env::var(var_name) {
            Ok(val) => val.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hubspot_access_token: String::new(),
            hubspot_api_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: 30,
            retry_max_attempts: 4,
            retry_base_delay_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}
