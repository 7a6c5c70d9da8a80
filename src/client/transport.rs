//! One HTTP exchange with the HubSpot API.
//!
//! [`Transport`] is the seam between the retry engine and the network. The
//! production implementation drives a blocking `ureq` agent on tokio's
//! blocking pool via `tokio::task::spawn_blocking`, so the async runtime is
//! never blocked. Tests substitute scripted implementations.

use crate::config::Config;
use crate::error::TransportError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Status and raw body of a completed exchange, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Sends one request. Any HTTP status is a successful exchange; only failures
/// to get a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `ureq`-backed transport with bearer-token authentication.
#[derive(Clone)]
pub struct UreqTransport {
    base_url: String,
    access_token: String,
    agent: Arc<ureq::Agent>,
}

impl UreqTransport {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout))
            .build();

        Self {
            base_url: config.hubspot_api_url.clone(),
            access_token: config.hubspot_access_token.clone(),
            agent: Arc::new(agent),
        }
    }

    /// Create a transport against a custom base URL (useful for testing).
    #[doc(hidden)]
    pub fn with_base_url(base_url: String, access_token: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();

        Self {
            base_url,
            access_token,
            agent: Arc::new(agent),
        }
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn send_blocking(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.build_url(&request.path);
        tracing::debug!("{} {}", request.method, url);

        let mut call = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Content-Type", "application/json");
        for (key, value) in &request.query {
            call = call.query(key, value);
        }

        let result = match &request.body {
            Some(body) => call.send_json(body),
            None => call.call(),
        };

        match result {
            Ok(response) => Self::read_response(response),
            // Non-2xx statuses still carry a body the classifier needs
            Err(ureq::Error::Status(_, response)) => Self::read_response(response),
            Err(ureq::Error::Transport(transport)) => Err(Self::map_transport_error(transport)),
        }
    }

    fn read_response(response: ureq::Response) -> Result<ApiResponse, TransportError> {
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(ApiResponse { status, body })
    }

    fn map_transport_error(transport: ureq::Transport) -> TransportError {
        match transport.kind() {
            ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Dns => {
                TransportError::Connection(transport.to_string())
            }
            ureq::ErrorKind::Io if transport.to_string().contains("timed out") => {
                TransportError::Timeout
            }
            _ => TransportError::Io(transport.to_string()),
        }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let transport = self.clone();
        let request = request.clone();

        tokio::task::spawn_blocking(move || transport.send_blocking(&request))
            .await
            .map_err(|e| TransportError::Io(format!("Task join error: {}", e)))?
    }
}
