//! Error types for the HubSpot MCP Server.
//!
//! Every failure that leaves the client engine is a [`CrmApiError`] carrying one
//! kind from a closed taxonomy, the HTTP status when one exists, a message, and
//! the operation context it happened in. Configuration and raw transport
//! failures have their own `thiserror` enums.

use crate::models::ObjectType;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Closed set of failure classifications surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// 401 - invalid or expired access token
    Authentication,
    /// 403 - token lacks the required scopes
    Permission,
    /// 404
    NotFound,
    /// 429
    RateLimited,
    /// 5xx, timeouts and connection failures
    TransientServerError,
    /// Any other 4xx, or caller input the client rejects locally
    Validation,
    /// No association type registered for the requested object pair
    UnregisteredAssociationPair,
    /// Anything that does not fit the categories above
    Unknown,
}

impl ErrorKind {
    /// Whether the retry engine may repeat a request that failed with this kind.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::TransientServerError)
    }

    /// Generic message used when the response body carries none.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "Invalid or expired access token",
            ErrorKind::Permission => "Insufficient permissions for this operation",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::RateLimited => "Rate limit exceeded",
            ErrorKind::TransientServerError => "HubSpot API server error",
            ErrorKind::Validation => "Request was rejected as invalid",
            ErrorKind::UnregisteredAssociationPair => "Association pair is not registered",
            ErrorKind::Unknown => "Unexpected API response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The logical operation an error occurred in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationContext {
    /// What was being attempted, e.g. "create", "search", "list associations"
    pub action: String,

    /// Object type the operation targeted
    pub object_type: ObjectType,

    /// Object id, when the operation targeted a single record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl OperationContext {
    pub fn new(action: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            action: action.into(),
            object_type,
            object_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object_id {
            Some(id) => write!(f, "{} {} {}", self.action, self.object_type, id),
            None => write!(f, "{} {}", self.action, self.object_type),
        }
    }
}

/// A classified error from the CRM client engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmApiError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub context: Option<OperationContext>,
}

impl CrmApiError {
    pub fn new(kind: ErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            context: None,
        }
    }

    /// A locally detected invalid input; never sent to the API.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, None, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, None, message)
    }

    pub fn unregistered_pair(from: ObjectType, to: ObjectType) -> Self {
        Self::new(
            ErrorKind::UnregisteredAssociationPair,
            None,
            format!("No association type registered for {} -> {}", from, to),
        )
    }

    /// Attach operation context. The innermost context wins so a wrapped error
    /// keeps pointing at the call that actually failed.
    pub fn with_context(mut self, context: OperationContext) -> Self {
        if self.context.is_none() {
            self.context = Some(context);
        }
        self
    }
}

impl fmt::Display for CrmApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: ", context)?;
        }
        match self.status {
            Some(status) => write!(f, "{} (status {}): {}", self.kind, status, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for CrmApiError {}

/// Raw failure of a single HTTP exchange, before classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt exceeded its timeout
    #[error("Request timeout")]
    Timeout,

    /// Could not connect to the API host
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Any other I/O or protocol failure
    #[error("HTTP request failed: {0}")]
    Io(String),
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    /// Environment variable has invalid value
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Convenience type alias for Results with CrmApiError
pub type CrmResult<T> = Result<T, CrmApiError>;

/// Convenience type alias for Results with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrmApiError::new(ErrorKind::NotFound, Some(404), "Resource not found");
        assert_eq!(err.to_string(), "NotFound (status 404): Resource not found");

        let err = CrmApiError::validation("Invalid date format: tomorrow");
        assert_eq!(err.to_string(), "Validation: Invalid date format: tomorrow");

        let err = ConfigError::MissingVar("HUBSPOT_ACCESS_TOKEN".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: HUBSPOT_ACCESS_TOKEN"
        );
    }

    #[test]
    fn test_kind_display_matches_serialized_name() {
        for kind in [
            ErrorKind::RateLimited,
            ErrorKind::TransientServerError,
            ErrorKind::UnregisteredAssociationPair,
        ] {
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.to_string())
            );
        }
        assert_eq!(ErrorKind::RateLimited.to_string(), "RateLimited");
    }

    #[test]
    fn test_error_display_with_context() {
        let err = CrmApiError::new(ErrorKind::Permission, Some(403), "Missing scopes")
            .with_context(OperationContext::new("get", ObjectType::Task).with_id("42"));
        assert_eq!(
            err.to_string(),
            "get tasks 42: Permission (status 403): Missing scopes"
        );
    }

    #[test]
    fn test_innermost_context_is_kept() {
        let err = CrmApiError::not_found("gone")
            .with_context(OperationContext::new("list associations", ObjectType::Deal))
            .with_context(OperationContext::new("get deal meetings", ObjectType::Meeting));
        let context = err.context.unwrap();
        assert_eq!(context.action, "list associations");
        assert_eq!(context.object_type, ObjectType::Deal);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::TransientServerError.is_retryable());
        for kind in [
            ErrorKind::Authentication,
            ErrorKind::Permission,
            ErrorKind::NotFound,
            ErrorKind::Validation,
            ErrorKind::UnregisteredAssociationPair,
            ErrorKind::Unknown,
        ] {
            assert!(!kind.is_retryable(), "{} must not be retried", kind);
        }
    }
}
