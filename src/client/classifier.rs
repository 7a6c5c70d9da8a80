//! Maps transport outcomes onto the closed [`ErrorKind`] taxonomy.

use crate::client::transport::ApiResponse;
use crate::error::{CrmApiError, CrmResult, ErrorKind, TransportError};
use serde::Deserialize;

/// Longest raw body text carried into an error message.
const MAX_MESSAGE_CHARS: usize = 300;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn kind_for_status(status: u16) -> ErrorKind {
        match status {
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Permission,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited,
            s if s >= 500 => ErrorKind::TransientServerError,
            400..=499 => ErrorKind::Validation,
            _ => ErrorKind::Unknown,
        }
    }

    /// Pass 2xx responses through, classify everything else.
    pub fn classify(
        outcome: Result<ApiResponse, TransportError>,
    ) -> CrmResult<ApiResponse> {
        match outcome {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(Self::classify_response(&response)),
            Err(error) => Err(Self::classify_transport(&error)),
        }
    }

    pub fn classify_response(response: &ApiResponse) -> CrmApiError {
        let kind = Self::kind_for_status(response.status);
        CrmApiError::new(
            kind,
            Some(response.status),
            Self::extract_message(&response.body, kind),
        )
    }

    /// Timeouts and connection failures are transient.
    pub fn classify_transport(error: &TransportError) -> CrmApiError {
        CrmApiError::new(ErrorKind::TransientServerError, None, error.to_string())
    }

    /// A 2xx response whose body could not be decoded.
    pub fn undecodable(response: &ApiResponse, error: &serde_json::Error) -> CrmApiError {
        CrmApiError::new(
            ErrorKind::Unknown,
            Some(response.status),
            format!("Failed to decode response body: {}", error),
        )
    }

    /// The body's JSON `message`, else the raw text (truncated), else a
    /// generic message for the kind.
    pub fn extract_message(body: &str, kind: ErrorKind) -> String {
        if let Ok(ErrorBody {
            message: Some(message),
        }) = serde_json::from_str::<ErrorBody>(body)
        {
            if !message.trim().is_empty() {
                return message;
            }
        }

        let text = body.trim();
        if text.is_empty() {
            return kind.default_message().to_string();
        }

        if text.chars().count() > MAX_MESSAGE_CHARS {
            let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
            format!("{}...", truncated)
        } else {
            text.to_string()
        }
    }
}
