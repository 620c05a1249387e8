//! Error types for the DMT SDK.

use serde::{Deserialize, Serialize};

/// Result type for SDK operations.
pub type DmtResult<T> = Result<T, DmtError>;

/// Error types that can occur when talking to MPS or RPS.
#[derive(Debug, thiserror::Error)]
pub enum DmtError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered 401: bad credentials or a stale bearer token.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No bearer token is held, so the request was never sent.
    #[error("Not authenticated with MPS")]
    NotAuthenticated,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] dmt_core::CoreError),

    /// The server answered with a body the client cannot use.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl DmtError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this error means the session token is missing or rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::NotAuthenticated)
    }

    /// Create an error from a status code and response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(error_response) => error_response.into_message(),
            Err(_) => body.trim().to_string(),
        };

        match status {
            401 => Self::Authentication(message),
            404 => Self::NotFound(message),
            _ => Self::Api { status, message },
        }
    }
}

/// Error body returned by MPS/RPS.
///
/// MPS uses `{"error": ..., "message": ...}`; validation failures carry
/// `errors` instead.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn into_message(self) -> String {
        match (self.error, self.message, self.errors) {
            (Some(error), Some(message), _) => format!("{}: {}", error, message),
            (Some(text), None, _) | (None, Some(text), _) => text,
            (None, None, Some(errors)) => errors.to_string(),
            (None, None, None) => "unknown error".to_string(),
        }
    }
}
