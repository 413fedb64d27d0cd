use thiserror::Error;
use vpcimage_util::http::JsonParseError;

/// Failure returned by any control-plane call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not JSON.
    #[error(transparent)]
    InvalidJson(#[from] JsonParseError),

    /// The response body was JSON but did not match the expected record.
    #[error("unexpected response payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// A successful response carried no body where a record was required.
    #[error("empty response from {path}")]
    EmptyResponse { path: String },

    /// A base URL failed validation.
    #[error("invalid endpoint '{url}': {reason}")]
    Endpoint { url: String, reason: String },

    /// The API key could not be exchanged for a bearer token.
    #[error("IAM authentication failed: {0}")]
    Authentication(String),
}

impl ApiError {
    /// Convenience constructor for status failures.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code when the service answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// True only for an explicit 404 from the service.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}
