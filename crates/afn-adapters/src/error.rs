//! Adapter error types.

use afn_control::ControlError;
use thiserror::Error;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Maximum number of error body bytes kept in an [`AdapterError::HttpStatus`].
pub const ERROR_BODY_LIMIT: usize = 2048;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Player binary not found: {0}")]
    PlayerNotFound(String),

    #[error("Payload too large: more than {0} bytes")]
    PayloadTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build an error from a non-success status and the start of its body.
    pub fn from_http_status(status: reqwest::StatusCode, body: &str) -> Self {
        let mut end = body.len().min(ERROR_BODY_LIMIT);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        Self::HttpStatus(status.as_u16(), body[..end].trim().to_string())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Network(_) | AdapterError::Io(_) => true,
            AdapterError::HttpStatus(status, _) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<AdapterError> for ControlError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Io(e) => ControlError::Io(e),
            AdapterError::InvalidResponse(_)
            | AdapterError::Json(_)
            | AdapterError::PayloadTooLarge(_) => ControlError::invalid_response(err.to_string()),
            AdapterError::PlayerNotFound(_) => ControlError::config_error(err.to_string()),
            AdapterError::Network(_) | AdapterError::HttpStatus(..) => {
                ControlError::source_failed(err.to_string())
            }
        }
    }
}
