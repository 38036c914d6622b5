//! Control error types.

use std::time::Duration;

use thiserror::Error;

pub type ControlResult<T> = Result<T, ControlError>;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Snapshot not available")]
    SnapshotUnavailable,

    #[error("Source request failed: {0}")]
    SourceFailed(String),

    #[error("Source timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid source response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControlError {
    pub fn source_failed(msg: impl Into<String>) -> Self {
        Self::SourceFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Transient failures that the next poll cycle may clear.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ControlError::SourceFailed(_) | ControlError::Timeout(_) | ControlError::Io(_)
        )
    }
}
