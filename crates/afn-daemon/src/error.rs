//! Daemon error types.

use thiserror::Error;

pub type DaemonResult<T> = Result<T, DaemonError>;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DaemonError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
