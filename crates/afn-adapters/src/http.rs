//! Shared HTTP client setup and bounded body reads.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{AdapterError, AdapterResult, ERROR_BODY_LIMIT};

/// Basic-auth credentials for camera endpoints.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Credentials are only used when a username is configured.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        let username = username.filter(|u| !u.is_empty())?;
        Some(Self {
            username,
            password: password.unwrap_or_default(),
        })
    }
}

/// Build the client shared by every HTTP adapter.
pub fn build_client(timeout: Duration) -> AdapterResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(4)
        .user_agent(concat!("afn-adapters/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AdapterError::Network)
}

/// Read a response body, failing once it exceeds `limit` bytes.
pub async fn read_limited(mut response: Response, limit: usize) -> AdapterResult<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(AdapterError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Turn a non-success response into an error carrying the start of its body.
pub async fn status_error(mut response: Response) -> AdapterError {
    let status = response.status();
    let mut body = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        body.extend_from_slice(&chunk);
        if body.len() >= ERROR_BODY_LIMIT {
            break;
        }
    }
    body.truncate(ERROR_BODY_LIMIT);
    AdapterError::from_http_status(status, &String::from_utf8_lossy(&body))
}

/// Return the response if it succeeded, otherwise a status error.
pub async fn ensure_success(response: Response) -> AdapterResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}
