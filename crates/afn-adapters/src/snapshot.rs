//! HTTP camera snapshot source.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use afn_control::{ControlError, ControlResult, SnapshotSource};

use crate::error::AdapterResult;
use crate::http::{ensure_success, read_limited, Credentials};

/// Largest still image accepted from the camera.
pub const MAX_SNAPSHOT_BYTES: usize = 5 * 1024 * 1024;

pub struct HttpSnapshotSource {
    client: Client,
    url: String,
    credentials: Option<Credentials>,
}

impl HttpSnapshotSource {
    pub fn new(client: Client, url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            url: url.into(),
            credentials,
        }
    }

    async fn fetch(&self) -> AdapterResult<Vec<u8>> {
        let mut request = self.client.get(&self.url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        let response = ensure_success(request.send().await?).await?;
        let image = read_limited(response, MAX_SNAPSHOT_BYTES).await?;
        debug!(bytes = image.len(), "Snapshot fetched");
        Ok(image)
    }

    /// One retry after a transient capture failure.
    async fn fetch_with_retry(&self) -> AdapterResult<Vec<u8>> {
        match self.fetch().await {
            Ok(image) => Ok(image),
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Snapshot fetch failed, retrying once");
                self.fetch().await
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn snapshot(&self, timeout: Duration) -> ControlResult<Vec<u8>> {
        match tokio::time::timeout(timeout, self.fetch_with_retry()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ControlError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::http::build_client;

    fn source(url: String) -> HttpSnapshotSource {
        HttpSnapshotSource::new(build_client(Duration::from_secs(5)).unwrap(), url, None)
    }

    #[tokio::test]
    async fn test_snapshot_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snap.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff, 0xe0]))
            .mount(&server)
            .await;

        let image = source(format!("{}/snap.jpg", server.uri()))
            .snapshot(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(image, vec![0xff, 0xd8, 0xff, 0xe0]);
    }

    #[tokio::test]
    async fn test_retries_once_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("warming up"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(&server)
            .await;

        let image = source(server.uri()).snapshot(Duration::from_secs(5)).await.unwrap();
        assert_eq!(image, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let err = source(server.uri())
            .snapshot(Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("forbidden"));
    }

    #[tokio::test]
    async fn test_rejects_oversized_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; MAX_SNAPSHOT_BYTES + 1]))
            .mount(&server)
            .await;

        let err = source(server.uri())
            .snapshot(Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = source(server.uri())
            .snapshot(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Timeout(_)));
    }
}
