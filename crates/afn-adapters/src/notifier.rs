//! Operator notifiers.
//!
//! Delivery is best effort: failures are logged and never reach the caller.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use afn_control::Notifier;

use crate::error::AdapterResult;
use crate::http::ensure_success;

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, text: &str) {
        info!(target: "afn::notify", "{}", text);
    }

    fn send_photo(&self, filename: &str, bytes: Vec<u8>) {
        info!(target: "afn::notify", filename, bytes = bytes.len(), "Photo captured");
    }
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    text: &'a str,
}

/// Posts notifications to a webhook: text as JSON `{"text": ...}`, photos as
/// a multipart upload with a `photo` file field.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub async fn post_text(&self, text: &str) -> AdapterResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&TextMessage { text })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn post_photo(&self, filename: &str, bytes: Vec<u8>) -> AdapterResult<()> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = Form::new().part("photo", part);
        let response = self.client.post(&self.url).multipart(form).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    fn spawn_delivery<F>(&self, kind: &'static str, delivery: F)
    where
        F: std::future::Future<Output = AdapterResult<()>> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match delivery.await {
                        Ok(()) => debug!(kind, "Notification delivered"),
                        Err(e) => warn!(kind, error = %e, "Notification delivery failed"),
                    }
                });
            }
            Err(_) => warn!(kind, "No runtime available, notification dropped"),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, text: &str) {
        let notifier = self.clone();
        let text = text.to_string();
        self.spawn_delivery("text", async move { notifier.post_text(&text).await });
    }

    fn send_photo(&self, filename: &str, bytes: Vec<u8>) {
        let notifier = self.clone();
        let filename = filename.to_string();
        self.spawn_delivery("photo", async move { notifier.post_photo(&filename, bytes).await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::http::build_client;

    fn notifier(server: &MockServer) -> WebhookNotifier {
        WebhookNotifier::new(
            build_client(Duration::from_secs(5)).unwrap(),
            format!("{}/hook", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_post_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({"text": "Now playing: a.mp3"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server).post_text("Now playing: a.mp3").await.unwrap();
    }

    #[tokio::test]
    async fn test_post_photo_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server)
            .post_photo("motion.jpg", vec![0xff, 0xd8])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_post_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let err = notifier(&server).post_text("hello").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_send_is_fire_and_forget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let notifier = notifier(&server);
        Notifier::send(&notifier, "Playback paused (schedule check)");

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let received = server.received_requests().await.unwrap_or_default();
                if !received.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("webhook should receive the message");
    }

    #[test]
    fn test_send_outside_runtime_does_not_panic() {
        let notifier = WebhookNotifier::new(
            build_client(Duration::from_secs(1)).unwrap(),
            "http://127.0.0.1:9/hook",
        );
        notifier.send("dropped");
        LogNotifier.send_photo("snapshot.jpg", vec![1, 2, 3]);
    }
}
