//! Interfaces of the external collaborators the coordinator drives.
//!
//! Implementations live in `afn-adapters`; tests use recording fakes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::ControlResult;
use crate::motion::MotionReading;

/// Audio output that can be paused and resumed.
pub trait Player: Send + Sync {
    /// Apply the pause state to the current and any following item. Idempotent.
    fn set_paused(&self, paused: bool);

    /// Name of the item that most recently started playing. Only the latest
    /// value is retained for a slow consumer.
    fn file_started(&self) -> watch::Receiver<Option<String>>;
}

/// Best-effort operator notifications. Delivery failures are logged by the
/// implementation and never reported back.
pub trait Notifier: Send + Sync {
    fn send(&self, text: &str);

    fn send_photo(&self, filename: &str, bytes: Vec<u8>);
}

/// Camera still image capture.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, timeout: Duration) -> ControlResult<Vec<u8>>;
}

/// Full snapshot of the watched targets currently seen on the network.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    async fn fetch_online(&self) -> ControlResult<Vec<String>>;
}

/// Raw motion readings from the camera.
#[async_trait]
pub trait MotionSource: Send + Sync {
    async fn poll(&self) -> ControlResult<MotionReading>;
}

/// Request/response channel for operator commands.
#[async_trait]
pub trait CommandSource: Send {
    /// Next command text, or `None` once the source is closed.
    async fn next_command(&mut self) -> Option<String>;

    async fn reply(&mut self, text: &str);
}
