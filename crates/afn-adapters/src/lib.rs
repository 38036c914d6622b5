//! I/O adapters for the playback controller.
//!
//! This crate provides:
//! - HTTP presence, motion and snapshot sources
//! - A process-backed player over a directory playlist
//! - Log and webhook notifiers
//! - A console command source

pub mod console;
pub mod error;
pub mod http;
pub mod motion;
pub mod notifier;
pub mod player;
pub mod presence;
pub mod snapshot;

pub use console::ConsoleCommandSource;
pub use error::{AdapterError, AdapterResult};
pub use http::{build_client, Credentials};
pub use motion::HttpMotionSource;
pub use notifier::{LogNotifier, WebhookNotifier};
pub use player::ProcessPlayer;
pub use presence::HttpPresenceSource;
pub use snapshot::HttpSnapshotSource;
