//! Playback controller core.
//!
//! This crate provides:
//! - The five-signal pause decision and its reasons
//! - Presence debouncing with delayed offline transitions
//! - Motion deduplication and the delayed motion resume
//! - Snapshot capture while motion is active
//! - The coordinator that applies transitions to the player and notifier
//! - Operator command interpretation
//! - Worker loops and cooperative shutdown

pub mod collaborators;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod motion;
pub mod presence;
pub mod queue;
pub mod schedule;
pub mod shutdown;
pub mod signals;
pub mod snapshot;
pub mod throttle;
pub mod workers;

#[cfg(test)]
mod testing;

pub use collaborators::{CommandSource, MotionSource, Notifier, Player, PresenceSource, SnapshotSource};
pub use commands::{interpret, Command};
pub use config::ControlConfig;
pub use coordinator::{Coordinator, StatusReport, Transition};
pub use error::{ControlError, ControlResult};
pub use motion::{MotionFilter, MotionReading, ResumeTimer};
pub use presence::{PresenceEvent, PresenceTracker};
pub use queue::DropOldestQueue;
pub use schedule::is_quiet_hours;
pub use signals::{decide, Signal, SignalVector};
pub use snapshot::SnapshotSupervisor;
