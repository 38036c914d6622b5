//! Operator command interpreter.
//!
//! Maps free-form operator text onto coordinator calls. Interpretation never
//! fails: unrecognised input yields the help text, and snapshot failures are
//! reported as a reply string.

use tracing::info;

use crate::coordinator::Coordinator;
use crate::error::ControlError;
use crate::metrics;

/// Trigger recorded for every transition caused by an operator command.
pub const MANUAL_TRIGGER: &str = "manual command";

pub const HELP_TEXT: &str =
    "Commands: /play (force on), /pause, /auto, /status, /snapshot, /enable, /disable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Play,
    Auto,
    Status,
    Snapshot,
    Help,
}

impl Command {
    /// Parse operator text. Accepts a leading `/`, a trailing `@botname`
    /// and any case, and looks only at the first word.
    pub fn parse(text: &str) -> Self {
        let word = text.split_whitespace().next().unwrap_or_default();
        let word = word.strip_prefix('/').unwrap_or(word);
        let word = word.split('@').next().unwrap_or_default();

        match word.to_lowercase().as_str() {
            "pause" | "stop" | "disable" => Command::Pause,
            "play" | "start" | "enable" => Command::Play,
            "auto" => Command::Auto,
            "status" => Command::Status,
            "snapshot" => Command::Snapshot,
            _ => Command::Help,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Pause => "pause",
            Command::Play => "play",
            Command::Auto => "auto",
            Command::Status => "status",
            Command::Snapshot => "snapshot",
            Command::Help => "help",
        }
    }
}

/// Run one operator command against the coordinator and return the reply.
pub async fn interpret(coordinator: &Coordinator, text: &str) -> String {
    let command = Command::parse(text);
    metrics::record_command(command.as_str());
    info!(command = command.as_str(), "Operator command received");

    match command {
        Command::Pause => {
            coordinator.set_force_play(false, MANUAL_TRIGGER);
            coordinator.set_manual_pause(true, MANUAL_TRIGGER);
            "Playback paused by manual command.".to_string()
        }
        Command::Play => {
            coordinator.set_manual_pause(false, MANUAL_TRIGGER);
            coordinator.set_force_play(true, MANUAL_TRIGGER);
            "Playback forced on by manual command.".to_string()
        }
        Command::Auto => {
            coordinator.set_force_play(false, MANUAL_TRIGGER);
            coordinator.set_manual_pause(false, MANUAL_TRIGGER);
            "Playback returned to automatic control.".to_string()
        }
        Command::Status => coordinator.status().to_string(),
        Command::Snapshot => match coordinator.snapshot_now().await {
            Ok(()) => "Snapshot sent.".to_string(),
            Err(ControlError::SnapshotUnavailable) => "Snapshot not available.".to_string(),
            Err(e) => format!("Snapshot error: {}", e),
        },
        Command::Help => HELP_TEXT.to_string(),
    }
}
