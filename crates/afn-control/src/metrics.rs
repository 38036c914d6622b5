//! Controller metrics.
//!
//! Counters for pause/resume transitions, presence events, snapshot captures
//! and operator commands.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Pause/resume transitions by direction.
    pub const TRANSITIONS_TOTAL: &str = "afn_transitions_total";

    /// Presence transitions by resulting state.
    pub const PRESENCE_EVENTS_TOTAL: &str = "afn_presence_events_total";

    /// Delayed presence events lost to a full queue.
    pub const PRESENCE_EVENTS_DROPPED_TOTAL: &str = "afn_presence_events_dropped_total";

    /// Snapshot captures by result.
    pub const SNAPSHOTS_TOTAL: &str = "afn_snapshots_total";

    /// Operator commands by interpreted command.
    pub const COMMANDS_TOTAL: &str = "afn_commands_total";
}

pub fn record_transition(paused: bool) {
    let direction = if paused { "paused" } else { "resumed" };
    counter!(names::TRANSITIONS_TOTAL, "direction" => direction).increment(1);
}

pub fn record_presence_event(online: bool) {
    let state = if online { "online" } else { "offline" };
    counter!(names::PRESENCE_EVENTS_TOTAL, "state" => state).increment(1);
}

pub fn record_presence_event_dropped() {
    counter!(names::PRESENCE_EVENTS_DROPPED_TOTAL).increment(1);
}

pub fn record_snapshot(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!(names::SNAPSHOTS_TOTAL, "result" => result).increment(1);
}

pub fn record_command(command: &'static str) {
    counter!(names::COMMANDS_TOTAL, "command" => command).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::TRANSITIONS_TOTAL.starts_with("afn_"));
        assert!(names::PRESENCE_EVENTS_DROPPED_TOTAL.contains("dropped"));
        assert!(names::SNAPSHOTS_TOTAL.contains("snapshots"));
    }
}
