//! Quiet hours evaluation.

use chrono::Timelike;

/// Half-open hour windows `[start, end)` during which playback is paused.
/// A window whose start is after its end wraps past midnight.
pub const QUIET_WINDOWS: [(u32, u32); 2] = [(22, 9), (13, 15)];

/// True when the local hour falls in [22:00, 09:00) or [13:00, 15:00).
pub fn is_quiet_hours<T: Timelike>(time: &T) -> bool {
    let hour = time.hour();
    QUIET_WINDOWS
        .iter()
        .any(|&(start, end)| in_window(hour, start, end))
}

fn in_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}
