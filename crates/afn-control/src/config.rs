//! Controller timing configuration.

use std::time::Duration;

/// Shortest period accepted for any periodic loop. `tokio::time::interval`
/// rejects a zero period.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Raise a zero or too short loop period to [`MIN_INTERVAL`].
pub fn clamp_interval(period: Duration) -> Duration {
    period.max(MIN_INTERVAL)
}

/// Timings and capacities used by the coordinator and its workers.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Quiet period after motion clears before the motion signal is released
    pub motion_resume_delay: Duration,
    /// Grace period before a vanished presence target is declared offline
    pub presence_clear_delay: Duration,
    /// Interval between captures while motion is active
    pub snapshot_interval: Duration,
    /// Timeout for a single snapshot capture
    pub snapshot_timeout: Duration,
    /// How often quiet hours are re-evaluated
    pub schedule_tick: Duration,
    /// Capacity of the delayed presence event queue
    pub presence_queue_capacity: usize,
    /// Back-off after a failed motion poll
    pub motion_retry_backoff: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            motion_resume_delay: Duration::from_secs(300), // 5 minutes
            presence_clear_delay: Duration::ZERO,
            snapshot_interval: Duration::from_secs(5),
            snapshot_timeout: Duration::from_secs(10),
            schedule_tick: Duration::from_secs(30),
            presence_queue_capacity: 32,
            motion_retry_backoff: Duration::from_secs(3),
        }
    }
}

impl ControlConfig {
    pub fn with_motion_resume_delay(mut self, delay: Duration) -> Self {
        self.motion_resume_delay = delay;
        self
    }

    pub fn with_presence_clear_delay(mut self, delay: Duration) -> Self {
        self.presence_clear_delay = delay;
        self
    }

    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = clamp_interval(interval);
        self
    }
}
