//! Time-based log throttling for noisy pollers.

use std::time::Duration;

use tokio::time::Instant;

/// Lets at most one log line through per interval and counts what it
/// swallowed in between.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    last: Option<Instant>,
    suppressed: u32,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            suppressed: 0,
        }
    }

    /// Returns `Some(suppressed)` when a line may be logged now, where
    /// `suppressed` is the number of lines dropped since the last one.
    pub fn check(&mut self, now: Instant) -> Option<u32> {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }

    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_one_line_per_interval() {
        let mut throttle = LogThrottle::new(Duration::from_secs(60));

        assert_eq!(throttle.check(Instant::now()), Some(0));
        assert_eq!(throttle.check(Instant::now()), None);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(throttle.check(Instant::now()), None);
        assert_eq!(throttle.suppressed(), 2);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(throttle.check(Instant::now()), Some(2));
        assert_eq!(throttle.suppressed(), 0);
    }
}
