//! Motion reading deduplication and the delayed-resume timer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::shutdown::wait_for_shutdown;

/// One raw reading from a motion source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionReading {
    /// `None` when the payload carried no recognizable motion indicator
    pub detected: Option<bool>,
    /// Names of the indicators that reported motion
    pub names: Vec<String>,
}

impl MotionReading {
    pub fn detected(names: Vec<String>) -> Self {
        Self {
            detected: Some(true),
            names,
        }
    }

    pub fn clear() -> Self {
        Self {
            detected: Some(false),
            names: Vec::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Forwards a reading only when it carries an indicator whose value
/// differs from the last forwarded one. Starts from "no motion".
#[derive(Debug, Default)]
pub struct MotionFilter {
    last: bool,
}

impl MotionFilter {
    pub fn observe(&mut self, detected: Option<bool>) -> Option<bool> {
        let detected = detected?;
        if detected == self.last {
            return None;
        }
        self.last = detected;
        Some(detected)
    }

    pub fn last(&self) -> bool {
        self.last
    }
}

struct PendingResume {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct ResumeState {
    pending: Option<PendingResume>,
    next_generation: u64,
}

/// At most one pending delayed action. Each arming carries a generation
/// token; a firing whose token no longer matches the registered one is
/// ignored, so a superseded timer can never act. A pending firing is
/// dropped once shutdown is requested.
pub struct ResumeTimer {
    state: Mutex<ResumeState>,
    shutdown: watch::Receiver<bool>,
}

impl ResumeTimer {
    pub fn new(shutdown: watch::Receiver<bool>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ResumeState::default()),
            shutdown,
        })
    }

    /// Schedule `on_fire` after `delay`, replacing any pending firing.
    pub fn arm<F>(self: &Arc<Self>, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let timer: Weak<Self> = Arc::downgrade(self);
        let mut shutdown = self.shutdown.clone();
        let mut state = self.state.lock();
        let generation = state.next_generation;
        state.next_generation += 1;

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => {
                    debug!(generation, "Resume timer dropped on shutdown");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            let Some(timer) = timer.upgrade() else {
                return;
            };
            if timer.take_if_current(generation) {
                on_fire();
            } else {
                debug!(generation, "Ignoring stale resume timer");
            }
        });

        if let Some(previous) = state.pending.replace(PendingResume { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancel the pending firing. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        match self.state.lock().pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    fn take_if_current(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        let current = state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if current {
            state.pending = None;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::shutdown;

    #[test]
    fn test_filter_forwards_changes_only() {
        let mut filter = MotionFilter::default();
        assert_eq!(filter.observe(Some(false)), None);
        assert_eq!(filter.observe(Some(true)), Some(true));
        assert_eq!(filter.observe(Some(true)), None);
        assert_eq!(filter.observe(Some(false)), Some(false));
    }

    #[test]
    fn test_filter_keeps_last_value_on_unknown() {
        let mut filter = MotionFilter::default();
        filter.observe(Some(true));
        assert_eq!(filter.observe(None), None);
        assert!(filter.last());
        assert_eq!(filter.observe(Some(true)), None);
    }

    fn counter_callback(count: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let (_shutdown, rx) = shutdown::channel();
        let timer = ResumeTimer::new(rx);
        let fired = Arc::new(AtomicUsize::new(0));

        timer.arm(Duration::from_secs(10), counter_callback(&fired));
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (_shutdown, rx) = shutdown::channel();
        let timer = ResumeTimer::new(rx);
        let fired = Arc::new(AtomicUsize::new(0));

        timer.arm(Duration::from_secs(10), counter_callback(&fired));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_supersedes_previous() {
        let (_shutdown, rx) = shutdown::channel();
        let timer = ResumeTimer::new(rx);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        timer.arm(Duration::from_secs(10), counter_callback(&first));
        tokio::time::sleep(Duration::from_secs(5)).await;
        timer.arm(Duration::from_secs(10), counter_callback(&second));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_pending_firing() {
        let (shutdown_tx, rx) = shutdown::channel();
        let timer = ResumeTimer::new(rx);
        let fired = Arc::new(AtomicUsize::new(0));

        timer.arm(Duration::from_secs(10), counter_callback(&fired));
        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown_tx.send_replace(true);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_generation_is_rejected() {
        let (_shutdown, rx) = shutdown::channel();
        let timer = ResumeTimer::new(rx);
        assert!(!timer.take_if_current(0));
    }
}
