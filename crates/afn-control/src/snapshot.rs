//! Periodic snapshot capture while motion is active.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::collaborators::{Notifier, SnapshotSource};
use crate::config::clamp_interval;
use crate::metrics;
use crate::shutdown::wait_for_shutdown;

/// File name attached to photos captured by the motion loop.
pub const MOTION_SNAPSHOT_NAME: &str = "motion.jpg";

/// Runs at most one capture-and-send loop at a time.
pub struct SnapshotSupervisor {
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    timeout: Duration,
    shutdown: watch::Receiver<bool>,
    running: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotSupervisor {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            notifier,
            interval: clamp_interval(interval),
            timeout,
            shutdown,
            running: Mutex::new(None),
        }
    }

    /// Start the loop. No-op if it is already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let source = Arc::clone(&self.source);
        let notifier = Arc::clone(&self.notifier);
        let shutdown = self.shutdown.clone();
        let interval = self.interval;
        let timeout = self.timeout;

        *running = Some(tokio::spawn(async move {
            capture_loop(source, notifier, interval, timeout, shutdown).await;
        }));
        info!(interval = ?self.interval, "Motion snapshots started");
        true
    }

    /// Stop the loop. No-op if it is not running.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.running.lock().take() else {
            return false;
        };
        let was_running = !handle.is_finished();
        handle.abort();
        if was_running {
            info!("Motion snapshots stopped");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SnapshotSupervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.running.get_mut().take() {
            handle.abort();
        }
    }
}

async fn capture_loop(
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => {
                debug!("Motion snapshot loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                match source.snapshot(timeout).await {
                    Ok(image) => {
                        metrics::record_snapshot(true);
                        notifier.send_photo(MOTION_SNAPSHOT_NAME, image);
                    }
                    Err(e) => {
                        metrics::record_snapshot(false);
                        warn!("Snapshot error: {}", e);
                    }
                }
            }
        }
    }
}
