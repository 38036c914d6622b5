//! Long-running worker loops that feed the coordinator.
//!
//! Every loop exits promptly once the shutdown channel flips to `true`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::collaborators::{CommandSource, MotionSource, PresenceSource};
use crate::commands::interpret;
use crate::config::clamp_interval;
use crate::coordinator::Coordinator;
use crate::motion::MotionFilter;
use crate::shutdown::wait_for_shutdown;
use crate::throttle::LogThrottle;

/// Minimum spacing between presence poll error lines.
pub const PRESENCE_ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Back-off multiplier after a non-retryable motion poll error.
pub const MOTION_FATAL_BACKOFF_FACTOR: u32 = 10;

/// Re-evaluate quiet hours once at startup and then on every schedule tick.
pub async fn run_schedule_loop(coordinator: Arc<Coordinator>, mut shutdown: watch::Receiver<bool>) {
    let tick = clamp_interval(coordinator.config().schedule_tick);
    info!("Starting schedule loop (interval: {:?})", tick);

    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = ticker.tick() => {
                coordinator.refresh_schedule(&chrono::Local::now());
            }
        }
    }
    info!("Schedule loop stopped");
}

/// Poll the presence source and feed each snapshot through the tracker.
///
/// A failed poll leaves presence untouched; failures are logged at most
/// once per [`PRESENCE_ERROR_LOG_INTERVAL`].
pub async fn run_presence_poller(
    coordinator: Arc<Coordinator>,
    source: Arc<dyn PresenceSource>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let poll_interval = clamp_interval(poll_interval);
    info!("Starting presence poller (interval: {:?})", poll_interval);

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut error_log = LogThrottle::new(PRESENCE_ERROR_LOG_INTERVAL);

    loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            result = source.fetch_online() => result,
        };

        match result {
            Ok(online) => {
                debug!(count = online.len(), "Presence poll succeeded");
                coordinator.handle_presence_update(&online);
            }
            Err(e) => {
                if let Some(suppressed) = error_log.check(Instant::now()) {
                    if e.is_retryable() {
                        warn!(error = %e, suppressed, "Presence poll failed");
                    } else {
                        error!(error = %e, suppressed, "Presence source rejected request");
                    }
                }
            }
        }
    }
    info!("Presence poller stopped");
}

/// Deliver delayed offline transitions to the coordinator.
pub async fn run_presence_events(coordinator: Arc<Coordinator>, mut shutdown: watch::Receiver<bool>) {
    let tracker = Arc::clone(coordinator.presence());
    loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            event = tracker.recv_event() => coordinator.handle_presence_event(event),
        }
    }
    debug!("Presence event loop stopped");
}

/// Poll the motion source and forward deduplicated readings.
///
/// On error the poller backs off and retries without touching any signal.
/// Transient errors wait one back-off; anything else waits ten, since the
/// next poll is unlikely to differ.
pub async fn run_motion_poller(
    coordinator: Arc<Coordinator>,
    source: Arc<dyn MotionSource>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let poll_interval = clamp_interval(poll_interval);
    info!("Starting motion poller (interval: {:?})", poll_interval);
    let backoff = clamp_interval(coordinator.config().motion_retry_backoff);
    let mut filter = MotionFilter::default();

    loop {
        let result = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            result = source.poll() => result,
        };

        let pause = match result {
            Ok(reading) => {
                if let Some(detected) = filter.observe(reading.detected) {
                    info!(detected, names = ?reading.names, "Motion state changed");
                    coordinator.handle_motion_update(detected, &reading.names);
                }
                poll_interval
            }
            Err(e) if e.is_retryable() => {
                warn!(error = %e, backoff = ?backoff, "Motion poll failed");
                backoff
            }
            Err(e) => {
                let backoff = backoff * MOTION_FATAL_BACKOFF_FACTOR;
                error!(error = %e, backoff = ?backoff, "Motion source rejected request");
                backoff
            }
        };

        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }
    info!("Motion poller stopped");
}

/// Track the item the player reports as started.
pub async fn run_file_notifications(
    coordinator: Arc<Coordinator>,
    mut files: watch::Receiver<Option<String>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            changed = files.changed() => {
                if changed.is_err() {
                    debug!("Player file stream closed");
                    break;
                }
                let file = files.borrow_and_update().clone();
                if let Some(file) = file {
                    coordinator.set_current_file(&file);
                }
            }
        }
    }
}

/// Answer operator commands until the source closes or shutdown.
pub async fn run_command_loop<C: CommandSource>(
    coordinator: Arc<Coordinator>,
    mut source: C,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let text = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            text = source.next_command() => text,
        };
        let Some(text) = text else {
            info!("Command source closed");
            break;
        };
        if text.trim().is_empty() {
            continue;
        }

        let reply = interpret(&coordinator, &text).await;
        source.reply(&reply).await;
    }
}
