//! Signal coordinator.
//!
//! Holds the signal vector behind one exclusive lock and derives the single
//! paused/playing decision from it. Each setter mutates exactly one signal,
//! releases the lock, then recomputes. Player and notifier side effects run
//! only when the decision actually changes, and never under the signal lock.
//!
//! Player calls are ordered by a separate apply lock: each call re-reads the
//! cached decision while holding it, so the last state pushed to the player
//! is always the current one.

use std::fmt;
use std::sync::Arc;

use chrono::Timelike;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::collaborators::{Notifier, Player, SnapshotSource};
use crate::config::ControlConfig;
use crate::error::{ControlError, ControlResult};
use crate::metrics;
use crate::motion::ResumeTimer;
use crate::presence::{PresenceEvent, PresenceTracker};
use crate::schedule::is_quiet_hours;
use crate::signals::{Signal, SignalVector};
use crate::snapshot::SnapshotSupervisor;

/// File name attached to on-demand snapshots.
pub const ON_DEMAND_SNAPSHOT_NAME: &str = "snapshot.jpg";

/// A change of the paused/playing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub paused: bool,
    pub trigger: String,
    pub reasons: Vec<String>,
    pub current: String,
}

impl Transition {
    /// Operator-facing description of the transition.
    pub fn message(&self) -> String {
        let verb = if self.paused { "paused" } else { "resumed" };
        format!(
            "Playback {} ({}). Reasons: {}. Current: {}",
            verb,
            self.trigger,
            self.reasons.join(", "),
            self.current
        )
    }
}

/// Read-only view returned by the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub paused: bool,
    pub forced: bool,
    pub reasons: Vec<String>,
    pub current: String,
    pub online: Vec<String>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Paused={}, forced={}, reasons={}, current={}, online={}",
            self.paused,
            self.forced,
            self.reasons.join(", "),
            self.current,
            self.online.join(", ")
        )
    }
}

/// Lock order: `state` may be held while reading the presence tracker,
/// never the reverse. `apply` is never taken while `state` is held.
#[derive(Debug, Default)]
struct ControlState {
    signals: SignalVector,
    /// Last applied decision, cached only to detect transitions.
    paused: bool,
    current_file: String,
    /// Online targets as last applied to the presence signal.
    online: Vec<String>,
    /// Bumped on every motion write; a resume firing armed under an older
    /// value is stale.
    motion_generation: u64,
}

pub struct Coordinator {
    config: ControlConfig,
    state: Mutex<ControlState>,
    apply: Mutex<()>,
    player: Arc<dyn Player>,
    notifier: Arc<dyn Notifier>,
    presence: Arc<PresenceTracker>,
    motion_resume: Arc<ResumeTimer>,
    snapshot_source: Option<Arc<dyn SnapshotSource>>,
    snapshots: Option<SnapshotSupervisor>,
    shutdown: watch::Receiver<bool>,
}

impl Coordinator {
    pub fn new(
        config: ControlConfig,
        player: Arc<dyn Player>,
        notifier: Arc<dyn Notifier>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let presence = PresenceTracker::new(
            config.presence_clear_delay,
            config.presence_queue_capacity,
            shutdown.clone(),
        );
        Self {
            config,
            state: Mutex::new(ControlState::default()),
            apply: Mutex::new(()),
            player,
            notifier,
            presence,
            motion_resume: ResumeTimer::new(shutdown.clone()),
            snapshot_source: None,
            snapshots: None,
            shutdown,
        }
    }

    /// Enable on-demand snapshots and periodic capture while motion is active.
    pub fn with_snapshot_source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.snapshots = Some(SnapshotSupervisor::new(
            Arc::clone(&source),
            Arc::clone(&self.notifier),
            self.config.snapshot_interval,
            self.config.snapshot_timeout,
            self.shutdown.clone(),
        ));
        self.snapshot_source = Some(source);
        self
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    // =========================================================================
    // Signal setters
    // =========================================================================

    pub fn set_schedule_pause(&self, paused: bool, trigger: &str) -> Option<Transition> {
        self.set_signal(Signal::Schedule, paused, trigger)
    }

    pub fn set_motion_pause(&self, paused: bool, trigger: &str) -> Option<Transition> {
        self.set_signal(Signal::Motion, paused, trigger)
    }

    pub fn set_presence_pause(&self, paused: bool, trigger: &str) -> Option<Transition> {
        self.set_signal(Signal::Presence, paused, trigger)
    }

    pub fn set_manual_pause(&self, paused: bool, trigger: &str) -> Option<Transition> {
        self.set_signal(Signal::Manual, paused, trigger)
    }

    pub fn set_force_play(&self, enabled: bool, trigger: &str) -> Option<Transition> {
        self.set_signal(Signal::ForcePlay, enabled, trigger)
    }

    fn set_signal(&self, signal: Signal, value: bool, trigger: &str) -> Option<Transition> {
        {
            let mut state = self.state.lock();
            state.signals.set(signal, value);
            if signal == Signal::Motion {
                state.motion_generation += 1;
            }
        }
        debug!(signal = %signal, value, trigger, "Signal updated");
        self.apply_state(trigger)
    }

    /// Recompute the decision and run side effects if it changed.
    pub fn apply_state(&self, trigger: &str) -> Option<Transition> {
        let transition = {
            let mut state = self.state.lock();
            let should_pause = state.signals.decide();
            if should_pause == state.paused {
                return None;
            }
            state.paused = should_pause;
            Transition {
                paused: should_pause,
                trigger: trigger.to_string(),
                reasons: state.signals.reasons(&state.online),
                current: state.current_file.clone(),
            }
        };

        self.apply_player();
        metrics::record_transition(transition.paused);
        self.notify(&transition.message());
        Some(transition)
    }

    fn apply_player(&self) {
        let _apply = self.apply.lock();
        let paused = self.state.lock().paused;
        self.player.set_paused(paused);
    }

    // =========================================================================
    // Signal sources
    // =========================================================================

    /// Re-evaluate quiet hours for the given wall-clock time.
    pub fn refresh_schedule<T: Timelike>(&self, now: &T) -> Option<Transition> {
        self.set_schedule_pause(is_quiet_hours(now), "schedule check")
    }

    /// Apply a deduplicated motion reading.
    ///
    /// Motion pauses immediately and starts snapshot capture. Clearing stops
    /// capture and arms the resume timer; motion returning before it fires
    /// cancels the timer, so no intermediate resume is observable.
    pub fn handle_motion_update(self: &Arc<Self>, detected: bool, names: &[String]) {
        if detected {
            if self.motion_resume.cancel() {
                info!("Motion resume timer canceled (motion active)");
            }
            self.set_motion_pause(true, &format!("motion detected ({})", names.join(", ")));
            self.start_motion_snapshots();
            return;
        }

        self.stop_motion_snapshots();
        self.start_motion_resume_timer();
    }

    fn start_motion_resume_timer(self: &Arc<Self>) {
        let coordinator = Arc::downgrade(self);
        let delay = self.config.motion_resume_delay;
        let generation = self.state.lock().motion_generation;
        self.motion_resume.arm(delay, move || {
            if let Some(coordinator) = coordinator.upgrade() {
                info!("Motion resume timer fired");
                coordinator.release_motion(generation);
            }
        });
        info!(delay = ?delay, "Motion resume timer scheduled");
    }

    /// Clear the motion signal unless motion was written since `generation`.
    fn release_motion(&self, generation: u64) -> Option<Transition> {
        {
            let mut state = self.state.lock();
            if state.motion_generation != generation {
                debug!(generation, "Motion written since resume was armed, keeping pause");
                return None;
            }
            state.signals.set(Signal::Motion, false);
        }
        self.apply_state("motion cleared")
    }

    pub fn motion_resume_armed(&self) -> bool {
        self.motion_resume.is_armed()
    }

    fn start_motion_snapshots(&self) {
        if let Some(snapshots) = &self.snapshots {
            snapshots.start();
        }
    }

    fn stop_motion_snapshots(&self) {
        if let Some(snapshots) = &self.snapshots {
            snapshots.stop();
        }
    }

    pub fn motion_snapshots_running(&self) -> bool {
        self.snapshots
            .as_ref()
            .is_some_and(|snapshots| snapshots.is_running())
    }

    /// Feed a full presence snapshot through the debounce tracker.
    pub fn handle_presence_update(&self, online: &[String]) {
        let events = self.presence.update(online);
        for event in events {
            self.handle_presence_event(event);
        }
        self.apply_presence_state();
    }

    /// Announce one presence transition and re-derive the presence signal.
    pub fn handle_presence_event(&self, event: PresenceEvent) {
        metrics::record_presence_event(event.online);
        if event.online {
            self.notify(&format!("Presence online: {}", event.name));
        } else {
            self.notify(&format!("Presence offline: {}", event.name));
        }
        self.apply_presence_state();
    }

    /// Set the presence signal from the tracker, only when the online set
    /// actually changed.
    pub fn apply_presence_state(&self) -> Option<Transition> {
        let trigger = {
            let mut state = self.state.lock();
            let online = self.presence.current_online();
            if state.online == online {
                return None;
            }
            let present = !online.is_empty();
            state.signals.set(Signal::Presence, present);
            let trigger = if present {
                format!("presence detected ({})", online.join(", "))
            } else {
                "presence cleared (debounced)".to_string()
            };
            state.online = online;
            trigger
        };
        debug!(trigger = %trigger, "Presence signal updated");
        self.apply_state(&trigger)
    }

    /// Record the item the player just started.
    pub fn set_current_file(&self, file: &str) {
        self.state.lock().current_file = file.to_string();
        self.notify(&format!("Now playing: {}", file));
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn signals(&self) -> SignalVector {
        self.state.lock().signals
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn status(&self) -> StatusReport {
        let state = self.state.lock();
        StatusReport {
            paused: state.paused,
            forced: state.signals.force_play,
            reasons: state.signals.reasons(&state.online),
            current: state.current_file.clone(),
            online: state.online.clone(),
        }
    }

    /// Capture one still and forward it to the notifier.
    pub async fn snapshot_now(&self) -> ControlResult<()> {
        let source = self
            .snapshot_source
            .as_ref()
            .ok_or(ControlError::SnapshotUnavailable)?;

        match source.snapshot(self.config.snapshot_timeout).await {
            Ok(image) => {
                metrics::record_snapshot(true);
                self.notifier.send_photo(ON_DEMAND_SNAPSHOT_NAME, image);
                Ok(())
            }
            Err(e) => {
                metrics::record_snapshot(false);
                Err(e)
            }
        }
    }

    fn notify(&self, message: &str) {
        info!("{}", message);
        self.notifier.send(message);
    }
}
