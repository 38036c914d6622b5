//! Presence debounce tracker.
//!
//! Turns periodic "currently seen" snapshots into online/offline
//! transitions. Targets are keyed case-insensitively; the most recently
//! observed spelling is kept for display. A target that vanishes is only
//! declared offline after the configured grace period, and any reappearance
//! inside that window cancels the pending offline firing.
//!
//! Delayed offline transitions are delivered through a [`DropOldestQueue`]
//! so a slow consumer can never block the timer path.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::metrics;
use crate::queue::DropOldestQueue;
use crate::shutdown::wait_for_shutdown;

/// A presence transition for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub name: String,
    pub online: bool,
}

impl PresenceEvent {
    pub fn online(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            online: true,
        }
    }

    pub fn offline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            online: false,
        }
    }
}

struct PendingOffline {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Invariant: `pending` is only ever set while `online` is true.
#[derive(Default)]
struct PresenceRecord {
    online: bool,
    display_name: String,
    pending: Option<PendingOffline>,
}

#[derive(Default)]
struct TrackerState {
    records: HashMap<String, PresenceRecord>,
    next_generation: u64,
}

pub struct PresenceTracker {
    delay: Duration,
    state: Mutex<TrackerState>,
    events: DropOldestQueue<PresenceEvent>,
    /// Pending offline timers stop without firing once this flips.
    shutdown: watch::Receiver<bool>,
}

impl PresenceTracker {
    pub fn new(
        delay: Duration,
        queue_capacity: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            delay,
            state: Mutex::new(TrackerState::default()),
            events: DropOldestQueue::new(queue_capacity),
            shutdown,
        })
    }

    /// Apply a full snapshot of the targets currently seen.
    ///
    /// Returns the transitions decided synchronously: every target coming
    /// online, and with a zero delay every target going offline. Delayed
    /// offline transitions arrive later through [`recv_event`].
    ///
    /// [`recv_event`]: PresenceTracker::recv_event
    pub fn update<S: AsRef<str>>(self: &Arc<Self>, seen: &[S]) -> Vec<PresenceEvent> {
        let mut current: BTreeMap<String, String> = BTreeMap::new();
        for name in seen {
            let trimmed = name.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            current.insert(trimmed.to_lowercase(), trimmed.to_string());
        }

        let mut events = Vec::new();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        for (key, name) in &current {
            let record = state.records.entry(key.clone()).or_default();
            record.display_name = name.clone();
            if let Some(pending) = record.pending.take() {
                pending.handle.abort();
                debug!(target_name = %name, "Presence target reappeared, offline timer canceled");
            }
            if !record.online {
                record.online = true;
                events.push(PresenceEvent::online(name.clone()));
            }
        }

        let mut vanished: Vec<String> = state
            .records
            .iter()
            .filter(|(key, record)| {
                record.online && record.pending.is_none() && !current.contains_key(*key)
            })
            .map(|(key, _)| key.clone())
            .collect();
        vanished.sort();

        for key in vanished {
            let Some(record) = state.records.get_mut(&key) else {
                continue;
            };
            if self.delay.is_zero() {
                record.online = false;
                events.push(PresenceEvent::offline(record.display_name.clone()));
                continue;
            }

            let generation = state.next_generation;
            state.next_generation += 1;
            let handle = self.spawn_offline_timer(key.clone(), generation);
            record.pending = Some(PendingOffline { generation, handle });
            debug!(
                target_name = %record.display_name,
                delay = ?self.delay,
                "Presence target vanished, offline timer scheduled"
            );
        }

        events
    }

    /// Display names of every target currently online, sorted.
    pub fn current_online(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut online: Vec<String> = state
            .records
            .iter()
            .filter(|(_, record)| record.online)
            .map(|(key, record)| {
                if record.display_name.is_empty() {
                    key.clone()
                } else {
                    record.display_name.clone()
                }
            })
            .collect();
        online.sort();
        online
    }

    pub fn is_online(&self, name: &str) -> bool {
        let key = name.trim().to_lowercase();
        self.state
            .lock()
            .records
            .get(&key)
            .is_some_and(|record| record.online)
    }

    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .records
            .values()
            .filter(|record| record.pending.is_some())
            .count()
    }

    /// Wait for the next delayed transition.
    pub async fn recv_event(&self) -> PresenceEvent {
        self.events.recv().await
    }

    pub fn try_recv_event(&self) -> Option<PresenceEvent> {
        self.events.try_recv()
    }

    fn spawn_offline_timer(self: &Arc<Self>, key: String, generation: u64) -> JoinHandle<()> {
        let tracker: Weak<Self> = Arc::downgrade(self);
        let delay = self.delay;
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => {
                    debug!(key = %key, "Offline timer dropped on shutdown");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            if let Some(tracker) = tracker.upgrade() {
                tracker.fire_offline(&key, generation);
            }
        })
    }

    fn fire_offline(&self, key: &str, generation: u64) {
        let event = {
            let mut state = self.state.lock();
            let Some(record) = state.records.get_mut(key) else {
                return;
            };
            let current = record
                .pending
                .as_ref()
                .is_some_and(|pending| pending.generation == generation);
            if !current {
                debug!(key, generation, "Ignoring superseded offline timer");
                return;
            }
            record.pending = None;
            if !record.online {
                return;
            }
            record.online = false;
            PresenceEvent::offline(record.display_name.clone())
        };

        if let Some(dropped) = self.events.push(event) {
            metrics::record_presence_event_dropped();
            warn!(
                target_name = %dropped.name,
                online = dropped.online,
                "Presence event queue full, dropped oldest event"
            );
        }
    }
}
