//! Recording fakes for the collaborator traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::collaborators::{CommandSource, MotionSource, Notifier, Player, PresenceSource, SnapshotSource};
use crate::error::{ControlError, ControlResult};
use crate::motion::MotionReading;

pub struct RecordingPlayer {
    calls: Mutex<Vec<bool>>,
    files: watch::Sender<Option<String>>,
}

impl RecordingPlayer {
    pub fn new() -> Arc<Self> {
        let (files, _) = watch::channel(None);
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            files,
        })
    }

    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().clone()
    }

    pub fn start_file(&self, name: &str) {
        self.files.send_replace(Some(name.to_string()));
    }
}

impl Player for RecordingPlayer {
    fn set_paused(&self, paused: bool) {
        self.calls.lock().push(paused);
    }

    fn file_started(&self) -> watch::Receiver<Option<String>> {
        self.files.subscribe()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    photos: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn last_message(&self) -> Option<String> {
        self.messages.lock().last().cloned()
    }

    pub fn photos(&self) -> Vec<String> {
        self.photos.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, text: &str) {
        self.messages.lock().push(text.to_string());
    }

    fn send_photo(&self, filename: &str, _bytes: Vec<u8>) {
        self.photos.lock().push(filename.to_string());
    }
}

#[derive(Default)]
pub struct FakeSnapshotSource {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeSnapshotSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotSource for FakeSnapshotSource {
    async fn snapshot(&self, _timeout: Duration) -> ControlResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ControlError::source_failed("camera unreachable"));
        }
        Ok(vec![0xff, 0xd8, 0xff])
    }
}

/// Replays scripted results, then repeats the last one.
pub struct ScriptedSource<T> {
    script: Mutex<VecDeque<ControlResult<T>>>,
    polls: AtomicUsize,
}

impl<T> ScriptedSource<T> {
    pub fn new(script: Vec<ControlResult<T>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            polls: AtomicUsize::new(0),
        })
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl<T: Clone> ScriptedSource<T> {
    fn next(&self) -> ControlResult<T> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock();
        if script.len() > 1 {
            return script
                .pop_front()
                .unwrap_or_else(|| Err(ControlError::source_failed("script exhausted")));
        }
        match script.front() {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(e)) => Err(ControlError::source_failed(e.to_string())),
            None => Err(ControlError::source_failed("script exhausted")),
        }
    }
}

#[async_trait]
impl PresenceSource for ScriptedSource<Vec<String>> {
    async fn fetch_online(&self) -> ControlResult<Vec<String>> {
        self.next()
    }
}

#[async_trait]
impl MotionSource for ScriptedSource<MotionReading> {
    async fn poll(&self) -> ControlResult<MotionReading> {
        self.next()
    }
}

/// Command source fed from a channel; replies are recorded.
pub struct ChannelCommandSource {
    commands: tokio::sync::mpsc::UnboundedReceiver<String>,
    replies: Arc<Mutex<Vec<String>>>,
}

impl ChannelCommandSource {
    pub fn new() -> (
        tokio::sync::mpsc::UnboundedSender<String>,
        Arc<Mutex<Vec<String>>>,
        Self,
    ) {
        let (tx, commands) = tokio::sync::mpsc::unbounded_channel();
        let replies = Arc::new(Mutex::new(Vec::new()));
        let source = Self {
            commands,
            replies: Arc::clone(&replies),
        };
        (tx, replies, source)
    }
}

#[async_trait]
impl CommandSource for ChannelCommandSource {
    async fn next_command(&mut self) -> Option<String> {
        self.commands.recv().await
    }

    async fn reply(&mut self, text: &str) {
        self.replies.lock().push(text.to_string());
    }
}
