//! Directory playlist played through an external audio process.
//!
//! Each item is played by spawning the player binary (`ffplay` by default).
//! Pausing stops the running process with `SIGSTOP` and resuming continues
//! it with `SIGCONT`; an item started while paused is stopped immediately.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{kill, Signal as ProcessSignal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use afn_control::shutdown::wait_for_shutdown;
use afn_control::Player;

use crate::error::{AdapterError, AdapterResult};

/// Delay before re-reading an empty or unreadable audio directory.
pub const PLAYLIST_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay after an item failed to start.
const PLAYBACK_ERROR_DELAY: Duration = Duration::from_secs(1);

const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// List playable files directly inside `dir`, sorted by path.
pub async fn list_audio_files(dir: &Path) -> AdapterResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        let path = entry.path();
        let playable = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)));
        if playable {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Index of the item after `last_played`, wrapping around. Starts from the
/// beginning when nothing was played or the last item is gone.
pub fn next_file_index(files: &[PathBuf], last_played: Option<&Path>) -> usize {
    let Some(last) = last_played else {
        return 0;
    };
    files
        .iter()
        .position(|file| file == last)
        .map_or(0, |i| (i + 1) % files.len())
}

#[derive(Debug, Default)]
struct PlaybackState {
    paused: bool,
    child: Option<Pid>,
}

pub struct ProcessPlayer {
    dir: PathBuf,
    binary: String,
    state: Mutex<PlaybackState>,
    files: watch::Sender<Option<String>>,
}

impl ProcessPlayer {
    pub fn new(dir: impl Into<PathBuf>, binary: impl Into<String>) -> Self {
        let (files, _) = watch::channel(None);
        Self {
            dir: dir.into(),
            binary: binary.into(),
            state: Mutex::new(PlaybackState::default()),
            files,
        }
    }

    /// Resolve the player binary on `PATH`.
    pub fn locate_binary(&self) -> AdapterResult<PathBuf> {
        which::which(&self.binary).map_err(|_| AdapterError::PlayerNotFound(self.binary.clone()))
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Play the directory round-robin until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(dir = %self.dir.display(), player = %self.binary, "Starting audio player");
        let mut last_played: Option<PathBuf> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let files = match list_audio_files(&self.dir).await {
                Ok(files) if !files.is_empty() => files,
                Ok(_) => {
                    warn!(dir = %self.dir.display(), "No audio files found");
                    if !self.pause_for(PLAYLIST_RETRY_DELAY, &mut shutdown).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Failed to list audio files");
                    if !self.pause_for(PLAYLIST_RETRY_DELAY, &mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            let file = files[next_file_index(&files, last_played.as_deref())].clone();
            if let Err(e) = self.play_file(&file, &mut shutdown).await {
                warn!(file = %file.display(), error = %e, "Playback failed");
                if !self.pause_for(PLAYBACK_ERROR_DELAY, &mut shutdown).await {
                    break;
                }
            }
            last_played = Some(file);
        }
        info!("Audio player stopped");
    }

    /// Sleep unless shutdown arrives first. Returns false on shutdown.
    async fn pause_for(&self, delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = wait_for_shutdown(shutdown) => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn play_file(&self, path: &Path, shutdown: &mut watch::Receiver<bool>) -> AdapterResult<()> {
        let mut child = {
            let mut state = self.state.lock();
            let child = Command::new(&self.binary)
                .args(["-nodisp", "-autoexit", "-loglevel", "error"])
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()?;
            let pid = child.id().and_then(|id| i32::try_from(id).ok()).map(Pid::from_raw);
            if state.paused {
                if let Some(pid) = pid {
                    signal_child(pid, true);
                }
            }
            state.child = pid;
            child
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(file = %name, "Item started");
        self.files.send_replace(Some(name));

        let exited = tokio::select! {
            _ = wait_for_shutdown(shutdown) => None,
            status = child.wait() => Some(status),
        };
        self.state.lock().child = None;

        match exited {
            None => {
                child.kill().await?;
                Ok(())
            }
            Some(status) => {
                let status = status?;
                if !status.success() {
                    warn!(file = %path.display(), code = ?status.code(), "Player exited with error");
                }
                Ok(())
            }
        }
    }
}

fn signal_child(pid: Pid, paused: bool) {
    let signal = if paused {
        ProcessSignal::SIGSTOP
    } else {
        ProcessSignal::SIGCONT
    };
    if let Err(e) = kill(pid, signal) {
        warn!(pid = pid.as_raw(), signal = ?signal, error = %e, "Failed to signal player process");
    }
}

impl Player for ProcessPlayer {
    fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock();
        state.paused = paused;
        if let Some(pid) = state.child {
            signal_child(pid, paused);
        }
    }

    fn file_started(&self) -> watch::Receiver<Option<String>> {
        self.files.subscribe()
    }
}
