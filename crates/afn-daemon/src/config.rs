//! Daemon configuration from environment variables.
//!
//! Loaded once at startup. Unparseable numbers fall back to their defaults,
//! as do zero values for loop periods.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use afn_control::ControlConfig;

use crate::error::{DaemonError, DaemonResult};

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Directory holding the audio playlist
    pub audio_dir: PathBuf,
    /// Player binary spawned for each item
    pub player_bin: String,
    /// Controller timings
    pub control: ControlConfig,
    /// Watched presence targets (host names)
    pub presence_targets: Vec<String>,
    pub presence_url: Option<String>,
    pub presence_poll_interval: Duration,
    pub motion_url: Option<String>,
    pub motion_poll_interval: Duration,
    pub snapshot_url: Option<String>,
    pub camera_username: Option<String>,
    pub camera_password: Option<String>,
    pub webhook_url: Option<String>,
    /// Timeout for every outbound HTTP request
    pub http_timeout: Duration,
    /// Read operator commands from stdin
    pub console_commands: bool,
    /// Prometheus listener address
    pub metrics_addr: Option<SocketAddr>,
    /// Time allowed for workers to stop
    pub shutdown_timeout: Duration,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(var(name).and_then(|s| s.parse().ok()).unwrap_or(default))
}

/// Shortest motion poll period accepted from the environment.
pub const MIN_MOTION_POLL: Duration = Duration::from_millis(200);

/// A loop period in seconds; zero falls back to the default.
fn period_secs(name: &str, default: u64) -> Duration {
    let period = secs(name, default);
    if period.is_zero() {
        Duration::from_secs(default)
    } else {
        period
    }
}

fn millis(name: &str, default: u64) -> Duration {
    Duration::from_millis(var(name).and_then(|s| s.parse().ok()).unwrap_or(default))
}

fn flag(name: &str, default: bool) -> bool {
    match var(name).map(|v| v.to_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Split a comma separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl DaemonConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        let defaults = ControlConfig::default();

        let audio_dir = var("AFN_AUDIO_DIR")
            .map(PathBuf::from)
            .ok_or(DaemonError::MissingVar("AFN_AUDIO_DIR"))?;

        let control = ControlConfig {
            motion_resume_delay: secs(
                "AFN_MOTION_RESUME_DELAY_SECS",
                defaults.motion_resume_delay.as_secs(),
            ),
            presence_clear_delay: secs(
                "AFN_PRESENCE_CLEAR_DELAY_SECS",
                defaults.presence_clear_delay.as_secs(),
            ),
            snapshot_interval: period_secs(
                "AFN_SNAPSHOT_INTERVAL_SECS",
                defaults.snapshot_interval.as_secs(),
            ),
            ..defaults
        };

        let presence_targets = var("AFN_PRESENCE_TARGETS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();
        let presence_url = var("AFN_PRESENCE_URL");
        if presence_url.is_some() && presence_targets.is_empty() {
            return Err(DaemonError::config(
                "AFN_PRESENCE_URL is set but AFN_PRESENCE_TARGETS is empty",
            ));
        }

        let metrics_addr = match var("METRICS_ADDR") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| DaemonError::config(format!("invalid METRICS_ADDR: {}", raw)))?,
            ),
            None => None,
        };

        Ok(Self {
            audio_dir,
            player_bin: var("AFN_PLAYER_BIN").unwrap_or_else(|| "ffplay".to_string()),
            control,
            presence_targets,
            presence_url,
            presence_poll_interval: period_secs("AFN_PRESENCE_POLL_SECS", 10),
            motion_url: var("AFN_MOTION_URL"),
            motion_poll_interval: millis("AFN_MOTION_POLL_MS", 1000).max(MIN_MOTION_POLL),
            snapshot_url: var("AFN_SNAPSHOT_URL"),
            camera_username: var("AFN_CAMERA_USERNAME"),
            camera_password: var("AFN_CAMERA_PASSWORD"),
            webhook_url: var("AFN_WEBHOOK_URL"),
            http_timeout: secs("AFN_HTTP_TIMEOUT_SECS", 30),
            console_commands: flag("AFN_CONSOLE_COMMANDS", true),
            metrics_addr,
            shutdown_timeout: secs("AFN_SHUTDOWN_TIMEOUT_SECS", 10),
        })
    }
}
