//! Playback controller daemon.

mod config;
mod error;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use afn_adapters::{
    build_client, ConsoleCommandSource, Credentials, HttpMotionSource, HttpPresenceSource,
    HttpSnapshotSource, LogNotifier, ProcessPlayer, WebhookNotifier,
};
use afn_control::{shutdown, workers, Coordinator, Notifier, Player, SnapshotSource};

use crate::config::DaemonConfig;

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    for directive in ["afn=info", "afn_control=info", "afn_adapters=info", "afn_daemon=info"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Install the rustls crypto provider used for HTTPS. Runs after tracing is
/// up so a second installation is reported.
fn install_crypto_provider() -> bool {
    let installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();
    if !installed {
        warn!("rustls crypto provider already installed");
    }
    installed
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    }
    tokio::signal::ctrl_c().await.ok();
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Daemon error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    install_crypto_provider();

    info!("Starting afn-daemon");

    let config = DaemonConfig::from_env().context("loading configuration")?;
    info!(
        audio_dir = %config.audio_dir.display(),
        player = %config.player_bin,
        presence = config.presence_url.is_some(),
        motion = config.motion_url.is_some(),
        snapshots = config.snapshot_url.is_some(),
        webhook = config.webhook_url.is_some(),
        "Daemon configured"
    );

    if let Some(addr) = config.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("starting metrics exporter")?;
        info!(%addr, "Prometheus metrics listener started");
    }

    let http = build_client(config.http_timeout)?;
    let credentials =
        Credentials::from_parts(config.camera_username.clone(), config.camera_password.clone());

    let player = Arc::new(ProcessPlayer::new(&config.audio_dir, config.player_bin.clone()));
    let binary = player.locate_binary()?;
    info!(binary = %binary.display(), "Player binary found");

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(http.clone(), url.clone())),
        None => Arc::new(LogNotifier),
    };

    let (shutdown_tx, shutdown_rx) = shutdown::channel();

    let mut coordinator = Coordinator::new(
        config.control.clone(),
        Arc::clone(&player) as Arc<dyn Player>,
        notifier,
        shutdown_rx.clone(),
    );
    if let Some(url) = &config.snapshot_url {
        let source = HttpSnapshotSource::new(http.clone(), url.clone(), credentials.clone());
        coordinator = coordinator.with_snapshot_source(Arc::new(source) as Arc<dyn SnapshotSource>);
    }
    let coordinator = Arc::new(coordinator);

    let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();
    spawn_workers(&config, &coordinator, &player, &http, credentials, &shutdown_rx, &mut tasks);

    wait_for_signal().await;
    info!("Received shutdown signal");
    shutdown_tx.send_replace(true);

    for (name, handle) in tasks {
        match tokio::time::timeout(config.shutdown_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task = name, error = %e, "Worker ended abnormally"),
            Err(_) => warn!(task = name, "Worker did not stop in time"),
        }
    }

    info!("Daemon shutdown complete");
    Ok(())
}

fn spawn_workers(
    config: &DaemonConfig,
    coordinator: &Arc<Coordinator>,
    player: &Arc<ProcessPlayer>,
    http: &reqwest::Client,
    credentials: Option<Credentials>,
    shutdown_rx: &watch::Receiver<bool>,
    tasks: &mut Vec<(&'static str, JoinHandle<()>)>,
) {
    let files = player.file_started();
    let runner = Arc::clone(player);
    let rx = shutdown_rx.clone();
    tasks.push(("player", tokio::spawn(async move { runner.run(rx).await })));

    tasks.push((
        "file-notifications",
        tokio::spawn(workers::run_file_notifications(
            Arc::clone(coordinator),
            files,
            shutdown_rx.clone(),
        )),
    ));

    tasks.push((
        "schedule",
        tokio::spawn(workers::run_schedule_loop(
            Arc::clone(coordinator),
            shutdown_rx.clone(),
        )),
    ));

    tasks.push((
        "presence-events",
        tokio::spawn(workers::run_presence_events(
            Arc::clone(coordinator),
            shutdown_rx.clone(),
        )),
    ));

    if let Some(url) = &config.presence_url {
        let source = HttpPresenceSource::new(http.clone(), url.clone(), config.presence_targets.clone());
        tasks.push((
            "presence-poller",
            tokio::spawn(workers::run_presence_poller(
                Arc::clone(coordinator),
                Arc::new(source),
                config.presence_poll_interval,
                shutdown_rx.clone(),
            )),
        ));
    } else {
        info!("Presence polling disabled (AFN_PRESENCE_URL not set)");
    }

    if let Some(url) = &config.motion_url {
        let source = HttpMotionSource::new(http.clone(), url.clone(), credentials);
        tasks.push((
            "motion-poller",
            tokio::spawn(workers::run_motion_poller(
                Arc::clone(coordinator),
                Arc::new(source),
                config.motion_poll_interval,
                shutdown_rx.clone(),
            )),
        ));
    } else {
        info!("Motion polling disabled (AFN_MOTION_URL not set)");
    }

    if config.console_commands {
        tasks.push((
            "console-commands",
            tokio::spawn(workers::run_command_loop(
                Arc::clone(coordinator),
                ConsoleCommandSource::stdio(),
                shutdown_rx.clone(),
            )),
        ));
    }
}
