//! Cooperative shutdown signal shared by every worker.

use tokio::sync::watch;

/// Create a shutdown channel. Send `true` to stop all workers.
pub fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolve once shutdown is requested or the sender is gone.
///
/// Cancel-safe, so it can sit in a `tokio::select!` loop.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
