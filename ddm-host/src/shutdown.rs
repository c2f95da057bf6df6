//! Signal handling for graceful shutdown.

use std::future::Future;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
    Ok(())
}

/// Flip `shutdown_tx` to `true` once `signal` resolves.
///
/// If the signal cannot be installed the sender is held until every
/// receiver is gone, so receivers never mistake the failure for shutdown.
async fn forward_shutdown<F>(signal: F, shutdown_tx: watch::Sender<bool>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            let _ = shutdown_tx.send(true);
        }
        Err(e) => {
            tracing::error!("Failed to install signal handlers: {}", e);
            shutdown_tx.closed().await;
        }
    }
}

/// Spawns a task that flips `shutdown_tx` to `true` on SIGTERM or SIGINT.
pub fn spawn_shutdown_handler(shutdown_tx: watch::Sender<bool>) -> JoinHandle<()> {
    tokio::spawn(forward_shutdown(shutdown_signal(), shutdown_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_sets_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        forward_shutdown(async { Ok(()) }, tx).await;
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_install_keeps_channel_open() {
        let (tx, mut rx) = watch::channel(false);
        let task = tokio::spawn(forward_shutdown(
            async { Err(std::io::Error::other("no signals here")) },
            tx,
        ));

        let waited = tokio::time::timeout(Duration::from_secs(60), rx.changed()).await;
        assert!(waited.is_err(), "channel closed or changed after failed install");
        assert!(!*rx.borrow());

        drop(rx);
        task.await.unwrap();
    }
}
