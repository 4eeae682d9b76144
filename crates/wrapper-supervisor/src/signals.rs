//! OS signal handling for graceful shutdown

use rcon_wrapper_core::{Result, WrapperError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Spawn a task that reports every termination signal by name
pub fn spawn_termination_listener(tx: mpsc::Sender<&'static str>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = listen(tx).await {
            error!("Signal handler error: {}", e);
        }
    })
}

#[cfg(unix)]
async fn listen(tx: mpsc::Sender<&'static str>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| WrapperError::Io(format!("Failed to create SIGINT handler: {}", e)))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| WrapperError::Io(format!("Failed to create SIGTERM handler: {}", e)))?;

    loop {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };

        if tx.send(name).await.is_err() {
            debug!("Session gone, signal listener exiting");
            return Ok(());
        }
    }
}

#[cfg(windows)]
async fn listen(tx: mpsc::Sender<&'static str>) -> Result<()> {
    loop {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| WrapperError::Io(format!("Failed to listen for Ctrl+C: {}", e)))?;

        if tx.send("CTRL_C").await.is_err() {
            debug!("Session gone, signal listener exiting");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_spawns_quietly() {
        let (tx, mut rx) = mpsc::channel(1);

        let handle = spawn_termination_listener(tx);
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        assert!(rx.try_recv().is_err());
        assert!(!handle.is_finished());
        handle.abort();
    }
}
