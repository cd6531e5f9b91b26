use crate::error::{ExporterError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shutdown coordinator for graceful server shutdown
pub struct ShutdownCoordinator {
    /// Broadcast channel to notify the listener, connections and the updater
    shutdown_tx: broadcast::Sender<()>,
    /// Flag indicating if shutdown has been initiated
    is_shutting_down: Arc<AtomicBool>,
    /// Number of active connections
    active_connections: Arc<AtomicUsize>,
    /// How long in-flight connections may take to finish
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            shutdown_tx,
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            timeout,
        }
    }

    /// Get a shutdown receiver
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Check if shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    pub fn inc_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn dec_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Initiate graceful shutdown.
    ///
    /// Fails with [`ExporterError::Shutdown`] when connections are still open
    /// once the timeout has elapsed.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        self.is_shutting_down.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        self.wait_for_connections().await
    }

    async fn wait_for_connections(&self) -> Result<()> {
        let start = Instant::now();

        loop {
            let active = self.active_connections();

            if active == 0 {
                info!("All connections closed gracefully");
                return Ok(());
            }

            if start.elapsed() >= self.timeout {
                warn!(
                    "Graceful shutdown timeout ({:.1} seconds) reached with {} active connections",
                    self.timeout.as_secs_f64(),
                    active
                );
                return Err(ExporterError::Shutdown(format!(
                    "{} connection(s) still active after {:.1}s",
                    active,
                    self.timeout.as_secs_f64()
                )));
            }

            debug!(
                "Waiting for {} active connection(s) to complete... ({:.1}s remaining)",
                active,
                (self.timeout - start.elapsed()).as_secs_f64()
            );

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Install SIGTERM and SIGINT handlers. The returned future resolves when
/// either signal arrives.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal (Ctrl+C)");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_coordinator() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));

        assert!(!coordinator.is_shutting_down());
        assert_eq!(coordinator.active_connections(), 0);

        coordinator.inc_connections();
        assert_eq!(coordinator.active_connections(), 1);

        coordinator.dec_connections();
        assert_eq!(coordinator.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_with_no_connections() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let mut rx = coordinator.subscribe();

        let result = coordinator.shutdown().await;
        assert!(result.is_ok());
        assert!(coordinator.is_shutting_down());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_connections() {
        let coordinator = Arc::new(ShutdownCoordinator::new(Duration::from_secs(5)));
        coordinator.inc_connections();

        let closer = Arc::clone(&coordinator);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            closer.dec_connections();
        });

        assert!(coordinator.shutdown().await.is_ok());
        assert_eq!(coordinator.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_timeout_is_error() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(250));
        coordinator.inc_connections();

        let err = coordinator.shutdown().await.unwrap_err();
        assert!(matches!(err, ExporterError::Shutdown(_)));
        assert!(err.to_string().contains("1 connection(s) still active"));
    }
}
