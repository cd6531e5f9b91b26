pub mod router;
pub mod shutdown;

pub use shutdown::ShutdownCoordinator;

use crate::config::defaults::{IDLE_TIMEOUT, READ_TIMEOUT, WRITE_TIMEOUT};
use crate::metrics::BalanceMetrics;
use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Incoming, Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// HTTP endpoint exposing the metrics registry and the index page.
///
/// Serving never triggers a balance fetch; it only reads what the updater
/// last published.
pub struct MetricsServer {
    metrics: Arc<BalanceMetrics>,
    index_file: PathBuf,
    shutdown_coordinator: Arc<ShutdownCoordinator>,
}

impl MetricsServer {
    pub fn new(
        metrics: Arc<BalanceMetrics>,
        index_file: PathBuf,
        shutdown_coordinator: Arc<ShutdownCoordinator>,
    ) -> Self {
        Self {
            metrics,
            index_file,
            shutdown_coordinator,
        }
    }

    /// Bind `listen_address` and serve until SIGINT or SIGTERM, then shut
    /// down gracefully. A shutdown that does not finish in time is an error.
    pub async fn serve(self, listen_address: &str) -> Result<()> {
        let addr: SocketAddr = listen_address
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve address: '{}'", listen_address))?
            .next()
            .with_context(|| format!("No addresses resolved for: '{}'", listen_address))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to address: {}", addr))?;

        let signal = shutdown::shutdown_signal().context("Failed to setup signal handlers")?;

        info!(
            "Stream Telecom balance exporter has been started at address {}",
            listener.local_addr().unwrap_or(addr)
        );

        let coordinator = Arc::clone(&self.shutdown_coordinator);
        let shutdown_handle = tokio::spawn(async move {
            signal.await;
            info!("Stream Telecom balance exporter shutdown");
            coordinator.shutdown().await
        });

        Arc::new(self).run(listener).await;

        shutdown_handle.await.context("Shutdown task failed")??;

        Ok(())
    }

    /// Accept connections on `listener` until shutdown is broadcast.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        let mut shutdown_rx = self.shutdown_coordinator.subscribe();
        if self.shutdown_coordinator.is_shutting_down() {
            return;
        }

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            if self.shutdown_coordinator.is_shutting_down() {
                                debug!("Rejecting new connection during shutdown from {}", remote_addr);
                                continue;
                            }

                            self.shutdown_coordinator.inc_connections();
                            let server = Arc::clone(&self);

                            tokio::spawn(async move {
                                Arc::clone(&server).serve_connection(stream, remote_addr).await;
                                server.shutdown_coordinator.dec_connections();
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }
    }

    async fn serve_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) {
        let mut shutdown_rx = self.shutdown_coordinator.subscribe();

        // Milliseconds since `opened` at which the last response was produced.
        let opened = Instant::now();
        let last_activity = Arc::new(AtomicU64::new(0));

        let server = Arc::clone(&self);
        let activity = Arc::clone(&last_activity);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            let activity = Arc::clone(&activity);
            async move {
                let response = server.handle_with_deadline(req, remote_addr).await;
                activity.store(opened.elapsed().as_millis() as u64, Ordering::Relaxed);
                Ok::<_, Infallible>(response)
            }
        });

        let conn = http1::Builder::new()
            .timer(TokioTimer::new())
            .header_read_timeout(READ_TIMEOUT)
            .serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let mut closing = false;
        if self.shutdown_coordinator.is_shutting_down() {
            conn.as_mut().graceful_shutdown();
            closing = true;
        }

        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(err) = result {
                        debug!("Error serving connection from {}: {}", remote_addr, err);
                    }
                    break;
                }

                _ = idle_expired(opened, &last_activity), if !closing => {
                    debug!("Closing idle connection from {}", remote_addr);
                    conn.as_mut().graceful_shutdown();
                    closing = true;
                }

                _ = shutdown_rx.recv(), if !closing => {
                    conn.as_mut().graceful_shutdown();
                    closing = true;
                }
            }
        }
    }

    async fn handle_with_deadline(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Response<Full<Bytes>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        drop(req);

        debug!("{} {} from {}", method, path, remote_addr);

        let handler = router::handle_request(&method, &path, &self.metrics, &self.index_file);
        match tokio::time::timeout(WRITE_TIMEOUT, handler).await {
            Ok(response) => response,
            Err(_) => {
                warn!("{} {} from {} timed out", method, path, remote_addr);
                router::text_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "text/plain; charset=utf-8",
                    "Service Unavailable\n",
                )
            }
        }
    }
}

/// Resolves once no response has been produced for `IDLE_TIMEOUT`.
async fn idle_expired(opened: Instant, last_activity: &AtomicU64) {
    loop {
        let idle_since = opened + std::time::Duration::from_millis(last_activity.load(Ordering::Relaxed));
        let deadline = idle_since + IDLE_TIMEOUT;
        if Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep_until(deadline.into()).await;
    }
}
