pub mod retry;

pub use retry::{FailureOutcome, RetryPolicy, RetryTracker, UpdaterState};

use crate::balance::{parse_balance, BalanceSource};
use crate::config::Credentials;
use crate::error::Result;
use crate::metrics::BalanceMetrics;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Periodically refreshes the balance gauge from a [`BalanceSource`].
///
/// The gauge only ever holds the last successfully parsed balance; failed
/// updates are logged and leave it untouched.
pub struct BalanceUpdater {
    source: Arc<dyn BalanceSource>,
    metrics: Arc<BalanceMetrics>,
    credentials: Arc<Credentials>,
    tracker: RetryTracker,
}

impl BalanceUpdater {
    pub fn new(
        source: Arc<dyn BalanceSource>,
        metrics: Arc<BalanceMetrics>,
        credentials: Arc<Credentials>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            metrics,
            credentials,
            tracker: RetryTracker::new(policy),
        }
    }

    pub fn tracker(&self) -> &RetryTracker {
        &self.tracker
    }

    /// Fetch, parse and publish the balance once.
    pub async fn update_once(&self) -> Result<f64> {
        let body = self.source.fetch_balance().await?;
        let balance = parse_balance(&body, &self.credentials)?;
        self.metrics.set_balance(self.credentials.login(), balance);
        Ok(balance)
    }

    /// One updater iteration without the sleep: update and advance the
    /// retry state machine.
    pub async fn tick(&mut self) -> Result<f64> {
        let result = self.update_once().await;

        match &result {
            Ok(balance) => {
                debug!("Balance updated: {}", balance);
                self.tracker.record_success();
            }
            Err(e) => {
                warn!("{}", e);
                match self.tracker.record_failure() {
                    FailureOutcome::Retry { attempt } => {
                        info!(
                            "Request will retry after {} seconds (attempt {})",
                            self.tracker.policy().retry_interval.as_secs(),
                            attempt
                        );
                    }
                    FailureOutcome::LimitExceeded => {
                        warn!(
                            "Retry limit {} has been exceeded",
                            self.tracker.policy().retry_limit
                        );
                    }
                }
            }
        }

        result
    }

    /// Run until `shutdown` fires, sleeping `interval` between updates and
    /// `retry_interval` while backing off.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let delay = self.tracker.next_delay();

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => {
                    info!("Balance updater stopped");
                    return;
                }
            }

            let _ = self.tick().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExporterError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted responses, then repeats `fallback` forever.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<String>>>,
        fallback: fn() -> Result<String>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<String>>, fallback: fn() -> Result<String>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BalanceSource for ScriptedSource {
        async fn fetch_balance(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(self.fallback)
        }
    }

    fn timeout() -> Result<String> {
        Err(ExporterError::Fetch("Request error: operation timed out".to_string()))
    }

    fn balance() -> Result<String> {
        Ok("123.45".to_string())
    }

    fn policy(retry_limit: u32) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_secs(3600),
            retry_interval: Duration::from_secs(10),
            retry_limit,
        }
    }

    fn updater(source: Arc<ScriptedSource>, policy: RetryPolicy) -> (BalanceUpdater, Arc<BalanceMetrics>) {
        let metrics = Arc::new(BalanceMetrics::new().unwrap());
        let credentials = Arc::new(Credentials::new("user1", "pass1"));
        let updater = BalanceUpdater::new(source, Arc::clone(&metrics), credentials, policy);
        (updater, metrics)
    }

    #[tokio::test]
    async fn test_update_once_publishes_balance() {
        let (updater, metrics) = updater(ScriptedSource::new(vec![], balance), policy(10));

        assert_eq!(updater.update_once().await.unwrap(), 123.45);
        assert_eq!(metrics.balance("user1"), Some(123.45));
        assert!(metrics
            .render()
            .unwrap()
            .contains("balance_stream_telecom{service=\"user1\"} 123.45"));
    }

    #[tokio::test]
    async fn test_unparseable_balance_keeps_previous_value() {
        let source = ScriptedSource::new(
            vec![Ok("10.5".to_string()), Ok("<html>maintenance</html>".to_string())],
            balance,
        );
        let (updater, metrics) = updater(source, policy(10));

        updater.update_once().await.unwrap();
        let err = updater.update_once().await.unwrap_err();

        assert!(matches!(err, ExporterError::Parse(_)));
        assert_eq!(metrics.balance("user1"), Some(10.5));
    }

    #[tokio::test]
    async fn test_failures_back_off_until_limit() {
        let source = ScriptedSource::new(vec![balance()], timeout);
        let (mut updater, metrics) = updater(source, policy(10));

        updater.tick().await.unwrap();
        assert_eq!(updater.tracker().state(), UpdaterState::Normal);

        for n in 1..10 {
            assert!(updater.tick().await.is_err());
            assert_eq!(updater.tracker().state(), UpdaterState::Backoff);
            assert_eq!(updater.tracker().failures(), n);
            assert_eq!(updater.tracker().next_delay(), Duration::from_secs(10));
        }

        assert!(updater.tick().await.is_err());
        assert_eq!(updater.tracker().state(), UpdaterState::Normal);
        assert_eq!(updater.tracker().failures(), 0);
        assert_eq!(updater.tracker().next_delay(), Duration::from_secs(3600));

        assert_eq!(metrics.balance("user1"), Some(123.45));
    }

    #[tokio::test]
    async fn test_success_after_failures_resets() {
        let source = ScriptedSource::new(vec![timeout(), timeout()], balance);
        let (mut updater, _metrics) = updater(source, policy(10));

        assert!(updater.tick().await.is_err());
        assert!(updater.tick().await.is_err());
        assert_eq!(updater.tracker().failures(), 2);

        updater.tick().await.unwrap();
        assert_eq!(updater.tracker().state(), UpdaterState::Normal);
        assert_eq!(updater.tracker().failures(), 0);
    }

    #[tokio::test]
    async fn test_repeated_success_is_idempotent() {
        let (mut updater, metrics) = updater(ScriptedSource::new(vec![], balance), policy(10));

        for _ in 0..5 {
            updater.tick().await.unwrap();
        }

        assert_eq!(metrics.balance("user1"), Some(123.45));
        assert_eq!(metrics.series_count(), 1);
        assert_eq!(updater.tracker().failures(), 0);
    }

    #[tokio::test]
    async fn test_run_polls_and_stops_on_shutdown() {
        let source = ScriptedSource::new(vec![], balance);
        let policy = RetryPolicy {
            interval: Duration::from_millis(10),
            retry_interval: Duration::from_millis(10),
            retry_limit: 3,
        };
        let (updater, metrics) = updater(Arc::clone(&source), policy);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(updater.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("updater did not stop")
            .unwrap();

        assert!(source.calls() >= 2);
        assert_eq!(metrics.balance("user1"), Some(123.45));
    }
}
