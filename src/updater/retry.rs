use std::time::Duration;

/// Cadence of the balance updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep between regular updates.
    pub interval: Duration,
    /// Sleep before retrying a failed update.
    pub retry_interval: Duration,
    /// Consecutive failures after which the updater falls back to `interval`.
    pub retry_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    Normal,
    Backoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Retry after `retry_interval`; `attempt` failures in a row so far.
    Retry { attempt: u32 },
    /// The retry limit was reached; back to the regular cadence.
    LimitExceeded,
}

/// Tracks consecutive failures and picks the next sleep.
///
/// Reaching the retry limit does not escalate: the tracker resets to
/// `Normal` with a zero counter even though the cause may persist.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    policy: RetryPolicy,
    state: UpdaterState,
    failures: u32,
}

impl RetryTracker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: UpdaterState::Normal,
            failures: 0,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn state(&self) -> UpdaterState {
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn next_delay(&self) -> Duration {
        match self.state {
            UpdaterState::Normal => self.policy.interval,
            UpdaterState::Backoff => self.policy.retry_interval,
        }
    }

    pub fn record_success(&mut self) {
        self.reset();
    }

    pub fn record_failure(&mut self) -> FailureOutcome {
        self.state = UpdaterState::Backoff;
        self.failures = self.failures.saturating_add(1);

        if self.failures >= self.policy.retry_limit {
            self.reset();
            FailureOutcome::LimitExceeded
        } else {
            FailureOutcome::Retry {
                attempt: self.failures,
            }
        }
    }

    fn reset(&mut self) {
        self.state = UpdaterState::Normal;
        self.failures = 0;
    }
}
