//! Configuration for the durable work queues.

use std::time::Duration;

/// Configuration for a [`crate::WorkQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Window within which a duplicate change notification for an already
    /// pending entry is absorbed without touching the journal.
    pub dedup_window: Duration,
    /// Age after which an in-flight claim is considered abandoned and
    /// becomes reclaimable by the next claim.
    pub stale_claim_after: Duration,
    /// Age after which terminal (done/failed) entries are removed by the
    /// retention sweep.
    pub retention: Duration,
    /// Retry policy for failed entries.
    pub retry: RetryPolicy,
    /// Whether to flush the journal after every state transition.
    ///
    /// Disable only for tests; without flushing, a crash can lose
    /// transitions that were already acknowledged to callers.
    pub flush_on_write: bool,
}

impl QueueConfig {
    /// Sets the dedup window.
    #[must_use]
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Sets the stale-claim threshold.
    #[must_use]
    pub fn with_stale_claim_after(mut self, threshold: Duration) -> Self {
        self.stale_claim_after = threshold;
        self
    }

    /// Sets the retention age for terminal entries.
    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets whether the journal is flushed on every write.
    #[must_use]
    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(5),
            stale_claim_after: Duration::from_secs(600),
            retention: Duration::from_secs(7 * 24 * 3600),
            retry: RetryPolicy::default(),
            flush_on_write: true,
        }
    }
}

/// Retry policy for failed queue entries.
///
/// A retryable failure returns the entry to pending with an incremented
/// attempt count; once the count reaches `max_attempts` the entry becomes
/// terminally failed and is only surfaced to operators. Between failures
/// the entry is held back by an exponential backoff, enforced at claim
/// time.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of delivery attempts before an entry is terminal.
    pub max_attempts: u32,
    /// Backoff before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for the backoff.
    pub max_delay: Duration,
    /// Multiplier applied per additional failed attempt.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt ceiling.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(1800),
            backoff_multiplier: 2.0,
        }
    }

    /// Creates a policy that never retries: the first failure is terminal.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Returns the backoff before the next attempt, given the number of
    /// failed attempts so far. Zero attempts means no backoff.
    #[must_use]
    pub fn delay_after_attempts(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempts.saturating_sub(1) as i32);

        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_builder() {
        let config = QueueConfig::default()
            .with_dedup_window(Duration::from_secs(1))
            .with_stale_claim_after(Duration::from_secs(60))
            .with_retention(Duration::from_secs(3600))
            .with_flush_on_write(false);

        assert_eq!(config.dedup_window, Duration::from_secs(1));
        assert_eq!(config.stale_claim_after, Duration::from_secs(60));
        assert_eq!(config.retention, Duration::from_secs(3600));
        assert!(!config.flush_on_write);
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy::new(5)
            .with_initial_delay(Duration::from_secs(10))
            .with_backoff_multiplier(2.0);

        assert_eq!(policy.delay_after_attempts(0), Duration::ZERO);
        assert_eq!(policy.delay_after_attempts(1), Duration::from_secs(10));
        assert_eq!(policy.delay_after_attempts(2), Duration::from_secs(20));
        assert_eq!(policy.delay_after_attempts(3), Duration::from_secs(40));
    }

    #[test]
    fn backoff_respects_max_delay() {
        let policy = RetryPolicy::new(10)
            .with_initial_delay(Duration::from_secs(60))
            .with_max_delay(Duration::from_secs(120))
            .with_backoff_multiplier(10.0);

        assert_eq!(policy.delay_after_attempts(4), Duration::from_secs(120));
    }

    #[test]
    fn no_retry_policy() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts, 1);
    }
}
