//! Retry budget for transaction submission.
//!
//! The watcher owns the loop; this type only answers "how many" and
//! "how long to wait".

use std::time::Duration;

use crate::config::SubmissionConfig;
use crate::resilience::backoff::BackoffPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// A zero budget is raised to one attempt.
    pub fn new(max_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, BackoffPolicy::Fixed(delay))
    }

    pub fn from_config(config: &SubmissionConfig) -> Self {
        let base = Duration::from_millis(config.backoff_ms);
        let backoff = if config.exponential {
            BackoffPolicy::Exponential {
                base,
                max: Duration::from_millis(config.max_backoff_ms),
            }
        } else {
            BackoffPolicy::Fixed(base)
        };
        Self::new(config.max_attempts, backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SubmissionConfig::default())
    }
}
