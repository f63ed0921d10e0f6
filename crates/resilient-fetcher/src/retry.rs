//! Retry budget and backoff schedule.

use crate::FailureClass;
use console_config_and_utils::Config;
use std::time::Duration;

/// Configuration for retry behavior on transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later one.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
            ..Self::default()
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry_count + 1`: `base * 2^retry_count`.
    pub fn delay_for_attempt(&self, retry_count: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Classified result of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Retryable,
    AuthExpired,
    AuthzDenied,
    Fatal,
}

impl From<FailureClass> for FetchOutcome {
    fn from(class: FailureClass) -> Self {
        match class {
            FailureClass::Retryable => FetchOutcome::Retryable,
            FailureClass::AuthExpired => FetchOutcome::AuthExpired,
            FailureClass::AuthzDenied => FetchOutcome::AuthzDenied,
            FailureClass::Fatal => FetchOutcome::Fatal,
        }
    }
}

/// Progress of one `execute` call through its retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// Retries performed so far; never exceeds the policy's `max_retries`.
    pub retry_count: u32,
    /// Delay that preceded this attempt.
    pub backoff_delay: Duration,
    /// Outcome of this attempt once classified.
    pub classified_outcome: Option<FetchOutcome>,
}

impl FetchAttempt {
    pub fn first() -> Self {
        Self {
            retry_count: 0,
            backoff_delay: Duration::ZERO,
            classified_outcome: None,
        }
    }

    /// Attempts dispatched so far, counting this one.
    pub fn dispatched(&self) -> u32 {
        self.retry_count + 1
    }

    /// The follow-up attempt, if this outcome is retryable and the budget
    /// allows another try. Auth failures are terminal whatever the budget.
    pub fn next(&self, policy: &RetryPolicy) -> Option<FetchAttempt> {
        match self.classified_outcome {
            Some(FetchOutcome::Retryable) if self.retry_count < policy.max_retries => {
                Some(FetchAttempt {
                    retry_count: self.retry_count + 1,
                    backoff_delay: policy.delay_for_attempt(self.retry_count),
                    classified_outcome: None,
                })
            }
            _ => None,
        }
    }
}
