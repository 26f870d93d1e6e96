//! Retry engine with configurable backoff.
//!
//! Delays grow per the configured strategy and are clamped to `max_delay`;
//! jitter multiplies the clamped delay by a uniform draw from `[0.5, 1.0]`
//! so synchronized callers do not retry in lockstep. A provider-supplied
//! `retry_after` on the error overrides a smaller computed delay.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use relayd_error::ServiceError;
use serde::{Deserialize, Serialize};

/// How delays grow between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `base * 2^(attempt-1)`
    Exponential,
    /// `base * attempt`
    Linear,
    /// `base` every time
    Fixed,
    /// No delay
    Immediate,
}

/// Tunables for retrying one service/operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (treated as at least 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Ceiling applied to every computed delay
    pub max_delay: Duration,
    /// Growth strategy
    pub strategy: BackoffStrategy,
    /// Randomize delays into `[0.5, 1.0]` of the computed value
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            strategy: BackoffStrategy::Exponential,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff strategy
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Many fast retries for cheap idempotent calls
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            strategy: BackoffStrategy::Exponential,
            jitter: true,
        }
    }

    /// Few slow retries for expensive calls
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::Exponential,
            jitter: true,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            strategy: BackoffStrategy::Immediate,
            jitter: false,
        }
    }

    /// Effective attempt budget; `max_attempts` below 1 is treated as 1
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Delay before the retry following `attempt` (1-indexed).
///
/// Clamped to the policy's `max_delay` before jitter, so jitter can only
/// shrink a delay, never push it past the ceiling.
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let base = policy.base_delay.as_secs_f64();
    let raw = match policy.strategy {
        BackoffStrategy::Exponential => base * 2f64.powi(attempt as i32 - 1),
        BackoffStrategy::Linear => base * attempt as f64,
        BackoffStrategy::Fixed => base,
        BackoffStrategy::Immediate => 0.0,
    };
    let clamped = raw.min(policy.max_delay.as_secs_f64());
    let secs = if policy.jitter && clamped > 0.0 {
        clamped * rand::thread_rng().gen_range(0.5..=1.0)
    } else {
        clamped
    };
    Duration::from_secs_f64(secs)
}

/// Execute `f` with retries per `policy`.
///
/// Non-retryable errors and the last attempt's error are returned
/// immediately with no delay. The sleep between attempts is cooperative:
/// dropping the returned future mid-backoff cancels it.
pub async fn execute_with_retry<F, Fut, T>(policy: &RetryPolicy, mut f: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "operation recovered after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_retryable() || attempt >= attempts {
                    return Err(err);
                }
                let mut delay = calculate_delay(policy, attempt);
                if let Some(retry_after) = err.retry_after() {
                    delay = delay.max(retry_after);
                }
                tracing::debug!(
                    attempt,
                    remaining = attempts - attempt,
                    delay = ?delay,
                    error = %err,
                    "operation failed, will retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
