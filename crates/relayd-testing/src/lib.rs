//! # Relayd Testing Infrastructure
//!
//! Test utilities shared across relayd crates:
//! - Scripted provider operations with call counting
//! - Property-based testing strategies for resilience tunables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relayd_testing::{Outcome, ScriptedOp};
//!
//! let op = ScriptedOp::new(vec![
//!     Outcome::timeout("twilio"),
//!     Outcome::timeout("twilio"),
//!     Outcome::ok("SM123"),
//! ]);
//! // feed op.call() (or op.call_boxed()) to the code under test,
//! // then assert on op.calls()
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use proptest::prelude::*;
use relayd_error::{BoxError, ErrorKind, ServiceError};
use relayd_resilience::{BackoffStrategy, RetryPolicy};
use std::time::Duration;

// ============================================================================
// Scripted Operations
// ============================================================================

/// One scripted result for a fake provider call
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The call succeeds with this value
    Ok(&'static str),
    /// The call fails with this classified error
    Fail(ServiceError),
    /// The call fails with an unclassified message, the way a raw transport
    /// error would
    RawFail(&'static str),
}

impl Outcome {
    /// Success shorthand
    pub fn ok(value: &'static str) -> Self {
        Self::Ok(value)
    }

    /// A retryable timeout from `service`
    pub fn timeout(service: &str) -> Self {
        Self::Fail(ServiceError::messaging(
            ErrorKind::Timeout,
            service,
            "scripted timeout",
        ))
    }

    /// A retryable connection failure from `service`
    pub fn connection(service: &str) -> Self {
        Self::Fail(ServiceError::messaging(
            ErrorKind::Connection,
            service,
            "scripted connection failure",
        ))
    }

    /// A non-retryable validation failure from `service`
    pub fn validation(service: &str) -> Self {
        Self::Fail(ServiceError::validation(service, "scripted validation failure"))
    }
}

/// A fake provider operation that plays back a script of outcomes.
///
/// Counts every invocation; once the script is exhausted every further call
/// succeeds with the `exhausted` value (defaults to `"ok"`).
#[derive(Debug)]
pub struct ScriptedOp {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: AtomicU32,
    exhausted: &'static str,
}

impl ScriptedOp {
    /// Play back `outcomes` in order
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicU32::new(0),
            exhausted: "ok",
        }
    }

    /// An operation that always succeeds with `value`
    pub fn succeeding(value: &'static str) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            exhausted: value,
        }
    }

    /// An operation that fails `n` times with `outcome`, then succeeds
    pub fn failing_n(outcome: Outcome, n: usize) -> Self {
        Self::new(vec![outcome; n])
    }

    /// Value returned once the script runs out
    pub fn with_exhausted(mut self, value: &'static str) -> Self {
        self.exhausted = value;
        self
    }

    fn next(&self) -> Option<Outcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// Run one scripted call, yielding a classified error on failure
    pub fn call(&self) -> Result<&'static str, ServiceError> {
        match self.next() {
            Some(Outcome::Ok(value)) => Ok(value),
            Some(Outcome::Fail(err)) => Err(err),
            Some(Outcome::RawFail(msg)) => Err(ServiceError::classify_message("scripted", msg)),
            None => Ok(self.exhausted),
        }
    }

    /// Run one scripted call, yielding a boxed error the way raw provider
    /// code does
    pub fn call_boxed(&self) -> Result<&'static str, BoxError> {
        match self.next() {
            Some(Outcome::Ok(value)) => Ok(value),
            Some(Outcome::Fail(err)) => Err(Box::new(err)),
            Some(Outcome::RawFail(msg)) => Err(msg.into()),
            None => Ok(self.exhausted),
        }
    }

    /// How many times the operation has been invoked
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Property-Test Strategies
// ============================================================================

/// Any backoff strategy
pub fn backoff_strategy() -> impl Strategy<Value = BackoffStrategy> {
    prop_oneof![
        Just(BackoffStrategy::Exponential),
        Just(BackoffStrategy::Linear),
        Just(BackoffStrategy::Fixed),
        Just(BackoffStrategy::Immediate),
    ]
}

/// Retry policies with bounded, realistic tunables
pub fn retry_policy() -> impl Strategy<Value = RetryPolicy> {
    (
        1u32..=10,
        1u64..=1_000,
        1u64..=60_000,
        backoff_strategy(),
        any::<bool>(),
    )
        .prop_map(|(attempts, base_ms, max_ms, strategy, jitter)| {
            RetryPolicy::new()
                .with_max_attempts(attempts)
                .with_base_delay(Duration::from_millis(base_ms))
                .with_max_delay(Duration::from_millis(base_ms.max(max_ms)))
                .with_strategy(strategy)
                .with_jitter(jitter)
        })
}

/// Attempt numbers in the range a retry loop actually produces
pub fn attempt_number() -> impl Strategy<Value = u32> {
    1u32..=32
}
