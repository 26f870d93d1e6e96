//! # Relayd Resilience
//!
//! Production resilience patterns for relayd's external provider calls.
//!
//! Every outbound dependency (SMS and voice gateways, verification APIs, AI
//! completion endpoints, storage) goes through this crate:
//!
//! - **Circuit Breaker**: stop calling an unhealthy provider and fast-fail
//!   until it recovers
//! - **Retry Engine**: configurable backoff with jitter and
//!   `Retry-After`-aware delays
//! - **Breaker Registry**: one breaker per service, explicitly constructed
//!   and injected (no process globals)
//! - **Error Reporter**: per-`(service, operation, code)` counters plus a
//!   bounded log of recent errors
//! - **Resilient Executor**: the single entry point that composes all of the
//!   above around one provider call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relayd_resilience::{
//!     CircuitBreakerConfig, ResilienceError, ResilientExecutor, RetryPolicy,
//!     ServiceProfile,
//! };
//! use relayd_error::{BoxError, Category};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ResilienceError> {
//! let executor = ResilientExecutor::builder()
//!     .service(
//!         "twilio",
//!         ServiceProfile::new(Category::Messaging)
//!             .with_breaker(
//!                 CircuitBreakerConfig::new("twilio")
//!                     .with_failure_threshold(5)
//!                     .with_recovery_timeout(Duration::from_secs(30)),
//!             )
//!             .with_retry(RetryPolicy::default()),
//!     )
//!     .build();
//!
//! let sid = executor
//!     .execute("twilio", "send_sms", || async {
//!         // provider call here
//!         Ok::<_, BoxError>("SM123".to_string())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Standalone Circuit Breaker
//!
//! The breaker can also be used directly, without the executor:
//!
//! ```rust
//! use relayd_resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::new("anthropic")
//!     .with_failure_threshold(3)      // open after 3 consecutive failures
//!     .with_success_threshold(2)      // close after 2 trial successes
//!     .with_recovery_timeout(Duration::from_secs(30));
//!
//! let cb = CircuitBreaker::new(config);
//! assert_eq!(cb.state(), CircuitState::Closed);
//! ```
//!
//! ## Retries
//!
//! ```rust
//! use relayd_resilience::{calculate_delay, BackoffStrategy, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new()
//!     .with_max_attempts(5)
//!     .with_base_delay(Duration::from_millis(100))
//!     .with_strategy(BackoffStrategy::Exponential)
//!     .with_jitter(false);
//!
//! assert_eq!(calculate_delay(&policy, 3), Duration::from_millis(400));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod executor;
pub mod registry;
pub mod reporter;
pub mod retry;

// Re-export main types
pub use circuit_breaker::{
    Admission, CircuitBreaker, CircuitBreakerConfig, CircuitOpenError,
    CircuitState, CircuitStats, RequestRecord, ResilienceError,
};

pub use executor::{
    DefaultErrorMapper, ErrorMapper, HealthSnapshot, ResilientExecutor,
    ResilientExecutorBuilder, ServiceProfile,
};

pub use registry::CircuitBreakerRegistry;

pub use reporter::{ErrorRecord, ErrorReporter, ReporterStats};

pub use retry::{calculate_delay, execute_with_retry, BackoffStrategy, RetryPolicy};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_creation() {
        let cb = CircuitBreaker::with_name("test");
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.strategy, BackoffStrategy::Exponential);
    }

    #[test]
    fn test_registry_is_empty_on_creation() {
        let registry = CircuitBreakerRegistry::new();
        assert!(registry.is_empty());
    }
}
