//! Resilient executor: the single entry point application code calls.
//!
//! Composes the breaker registry, retry engine and error reporter around a
//! caller-supplied operation. Retries run inside the breaker's protection:
//! one admission covers the whole retry burst, so an outage shows up as one
//! concentrated failure signal on the breaker, and an open breaker stops the
//! burst before the first attempt.
//!
//! Raw transport errors never reach callers: a per-service [`ErrorMapper`]
//! converts them into the taxonomy first, and every mapped error is labeled
//! with the service profile's [`Category`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use relayd_error::{BoxError, Category, ErrorKind, ServiceError};
use serde::Serialize;

use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState, CircuitStats, ResilienceError};
use crate::registry::CircuitBreakerRegistry;
use crate::reporter::{unix_now, ErrorReporter, ReporterStats};
use crate::retry::{self, RetryPolicy};

/// Converts raw errors from an operation into the taxonomy.
pub trait ErrorMapper: Send + Sync {
    /// Map one raw error. `service` and `operation` identify the call site.
    fn map(&self, service: &str, operation: &str, raw: BoxError) -> ServiceError;
}

/// Passes through errors that already are [`ServiceError`]s, otherwise falls
/// back to message classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorMapper;

impl ErrorMapper for DefaultErrorMapper {
    fn map(&self, service: &str, _operation: &str, raw: BoxError) -> ServiceError {
        match raw.downcast::<ServiceError>() {
            Ok(err) => *err,
            Err(raw) => ServiceError::classify_message(service, raw.to_string()),
        }
    }
}

/// Breaker and retry tunables for one service.
#[derive(Debug, Clone)]
pub struct ServiceProfile {
    /// Subsystem the service belongs to; stamped on every mapped error
    pub category: Category,
    /// Breaker config used when the service's breaker is first created
    pub breaker: CircuitBreakerConfig,
    /// Retry policy for the service's operations
    pub retry: RetryPolicy,
}

impl Default for ServiceProfile {
    fn default() -> Self {
        Self {
            category: Category::Messaging,
            breaker: CircuitBreakerConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ServiceProfile {
    /// Create a profile for the given subsystem with default tunables
    pub fn new(category: Category) -> Self {
        Self {
            category,
            ..Default::default()
        }
    }

    /// Set the breaker config
    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Combined health view for the external observability endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// True iff no registered breaker is OPEN
    pub healthy: bool,
    /// Names of services whose breaker is OPEN, sorted
    pub unhealthy_services: Vec<String>,
    /// Per-service breaker stats
    pub circuits: HashMap<String, CircuitStats>,
    /// Error counters and recent errors
    pub errors: ReporterStats,
    /// Unix timestamp (seconds)
    pub generated_at: u64,
}

/// Builder for [`ResilientExecutor`].
#[derive(Default)]
pub struct ResilientExecutorBuilder {
    registry: Option<Arc<CircuitBreakerRegistry>>,
    reporter: Option<Arc<ErrorReporter>>,
    default_profile: Option<ServiceProfile>,
    profiles: HashMap<String, ServiceProfile>,
    mappers: HashMap<String, Arc<dyn ErrorMapper>>,
    default_mapper: Option<Arc<dyn ErrorMapper>>,
}

impl ResilientExecutorBuilder {
    /// Inject a shared breaker registry
    pub fn registry(mut self, registry: Arc<CircuitBreakerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Inject a shared error reporter
    pub fn reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Profile used for services without a registered one
    pub fn default_profile(mut self, profile: ServiceProfile) -> Self {
        self.default_profile = Some(profile);
        self
    }

    /// Register a profile for one service
    pub fn service(mut self, name: impl Into<String>, profile: ServiceProfile) -> Self {
        self.profiles.insert(name.into(), profile);
        self
    }

    /// Register an error mapper for one service
    pub fn mapper(mut self, name: impl Into<String>, mapper: Arc<dyn ErrorMapper>) -> Self {
        self.mappers.insert(name.into(), mapper);
        self
    }

    /// Mapper used for services without a registered one
    pub fn default_mapper(mut self, mapper: Arc<dyn ErrorMapper>) -> Self {
        self.default_mapper = Some(mapper);
        self
    }

    /// Build the executor
    pub fn build(self) -> ResilientExecutor {
        ResilientExecutor {
            registry: self.registry.unwrap_or_default(),
            reporter: self.reporter.unwrap_or_default(),
            default_profile: self.default_profile.unwrap_or_default(),
            profiles: self.profiles,
            mappers: self.mappers,
            default_mapper: self
                .default_mapper
                .unwrap_or_else(|| Arc::new(DefaultErrorMapper)),
        }
    }
}

/// Orchestrates breaker, retries and reporting around provider calls.
pub struct ResilientExecutor {
    registry: Arc<CircuitBreakerRegistry>,
    reporter: Arc<ErrorReporter>,
    default_profile: ServiceProfile,
    profiles: HashMap<String, ServiceProfile>,
    mappers: HashMap<String, Arc<dyn ErrorMapper>>,
    default_mapper: Arc<dyn ErrorMapper>,
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ResilientExecutor {
    /// Start building an executor
    pub fn builder() -> ResilientExecutorBuilder {
        ResilientExecutorBuilder::default()
    }

    fn profile(&self, service: &str) -> &ServiceProfile {
        self.profiles.get(service).unwrap_or(&self.default_profile)
    }

    fn mapper(&self, service: &str) -> Arc<dyn ErrorMapper> {
        self.mappers
            .get(service)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_mapper))
    }

    /// Execute `f` against `service` with full resilience protection.
    ///
    /// Each attempt is bounded by the profile's `call_timeout` (expiry maps
    /// to a timeout [`ServiceError`]). The retry burst counts as a single
    /// breaker outcome whose recorded duration is the burst's wall time,
    /// backoff sleeps included. On failure the final mapped error is
    /// reported and returned; the raw error is never surfaced.
    pub async fn execute<F, Fut, T>(
        &self,
        service: &str,
        operation: &str,
        mut f: F,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let profile = self.profile(service);
        let breaker = self.registry.get_or_create(service, profile.breaker.clone());
        let mapper = self.mapper(service);

        let admission = match breaker.acquire() {
            Ok(admission) => admission,
            Err(open) => {
                tracing::warn!(service, operation, state = %open.state, "fast-failing, circuit not closed");
                let err = ServiceError::new(
                    ErrorKind::Unavailable,
                    profile.category,
                    service,
                    "circuit not closed; call rejected without reaching the provider",
                )
                .with_context("circuit_state", open.state.to_string());
                self.reporter.report(&err, operation);
                return Err(ResilienceError::CircuitOpen(open));
            }
        };

        let call_timeout = profile.breaker.call_timeout;
        let category = profile.category;
        let started = Instant::now();

        let result = retry::execute_with_retry(&profile.retry, || {
            let fut = f();
            let mapper = Arc::clone(&mapper);
            async move {
                match tokio::time::timeout(call_timeout, fut).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(raw)) => {
                        Err(mapper.map(service, operation, raw).with_category(category))
                    }
                    Err(_) => Err(ServiceError::new(
                        ErrorKind::Timeout,
                        category,
                        service,
                        format!("{operation} timed out after {call_timeout:?}"),
                    )),
                }
            }
        })
        .await;

        match result {
            Ok(value) => {
                admission.record_success(started.elapsed());
                Ok(value)
            }
            Err(err) => {
                admission.record_failure(started.elapsed(), err.code());
                self.reporter.report(&err, operation);
                Err(ResilienceError::Service(err))
            }
        }
    }

    /// Combined health snapshot; healthy iff no breaker is OPEN.
    pub fn health(&self) -> HealthSnapshot {
        let circuits = self.registry.all_stats();
        let mut unhealthy_services: Vec<String> = circuits
            .iter()
            .filter(|(_, stats)| stats.state == CircuitState::Open)
            .map(|(name, _)| name.clone())
            .collect();
        unhealthy_services.sort();

        HealthSnapshot {
            healthy: unhealthy_services.is_empty(),
            unhealthy_services,
            circuits,
            errors: self.reporter.stats(),
            generated_at: unix_now(),
        }
    }

    /// Stats for one service's breaker, if it has been used
    pub fn circuit_stats(&self, service: &str) -> Option<CircuitStats> {
        self.registry.get(service).map(|breaker| breaker.stats())
    }

    /// Operator override: reset a service's breaker
    pub fn reset(&self, service: &str) -> bool {
        self.registry.reset(service)
    }

    /// Operator override: force a service's breaker OPEN
    pub fn force_open(&self, service: &str) -> bool {
        self.registry.force_open(service)
    }

    /// The injected breaker registry
    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.registry
    }

    /// The injected error reporter
    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }
}
