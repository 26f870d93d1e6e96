//! Circuit breaker for unreliable provider dependencies.
//!
//! One breaker guards one dependency. It trips OPEN on sustained failure
//! (consecutive-failure threshold or windowed failure rate), fast-fails while
//! OPEN, and probes recovery with single-flight trial calls in HALF_OPEN.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use relayd_error::{ErrorKind, ServiceError, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Records older than this are pruned from the sliding window before the
/// size cap is applied.
const WINDOW_RETENTION: Duration = Duration::from_secs(300);

/// Windowed failure rate at which the breaker trips, given enough samples.
const WINDOW_FAILURE_RATE: f64 = 0.5;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected without reaching the dependency
    Open,
    /// Recovery is being probed with trial calls
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for one circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Service name for logging/stats
    pub name: String,
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Time to wait while OPEN before admitting a trial call
    pub recovery_timeout: Duration,
    /// Consecutive HALF_OPEN successes required to close
    pub success_threshold: u32,
    /// Bound on each guarded invocation; expiry counts as failure
    pub call_timeout: Duration,
    /// Maximum entries kept in the sliding window
    pub window_size: usize,
    /// Minimum window entries before the failure-rate rule applies
    pub minimum_requests: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            call_timeout: Duration::from_secs(30),
            window_size: 50,
            minimum_requests: 10,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set consecutive-failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set recovery timeout
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Set success threshold for HALF_OPEN
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Set per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set sliding window size cap
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Set minimum window entries for the failure-rate rule
    pub fn with_minimum_requests(mut self, minimum: usize) -> Self {
        self.minimum_requests = minimum;
        self
    }

    /// Trips quickly and probes recovery quickly. Suited to cheap,
    /// high-volume calls such as verification lookups.
    pub fn fast_recovery(name: impl Into<String>) -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(5),
            ..Self::new(name)
        }
    }

    /// Tolerates more failures and stays open longer. Suited to expensive
    /// calls such as AI completions.
    pub fn conservative(name: impl Into<String>) -> Self {
        Self {
            failure_threshold: 10,
            recovery_timeout: Duration::from_secs(60),
            call_timeout: Duration::from_secs(120),
            window_size: 100,
            minimum_requests: 20,
            ..Self::new(name)
        }
    }
}

/// One sliding-window entry
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// When the call completed
    pub at: Instant,
    /// Whether it succeeded
    pub success: bool,
    /// Wall time of the admitted unit of work. For [`CircuitBreaker::call`]
    /// this is one guarded call; for an executor-driven retry burst it spans
    /// the whole burst, backoff sleeps included.
    pub duration: Duration,
    /// Error code on failure
    pub error_code: Option<&'static str>,
}

/// Raised when a call is rejected without invoking the dependency
#[derive(Debug, Clone, Error)]
#[error("circuit for '{service}' is {state}; call rejected")]
pub struct CircuitOpenError {
    /// Guarded dependency name
    pub service: String,
    /// Breaker state at rejection time
    pub state: CircuitState,
    /// Time until the next trial call may be admitted
    pub retry_after: Option<Duration>,
}

/// What callers of the resilience layer receive on failure.
///
/// Never a raw transport error: either the classified [`ServiceError`] or
/// the fast-fail [`CircuitOpenError`].
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The dependency failed; mapped into the taxonomy
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The breaker rejected the call without invoking the dependency
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),
}

impl ResilienceError {
    /// Whether retrying (later) can help. Fast-fails are not retryable from
    /// inside the layer; the breaker decides when trials resume.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Service(e) => e.is_retryable(),
            Self::CircuitOpen(_) => false,
        }
    }

    /// Severity for logging
    pub fn severity(&self) -> Severity {
        match self {
            Self::Service(e) => e.severity,
            Self::CircuitOpen(_) => Severity::High,
        }
    }

    /// The underlying service error, if this is one
    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(e) => Some(e),
            Self::CircuitOpen(_) => None,
        }
    }
}

/// Point-in-time snapshot of one breaker
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStats {
    /// Guarded dependency name
    pub name: String,
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures while CLOSED
    pub failure_count: u32,
    /// Consecutive successes while HALF_OPEN
    pub success_count: u32,
    /// Failure rate over the sliding window
    pub failure_rate: f64,
    /// Entries currently in the window
    pub window_len: usize,
    /// Calls that reached the dependency
    pub total_calls: u64,
    /// Calls that succeeded
    pub total_successes: u64,
    /// Calls that failed (including timeouts)
    pub total_failures: u64,
    /// Calls rejected without reaching the dependency
    pub rejected_calls: u64,
    /// Time until the next trial admission; only while OPEN
    pub open_remaining: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    next_attempt: Option<Instant>,
    trial_in_flight: bool,
    window: VecDeque<RequestRecord>,
    total_calls: u64,
    total_successes: u64,
    total_failures: u64,
    rejected_calls: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            next_attempt: None,
            trial_in_flight: false,
            window: VecDeque::new(),
            total_calls: 0,
            total_successes: 0,
            total_failures: 0,
            rejected_calls: 0,
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|r| !r.success).count();
        failures as f64 / self.window.len() as f64
    }
}

/// Per-dependency circuit breaker.
///
/// Bookkeeping runs under one mutex with short, never-awaiting critical
/// sections; the guarded call itself executes outside the lock, so multiple
/// callers run the dependency concurrently while CLOSED.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// Permission to run one guarded call.
///
/// Consume with [`Admission::record_success`] or [`Admission::record_failure`].
/// Dropping it unconsumed (caller cancelled mid-call) releases a HALF_OPEN
/// trial slot without recording an outcome.
#[derive(Debug)]
#[must_use = "an admission must be consumed by recording the call's outcome"]
pub struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    done: bool,
}

impl Admission<'_> {
    /// Record a successful guarded call
    pub fn record_success(mut self, duration: Duration) {
        self.done = true;
        self.breaker.record(true, duration, None, self.trial);
    }

    /// Record a failed guarded call
    pub fn record_failure(mut self, duration: Duration, error_code: &'static str) {
        self.done = true;
        self.breaker.record(false, duration, Some(error_code), self.trial);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.done && self.trial {
            let mut inner = self.breaker.lock();
            inner.trial_in_flight = false;
        }
    }
}

impl CircuitBreaker {
    /// Create a new breaker with config
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Create with default config and a name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::new(CircuitBreakerConfig::new(name))
    }

    /// The breaker's config
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Bookkeeping never panics under the lock; recover rather than poison
        // every future call if a panic happens elsewhere in the process.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state. OPEN expiry is evaluated lazily by [`Self::acquire`],
    /// so this reports OPEN until the next call attempt even after
    /// `recovery_timeout` has elapsed.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Request permission to run one guarded call.
    ///
    /// While OPEN the call is rejected until `recovery_timeout` elapses, then
    /// the breaker moves to HALF_OPEN and admits a single trial. While
    /// HALF_OPEN only one trial may be in flight at a time; concurrent
    /// callers are rejected.
    pub fn acquire(&self) -> Result<Admission<'_>, CircuitOpenError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission {
                breaker: self,
                trial: false,
                done: false,
            }),
            CircuitState::Open => {
                let now = Instant::now();
                let expired = inner.next_attempt.map_or(true, |at| now >= at);
                if expired {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    inner.trial_in_flight = true;
                    tracing::info!(
                        circuit = %self.config.name,
                        "circuit half-open, admitting trial call"
                    );
                    Ok(Admission {
                        breaker: self,
                        trial: true,
                        done: false,
                    })
                } else {
                    inner.rejected_calls += 1;
                    Err(CircuitOpenError {
                        service: self.config.name.clone(),
                        state: CircuitState::Open,
                        retry_after: inner.next_attempt.map(|at| at.saturating_duration_since(now)),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    inner.rejected_calls += 1;
                    Err(CircuitOpenError {
                        service: self.config.name.clone(),
                        state: CircuitState::HalfOpen,
                        retry_after: None,
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(Admission {
                        breaker: self,
                        trial: true,
                        done: false,
                    })
                }
            }
        }
    }

    fn record(&self, success: bool, duration: Duration, error_code: Option<&'static str>, trial: bool) {
        let mut inner = self.lock();
        if trial {
            inner.trial_in_flight = false;
        }

        let now = Instant::now();
        inner.window.push_back(RequestRecord {
            at: now,
            success,
            duration,
            error_code,
        });
        // Prune by age first, then cap by size.
        while inner
            .window
            .front()
            .map_or(false, |r| now.duration_since(r.at) > WINDOW_RETENTION)
        {
            inner.window.pop_front();
        }
        while inner.window.len() > self.config.window_size {
            inner.window.pop_front();
        }

        inner.total_calls += 1;
        if success {
            inner.total_successes += 1;
        } else {
            inner.total_failures += 1;
        }

        match inner.state {
            CircuitState::Closed => {
                if success {
                    inner.failure_count = 0;
                } else {
                    inner.failure_count += 1;
                    let windowed = inner.window.len() >= self.config.minimum_requests
                        && inner.failure_rate() >= WINDOW_FAILURE_RATE;
                    if inner.failure_count >= self.config.failure_threshold || windowed {
                        self.open(&mut inner, now);
                        tracing::warn!(
                            circuit = %self.config.name,
                            consecutive_failures = inner.failure_count,
                            failure_rate = inner.failure_rate(),
                            "circuit opened due to failures"
                        );
                    }
                }
            }
            CircuitState::HalfOpen => {
                if success {
                    inner.success_count += 1;
                    if inner.success_count >= self.config.success_threshold {
                        inner.state = CircuitState::Closed;
                        inner.failure_count = 0;
                        inner.success_count = 0;
                        inner.next_attempt = None;
                        tracing::info!(
                            circuit = %self.config.name,
                            "circuit closed after successful recovery"
                        );
                    }
                } else {
                    self.open(&mut inner, now);
                    tracing::warn!(
                        circuit = %self.config.name,
                        "circuit reopened after trial failure"
                    );
                }
            }
            CircuitState::Open => {
                // Late completion of a call admitted before the trip; the
                // outcome stays in the totals and window but cannot change
                // state here.
            }
        }
    }

    fn open(&self, inner: &mut Inner, now: Instant) {
        inner.state = CircuitState::Open;
        inner.next_attempt = Some(now + self.config.recovery_timeout);
        inner.success_count = 0;
        inner.trial_in_flight = false;
    }

    /// Execute one call with circuit breaker protection.
    ///
    /// Fast-fails with [`CircuitOpenError`] while OPEN. The call is bounded
    /// by `call_timeout`; expiry counts as a failure and surfaces as a
    /// timeout [`ServiceError`].
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let admission = self.acquire()?;
        let started = Instant::now();
        match tokio::time::timeout(self.config.call_timeout, f()).await {
            Ok(Ok(value)) => {
                admission.record_success(started.elapsed());
                Ok(value)
            }
            Ok(Err(err)) => {
                admission.record_failure(started.elapsed(), err.code());
                Err(ResilienceError::Service(err))
            }
            Err(_) => {
                let err = ServiceError::messaging(
                    ErrorKind::Timeout,
                    self.config.name.clone(),
                    format!("call timed out after {:?}", self.config.call_timeout),
                );
                admission.record_failure(started.elapsed(), err.code());
                Err(ResilienceError::Service(err))
            }
        }
    }

    /// Snapshot of state and counters
    pub fn stats(&self) -> CircuitStats {
        let inner = self.lock();
        let open_remaining = match inner.state {
            CircuitState::Open => inner
                .next_attempt
                .map(|at| at.saturating_duration_since(Instant::now())),
            _ => None,
        };
        CircuitStats {
            name: self.config.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            failure_rate: inner.failure_rate(),
            window_len: inner.window.len(),
            total_calls: inner.total_calls,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            rejected_calls: inner.rejected_calls,
            open_remaining,
        }
    }

    /// Operator override: return to CLOSED with fresh counters
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = Inner::new();
        tracing::info!(circuit = %self.config.name, "circuit reset by operator");
    }

    /// Operator override: force OPEN for a full recovery window
    pub fn force_open(&self) {
        let mut inner = self.lock();
        let now = Instant::now();
        self.open(&mut inner, now);
        tracing::warn!(circuit = %self.config.name, "circuit forced open by operator");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fail() -> ServiceError {
        ServiceError::messaging(ErrorKind::Connection, "test", "connection refused")
    }

    fn trip(cb: &CircuitBreaker, failures: u32) {
        for _ in 0..failures {
            match cb.acquire() {
                Ok(a) => a.record_failure(Duration::from_millis(1), "connection"),
                Err(e) => panic!("unexpected rejection while tripping: {e}"),
            }
        }
    }

    #[test]
    fn test_starts_closed_with_zero_counters() {
        let cb = CircuitBreaker::with_name("test");
        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
        assert_eq!(stats.total_calls, 0);
        assert_eq!(stats.rejected_calls, 0);
        assert!(stats.open_remaining.is_none());
    }

    #[test]
    fn test_opens_after_exact_failure_threshold() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(3)
            .with_minimum_requests(1000); // window rule cannot trigger
        let cb = CircuitBreaker::new(config);

        trip(&cb, 2);
        assert_eq!(cb.state(), CircuitState::Closed);

        trip(&cb, 1);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(3)
            .with_minimum_requests(1000);
        let cb = CircuitBreaker::new(config);

        trip(&cb, 2);
        cb.acquire().unwrap().record_success(Duration::from_millis(1));
        assert_eq!(cb.stats().failure_count, 0);

        trip(&cb, 2);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_windowed_failure_rate_trips() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(100) // consecutive rule cannot trigger
            .with_minimum_requests(4);
        let cb = CircuitBreaker::new(config);

        cb.acquire().unwrap().record_success(Duration::from_millis(1));
        cb.acquire().unwrap().record_success(Duration::from_millis(1));
        cb.acquire().unwrap().record_failure(Duration::from_millis(1), "timeout");
        assert_eq!(cb.state(), CircuitState::Closed); // 3 samples < minimum

        cb.acquire().unwrap().record_failure(Duration::from_millis(1), "timeout");
        assert_eq!(cb.state(), CircuitState::Open); // 2/4 = 0.5
    }

    #[test]
    fn test_window_capped_by_size() {
        let config = CircuitBreakerConfig::new("test")
            .with_window_size(3)
            .with_failure_threshold(1000)
            .with_minimum_requests(1000);
        let cb = CircuitBreaker::new(config);

        for _ in 0..5 {
            cb.acquire().unwrap().record_success(Duration::from_millis(1));
        }
        assert_eq!(cb.stats().window_len, 3);
        assert_eq!(cb.stats().total_calls, 5);
    }

    #[tokio::test]
    async fn test_open_rejects_without_invoking() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(1)
            .with_minimum_requests(1000)
            .with_recovery_timeout(Duration::from_secs(60));
        let cb = CircuitBreaker::new(config);
        trip(&cb, 1);

        let invocations = AtomicU32::new(0);
        let result = cb
            .call(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ServiceError>(42)
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::CircuitOpen(_))));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert_eq!(cb.stats().rejected_calls, 1);
        // Fast failures never enter the window.
        assert_eq!(cb.stats().window_len, 1);
    }

    #[tokio::test]
    async fn test_recovers_after_timeout_and_success_threshold() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(1)
            .with_minimum_requests(1000)
            .with_success_threshold(2)
            .with_recovery_timeout(Duration::from_millis(50));
        let cb = CircuitBreaker::new(config);
        trip(&cb, 1);
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(60)).await;

        let a = cb.acquire().expect("trial call should be admitted");
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        a.record_success(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.acquire().unwrap().record_success(Duration::from_millis(1));
        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(1)
            .with_minimum_requests(1000)
            .with_recovery_timeout(Duration::from_millis(50));
        let cb = CircuitBreaker::new(config);
        trip(&cb, 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let a = cb.acquire().expect("trial admitted");
        a.record_failure(Duration::from_millis(1), "connection");

        assert_eq!(cb.state(), CircuitState::Open);
        // next_attempt was reset, so the very next acquire is rejected again
        assert!(cb.acquire().is_err());
    }

    #[tokio::test]
    async fn test_half_open_is_single_flight() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(1)
            .with_minimum_requests(1000)
            .with_recovery_timeout(Duration::from_millis(10));
        let cb = CircuitBreaker::new(config);
        trip(&cb, 1);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let first = cb.acquire().expect("first trial admitted");
        let second = cb.acquire();
        assert!(second.is_err());
        assert_eq!(second.unwrap_err().state, CircuitState::HalfOpen);

        // Abandoning the trial releases the slot without recording an outcome.
        drop(first);
        assert!(cb.acquire().is_ok());
    }

    #[tokio::test]
    async fn test_call_timeout_counts_as_failure() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(2)
            .with_minimum_requests(1000)
            .with_call_timeout(Duration::from_millis(20));
        let cb = CircuitBreaker::new(config);

        let result = cb
            .call(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, ServiceError>(())
            })
            .await;

        match result {
            Err(ResilienceError::Service(e)) => assert_eq!(e.kind, ErrorKind::Timeout),
            other => panic!("expected timeout failure, got {other:?}"),
        }
        assert_eq!(cb.stats().failure_count, 1);
    }

    #[tokio::test]
    async fn test_call_success_and_failure_recorded() {
        let cb = CircuitBreaker::with_name("test");

        let ok = cb.call(|| async { Ok::<_, ServiceError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = cb.call(|| async { Err::<(), _>(fail()) }).await;
        assert!(err.is_err());

        let stats = cb.stats();
        assert_eq!(stats.total_successes, 1);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.window_len, 2);
    }

    #[test]
    fn test_force_open_and_reset() {
        let cb = CircuitBreaker::with_name("test");
        cb.force_open();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.stats().open_remaining.is_some());
        assert!(cb.acquire().is_err());

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.acquire().is_ok());
    }

    #[test]
    fn test_open_error_carries_retry_after() {
        let config = CircuitBreakerConfig::new("test")
            .with_failure_threshold(1)
            .with_minimum_requests(1000)
            .with_recovery_timeout(Duration::from_secs(30));
        let cb = CircuitBreaker::new(config);
        trip(&cb, 1);

        let err = cb.acquire().unwrap_err();
        assert_eq!(err.service, "test");
        assert_eq!(err.state, CircuitState::Open);
        assert!(err.retry_after.unwrap() <= Duration::from_secs(30));
    }
}
