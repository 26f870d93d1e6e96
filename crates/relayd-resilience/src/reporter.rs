//! Error aggregation: per-key counters plus a bounded log of recent errors.
//!
//! Every mapped failure that leaves the resilience layer passes through the
//! reporter, which also picks the log level from the error's severity.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use relayd_error::{ServiceError, Severity};
use serde::Serialize;

const DEFAULT_CAPACITY: usize = 100;

/// One reported failure
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Unix timestamp (seconds)
    pub at: u64,
    /// Dependency that failed
    pub service: String,
    /// Operation that was being performed
    pub operation: String,
    /// Stable error code
    pub code: &'static str,
    /// Human-readable description
    pub message: String,
    /// Context carried by the error
    pub context: HashMap<String, String>,
}

/// Counter map plus the most recent errors
#[derive(Debug, Clone, Serialize)]
pub struct ReporterStats {
    /// Total errors reported since construction
    pub total: u64,
    /// Count per `service:operation:code` key
    pub counts: HashMap<String, u64>,
    /// Recent errors, oldest first
    pub recent: Vec<ErrorRecord>,
}

#[derive(Debug)]
struct Inner {
    counts: HashMap<String, u64>,
    recent: VecDeque<ErrorRecord>,
    total: u64,
}

/// Aggregates reported errors with a fixed-capacity recent-errors ring.
#[derive(Debug)]
pub struct ErrorReporter {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorReporter {
    /// Create a reporter keeping the default number of recent errors
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a reporter keeping at most `capacity` recent errors
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                counts: HashMap::new(),
                recent: VecDeque::with_capacity(capacity),
                total: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one failure under `(service, operation, code)`.
    pub fn report(&self, error: &ServiceError, operation: &str) {
        match error.severity {
            Severity::Critical | Severity::High => tracing::error!(
                service = %error.service,
                operation,
                code = error.code(),
                severity = %error.severity,
                "{error}"
            ),
            Severity::Medium => tracing::warn!(
                service = %error.service,
                operation,
                code = error.code(),
                "{error}"
            ),
            Severity::Low => tracing::info!(
                service = %error.service,
                operation,
                code = error.code(),
                "{error}"
            ),
        }

        let record = ErrorRecord {
            at: unix_now(),
            service: error.service.clone(),
            operation: operation.to_string(),
            code: error.code(),
            message: error.message.clone(),
            context: error.context.clone(),
        };
        let key = format!("{}:{}:{}", error.service, operation, error.code());

        let mut inner = self.lock();
        *inner.counts.entry(key).or_insert(0) += 1;
        inner.total += 1;
        inner.recent.push_back(record);
        while inner.recent.len() > self.capacity {
            inner.recent.pop_front();
        }
    }

    /// Snapshot of counters and recent errors
    pub fn stats(&self) -> ReporterStats {
        let inner = self.lock();
        ReporterStats {
            total: inner.total,
            counts: inner.counts.clone(),
            recent: inner.recent.iter().cloned().collect(),
        }
    }

    /// Total errors reported since construction
    pub fn total(&self) -> u64 {
        self.lock().total
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_error::ErrorKind;

    fn err(n: u32) -> ServiceError {
        ServiceError::messaging(ErrorKind::Timeout, "twilio", format!("timeout {n}"))
    }

    #[test]
    fn test_counts_by_service_operation_code() {
        let reporter = ErrorReporter::new();
        reporter.report(&err(1), "send_sms");
        reporter.report(&err(2), "send_sms");
        reporter.report(&err(3), "send_voice");

        let stats = reporter.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.counts["twilio:send_sms:timeout"], 2);
        assert_eq!(stats.counts["twilio:send_voice:timeout"], 1);
    }

    #[test]
    fn test_ring_evicts_oldest_at_capacity() {
        let reporter = ErrorReporter::with_capacity(3);
        for n in 1..=5 {
            reporter.report(&err(n), "send_sms");
        }

        let stats = reporter.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.counts["twilio:send_sms:timeout"], 5);
        assert_eq!(stats.recent.len(), 3);
        let messages: Vec<_> = stats.recent.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["timeout 3", "timeout 4", "timeout 5"]);
    }

    #[test]
    fn test_record_carries_context() {
        let reporter = ErrorReporter::new();
        let error = ServiceError::ai(ErrorKind::Unavailable, "anthropic", "overloaded")
            .with_context("model", "claude");
        reporter.report(&error, "complete");

        let stats = reporter.stats();
        assert_eq!(stats.recent[0].code, "unavailable");
        assert_eq!(stats.recent[0].context.get("model"), Some(&"claude".to_string()));
    }

    #[test]
    fn test_empty_reporter_stats() {
        let reporter = ErrorReporter::new();
        let stats = reporter.stats();
        assert_eq!(stats.total, 0);
        assert!(stats.counts.is_empty());
        assert!(stats.recent.is_empty());
    }
}
