//! # Relayd Error
//!
//! This crate provides the unified error taxonomy for the relayd messaging
//! platform. Every failure coming back from an external dependency (SMS/voice
//! providers, verification providers, AI providers, storage) is mapped into a
//! [`ServiceError`] at the resilience boundary, so callers never handle raw
//! transport errors.
//!
//! ## Taxonomy
//!
//! - [`ErrorKind`] - closed set of failure kinds with stable codes
//! - [`Severity`] - LOW/MEDIUM/HIGH/CRITICAL, drives log levels
//! - [`Category`] - which subsystem the failure originated from
//! - [`ServiceError`] - the classified failure carried back to callers
//!
//! Retryability is explicit metadata, not something probed out of messages:
//! each kind carries a default, and `CRITICAL` severity always forces
//! non-retryable regardless of kind.
//!
//! ## Example
//!
//! ```
//! use relayd_error::{Category, ErrorKind, ServiceError};
//! use std::time::Duration;
//!
//! let err = ServiceError::messaging(ErrorKind::RateLimited, "twilio", "429 from provider")
//!     .with_retry_after(Duration::from_secs(30))
//!     .with_context("message_sid", "SM123");
//!
//! assert!(err.is_retryable());
//! assert_eq!(err.code(), "rate_limited");
//! assert_eq!(err.category, Category::Messaging);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed error type accepted at the resilience boundary.
///
/// Operations wrapped by the resilient executor return this; a mapper turns
/// it into a [`ServiceError`] before anything is surfaced to callers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How serious a failure is. Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Expected failures (validation, bad input)
    Low,
    /// Transient failures that resolve on their own
    Medium,
    /// Failures requiring attention (auth, sustained unavailability)
    High,
    /// Failures that must never be retried and should page someone
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Which subsystem a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Phone/email verification providers
    Verification,
    /// SMS and voice providers
    Messaging,
    /// AI/LLM providers
    Ai,
    /// Databases and object storage
    Storage,
    /// Message routing decisions
    Routing,
    /// Subscription and billing
    Billing,
    /// Request validation
    Validation,
    /// Platform configuration
    Configuration,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verification => write!(f, "verification"),
            Self::Messaging => write!(f, "messaging"),
            Self::Ai => write!(f, "ai"),
            Self::Storage => write!(f, "storage"),
            Self::Routing => write!(f, "routing"),
            Self::Billing => write!(f, "billing"),
            Self::Validation => write!(f, "validation"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Closed set of failure kinds.
///
/// Each kind carries a stable string code plus default severity, retryability
/// and retry-after metadata. Instances may override severity and retry-after
/// on the [`ServiceError`]; retryability of the kind itself is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Operation exceeded its time bound
    Timeout,
    /// Could not reach the dependency at all
    Connection,
    /// Dependency asked us to slow down
    RateLimited,
    /// Dependency is up but refusing work (5xx, maintenance)
    Unavailable,
    /// Credentials rejected or missing
    Authentication,
    /// The request itself was malformed
    Validation,
    /// Account balance too low to perform the operation
    InsufficientBalance,
    /// A plan or quota limit was exceeded
    LimitExceeded,
    /// Platform misconfiguration detected at call time
    Configuration,
    /// Anything we could not classify further
    Internal,
}

impl ErrorKind {
    /// Stable string code for logs, metrics keys and API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::RateLimited => "rate_limited",
            Self::Unavailable => "unavailable",
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::InsufficientBalance => "insufficient_balance",
            Self::LimitExceeded => "limit_exceeded",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        }
    }

    /// Default severity for this kind.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::Timeout | Self::Connection | Self::RateLimited | Self::LimitExceeded => {
                Severity::Medium
            }
            Self::Unavailable | Self::Authentication | Self::InsufficientBalance => Severity::High,
            Self::Validation => Severity::Low,
            Self::Configuration => Severity::High,
            Self::Internal => Severity::Medium,
        }
    }

    /// Whether this kind is retryable by default.
    ///
    /// Authentication, validation and balance/limit failures never are:
    /// retrying them wastes provider quota without changing the outcome.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection | Self::RateLimited | Self::Unavailable => true,
            Self::Authentication
            | Self::Validation
            | Self::InsufficientBalance
            | Self::LimitExceeded
            | Self::Configuration => false,
            Self::Internal => false,
        }
    }

    /// Default retry-after hint for this kind, if it has one.
    pub fn default_retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited => Some(Duration::from_secs(5)),
            Self::Unavailable => Some(Duration::from_secs(30)),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A classified failure from an external dependency.
///
/// Created once at the resilience boundary and immutable afterwards (the
/// `with_*` builders consume `self`). This is the only error shape, besides
/// the circuit-open signal, that callers of the resilience layer ever see.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{service}/{kind}] {message}")]
pub struct ServiceError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Where it went wrong
    pub category: Category,
    /// How bad it is
    pub severity: Severity,
    /// The dependency that failed, e.g. `"twilio"`
    pub service: String,
    /// Human-readable description
    pub message: String,
    /// Provider-suggested wait before retrying; overrides a smaller
    /// computed backoff in the retry engine
    pub retry_after: Option<Duration>,
    /// Extra key/value context for logs and debugging
    pub context: HashMap<String, String>,
}

impl ServiceError {
    /// Creates an error with the kind's default severity and retry-after.
    pub fn new(
        kind: ErrorKind,
        category: Category,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            category,
            severity: kind.default_severity(),
            service: service.into(),
            message: message.into(),
            retry_after: kind.default_retry_after(),
            context: HashMap::new(),
        }
    }

    /// Failure from a verification provider.
    pub fn verification(
        kind: ErrorKind,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(kind, Category::Verification, service, message)
    }

    /// Failure from an SMS/voice provider.
    pub fn messaging(
        kind: ErrorKind,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(kind, Category::Messaging, service, message)
    }

    /// Failure from an AI provider.
    pub fn ai(kind: ErrorKind, service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, Category::Ai, service, message)
    }

    /// Failure from a database or object store.
    pub fn storage(
        kind: ErrorKind,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(kind, Category::Storage, service, message)
    }

    /// Failure while routing a message.
    pub fn routing(
        kind: ErrorKind,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(kind, Category::Routing, service, message)
    }

    /// Failure from subscription/billing checks.
    pub fn billing(
        kind: ErrorKind,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(kind, Category::Billing, service, message)
    }

    /// Request validation failure. Always `LOW` severity, never retryable.
    pub fn validation(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, Category::Validation, service, message)
    }

    /// Platform configuration failure.
    pub fn configuration(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Configuration,
            Category::Configuration,
            service,
            message,
        )
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Overrides the category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Sets the provider-suggested retry delay.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Adds one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Stable string code of the underlying kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Whether retrying this failure can help.
    ///
    /// `CRITICAL` severity forces `false` regardless of kind.
    pub fn is_retryable(&self) -> bool {
        if self.severity == Severity::Critical {
            return false;
        }
        self.kind.is_retryable()
    }

    /// Suggested wait before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Maps an HTTP status from a provider response into the taxonomy.
    ///
    /// The category defaults per kind; adjust with [`Self::with_category`]
    /// when the caller knows the origin.
    pub fn from_http_status(status: u16, service: impl Into<String>) -> Self {
        let service = service.into();
        let message = format!("provider returned HTTP {status}");
        match status {
            400 | 404 | 422 => Self::new(ErrorKind::Validation, Category::Validation, service, message),
            401 | 403 => Self::messaging(ErrorKind::Authentication, service, message),
            402 => Self::billing(ErrorKind::InsufficientBalance, service, message),
            408 | 504 => Self::messaging(ErrorKind::Timeout, service, message),
            429 => Self::messaging(ErrorKind::RateLimited, service, message),
            500..=599 => Self::messaging(ErrorKind::Unavailable, service, message),
            _ => Self::messaging(ErrorKind::Internal, service, message),
        }
    }

    /// Classifies an unmapped error by its message.
    ///
    /// Fallback for raw errors that carry no structure of their own; adapters
    /// with real provider knowledge should map statuses/codes directly.
    pub fn classify_message(service: impl Into<String>, message: impl Into<String>) -> Self {
        let service = service.into();
        let message = message.into();
        let lower = message.to_lowercase();

        let kind = if lower.contains("timeout") || lower.contains("timed out") {
            ErrorKind::Timeout
        } else if lower.contains("rate limit") || lower.contains("too many requests") {
            ErrorKind::RateLimited
        } else if lower.contains("unavailable") || lower.contains("gateway") {
            ErrorKind::Unavailable
        } else if lower.contains("connection") || lower.contains("connect") {
            ErrorKind::Connection
        } else if lower.contains("unauthorized") || lower.contains("forbidden") {
            ErrorKind::Authentication
        } else {
            ErrorKind::Internal
        };

        Self::messaging(kind, service, message)
    }

    /// Structured representation for logs and API payloads.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "category": self.category.to_string(),
            "severity": self.severity.to_string(),
            "service": self.service,
            "message": self.message,
            "retryable": self.is_retryable(),
            "retry_after_secs": self.retry_after.map(|d| d.as_secs_f64()),
            "context": self.context,
        })
    }
}
