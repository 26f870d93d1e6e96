//! Keyed cache of circuit breakers, one per guarded service.
//!
//! Constructed explicitly and injected into the executor; there is no
//! process-global registry, so tests never leak breaker state into each
//! other.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStats};

/// Thread-safe registry of breakers by service name.
///
/// `get_or_create` guarantees exactly one breaker instance per name for the
/// registry's lifetime; the first caller's config wins.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            breakers: DashMap::new(),
        }
    }

    /// Return the breaker for `name`, creating it atomically on first use.
    pub fn get_or_create(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                let config = CircuitBreakerConfig {
                    name: name.to_string(),
                    ..config
                };
                tracing::debug!(circuit = name, "registered circuit breaker");
                Arc::new(CircuitBreaker::new(config))
            })
            .clone()
    }

    /// Return the breaker for `name`, if one exists
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.clone())
    }

    /// Names of breakers currently OPEN
    pub fn list_unhealthy(&self) -> Vec<String> {
        self.breakers
            .iter()
            .filter(|entry| entry.state() == CircuitState::Open)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Stats snapshot for every registered breaker
    pub fn all_stats(&self) -> HashMap<String, CircuitStats> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.stats()))
            .collect()
    }

    /// Operator override: reset the named breaker. Returns `false` if the
    /// name is unknown.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Operator override: force the named breaker OPEN. Returns `false` if
    /// the name is unknown.
    pub fn force_open(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.force_open();
                true
            }
            None => false,
        }
    }

    /// Number of registered breakers
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    /// Whether any breakers are registered
    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = CircuitBreakerRegistry::new();
        let a = registry.get_or_create("twilio", CircuitBreakerConfig::default());
        let b = registry.get_or_create("twilio", CircuitBreakerConfig::default());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_breaker_named_after_registry_key() {
        let registry = CircuitBreakerRegistry::new();
        let breaker = registry.get_or_create("prelude", CircuitBreakerConfig::default());
        assert_eq!(breaker.config().name, "prelude");
    }

    #[test]
    fn test_first_config_wins() {
        let registry = CircuitBreakerRegistry::new();
        let first = CircuitBreakerConfig::default().with_failure_threshold(7);
        registry.get_or_create("twilio", first);

        let second = CircuitBreakerConfig::default().with_failure_threshold(99);
        let breaker = registry.get_or_create("twilio", second);
        assert_eq!(breaker.config().failure_threshold, 7);
    }

    #[test]
    fn test_list_unhealthy() {
        let registry = CircuitBreakerRegistry::new();
        registry.get_or_create("twilio", CircuitBreakerConfig::default());
        registry.get_or_create("anthropic", CircuitBreakerConfig::default());
        assert!(registry.list_unhealthy().is_empty());

        registry.force_open("anthropic");
        assert_eq!(registry.list_unhealthy(), vec!["anthropic".to_string()]);
    }

    #[test]
    fn test_all_stats() {
        let registry = CircuitBreakerRegistry::new();
        registry.get_or_create("twilio", CircuitBreakerConfig::default());
        registry.get_or_create("prelude", CircuitBreakerConfig::default());

        let stats = registry.all_stats();
        assert_eq!(stats.len(), 2);
        assert!(stats.contains_key("twilio"));
        assert_eq!(stats["prelude"].total_calls, 0);
    }

    #[test]
    fn test_reset_and_force_open_unknown_name() {
        let registry = CircuitBreakerRegistry::new();
        assert!(!registry.reset("nope"));
        assert!(!registry.force_open("nope"));
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_single_instance() {
        let registry = Arc::new(CircuitBreakerRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.get_or_create("shared", CircuitBreakerConfig::default())
            }));
        }

        let mut breakers = Vec::new();
        for handle in handles {
            breakers.push(handle.await.expect("task panicked"));
        }
        assert_eq!(registry.len(), 1);
        for breaker in &breakers[1..] {
            assert!(Arc::ptr_eq(&breakers[0], breaker));
        }
    }
}
