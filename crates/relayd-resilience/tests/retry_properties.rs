//! Property-based tests for backoff delay calculation.
//!
//! Run with: `cargo test -p relayd-resilience --test retry_properties`

use std::time::Duration;

use proptest::prelude::*;
use relayd_resilience::calculate_delay;
use relayd_testing::{attempt_number, retry_policy};

proptest! {
    /// No computed delay ever exceeds the policy ceiling, jitter or not.
    #[test]
    fn delay_never_exceeds_max(policy in retry_policy(), attempt in attempt_number()) {
        let delay = calculate_delay(&policy, attempt);
        prop_assert!(delay <= policy.max_delay);
    }

    /// Without jitter, delays never shrink as attempts increase.
    #[test]
    fn delay_monotone_without_jitter(policy in retry_policy(), attempt in 1u32..=31) {
        let policy = policy.with_jitter(false);
        let current = calculate_delay(&policy, attempt);
        let next = calculate_delay(&policy, attempt + 1);
        prop_assert!(next >= current);
    }

    /// Jitter only shrinks a delay, never below half of the unjittered value.
    #[test]
    fn jitter_stays_in_band(policy in retry_policy(), attempt in attempt_number()) {
        let unjittered = calculate_delay(&policy.clone().with_jitter(false), attempt);
        let jittered = calculate_delay(&policy.with_jitter(true), attempt);
        prop_assert!(jittered <= unjittered);
        // Allow a small tolerance for float conversion at the boundary.
        let floor = unjittered.mul_f64(0.5).saturating_sub(Duration::from_nanos(100));
        prop_assert!(jittered >= floor);
    }

    /// The first retry delay equals the base delay for every growing strategy.
    #[test]
    fn first_delay_is_base(policy in retry_policy()) {
        let policy = policy.with_jitter(false);
        let expected = match policy.strategy {
            relayd_resilience::BackoffStrategy::Immediate => Duration::ZERO,
            _ => policy.base_delay.min(policy.max_delay),
        };
        prop_assert_eq!(calculate_delay(&policy, 1), expected);
    }
}
