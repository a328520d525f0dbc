//! Retry policy (§4.7): bounded re-attempts of the *same* WorkItem,
//! distinct from a `goto` routing loop — retry never touches the routing
//! loop counter.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound (in ms) of random jitter added on top of the computed
    /// backoff, so that many branches retrying the same check don't wake
    /// up in lockstep. `0` (the default) disables jitter entirely, which
    /// keeps `delay_for` deterministic for callers that need it to be.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
            backoff_multiplier: 1.0,
            jitter_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (0-indexed; attempt 0 never
    /// sleeps, it's the first try).
    pub fn delay_for(&self, attempt: u32) -> std::time::Duration {
        if attempt == 0 || self.backoff_ms == 0 {
            return std::time::Duration::ZERO;
        }
        let ms = self.backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        let jitter = if self.jitter_ms > 0 { rand::rng().random_range(0..=self.jitter_ms) } else { 0 };
        std::time::Duration::from_millis(ms.round() as u64 + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_has_no_delay() {
        let p = RetryPolicy {
            max_attempts: 3,
            backoff_ms: 100,
            backoff_multiplier: 2.0,
            jitter_ms: 0,
        };
        assert_eq!(p.delay_for(0), std::time::Duration::ZERO);
    }

    #[test]
    fn backoff_grows_by_multiplier() {
        let p = RetryPolicy {
            max_attempts: 3,
            backoff_ms: 100,
            backoff_multiplier: 2.0,
            jitter_ms: 0,
        };
        assert_eq!(p.delay_for(1), std::time::Duration::from_millis(100));
        assert_eq!(p.delay_for(2), std::time::Duration::from_millis(200));
        assert_eq!(p.delay_for(3), std::time::Duration::from_millis(400));
    }

    #[test]
    fn jitter_adds_at_most_the_configured_bound() {
        let p = RetryPolicy {
            max_attempts: 3,
            backoff_ms: 100,
            backoff_multiplier: 1.0,
            jitter_ms: 50,
        };
        for _ in 0..20 {
            let delay = p.delay_for(1).as_millis();
            assert!((100..=150).contains(&delay), "delay {delay} outside [100, 150]");
        }
    }
}
