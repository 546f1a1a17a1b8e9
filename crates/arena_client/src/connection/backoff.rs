//! Exponential backoff between connection attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay schedule applied after failed connection attempts.
///
/// After the `n`-th consecutive failure the manager waits
/// `min(base_delay * multiplier^(n-1), max_delay)` before trying again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Growth factor applied per additional failure
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            multiplier: 1.5,
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy from explicit parameters.
    ///
    /// A multiplier below 1.0 would make delays shrink, so it is clamped to 1.0.
    pub fn new(base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            base_delay,
            multiplier: if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 },
            max_delay,
        }
    }

    /// Delay to wait after `failures` consecutive failed attempts.
    ///
    /// `delay(0)` is zero: the first attempt of a cycle starts immediately.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.base_delay.as_millis() as f64 * factor;
        let cap = self.max_delay.as_millis() as f64;

        if !millis.is_finite() || millis >= cap {
            self.max_delay
        } else {
            Duration::from_millis(millis.round() as u64).min(self.max_delay)
        }
    }
}
