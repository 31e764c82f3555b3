//! Reconnect backoff policy
//!
//! Pure timing rules for re-establishing a dropped store connection. The
//! policy never sleeps or touches the network itself; the connection owner
//! asks it how long to wait before retry `n` and stops when it says `None`.
//!
//! # Example
//!
//! ```rust
//! use geofinder_core::retry::ReconnectPolicy;
//! use std::time::Duration;
//!
//! let policy = ReconnectPolicy::default();
//! assert_eq!(policy.delay_for_retry(1), Some(Duration::from_secs(1)));
//! assert_eq!(policy.delay_for_retry(3), Some(Duration::from_secs(3)));
//! assert_eq!(policy.delay_for_retry(4), None);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Linear, capped reconnect backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Retries allowed after the first failed connect
    pub max_attempts: u32,
    /// Delay added per retry
    pub step: Duration,
    /// Upper bound on a single delay
    pub max_delay: Duration,
    /// Timeout for each connect attempt
    pub connect_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            step: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            connect_timeout: Duration::from_millis(5000),
        }
    }
}

impl ReconnectPolicy {
    /// A policy that connects once and never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Quick settings for tests and local tooling
    pub fn quick() -> Self {
        Self {
            max_attempts: 1,
            step: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            connect_timeout: Duration::from_millis(250),
        }
    }

    /// Delay before retry number `retries` (1-based).
    ///
    /// `min(retries * step, max_delay)` while `retries <= max_attempts`,
    /// `None` once the budget is spent. Retry 0 is the initial attempt and
    /// waits for nothing.
    pub fn delay_for_retry(&self, retries: u32) -> Option<Duration> {
        if retries == 0 {
            return Some(Duration::ZERO);
        }
        if retries > self.max_attempts {
            return None;
        }

        Some(self.step.saturating_mul(retries).min(self.max_delay))
    }

    /// Total connect attempts including the first one
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}
