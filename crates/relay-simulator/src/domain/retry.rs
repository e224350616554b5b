//! Reconnection policy with exponential backoff.
//!
//! After the `n`-th consecutive failure (counting from 0) the producer waits
//!
//! ```text
//! min(initial_delay × 2ⁿ, max_delay)
//! ```
//!
//! and gives up entirely once `max_attempts` consecutive attempts have failed
//! (never, when `max_attempts` is `None`).  A successful connection resets the
//! count.

use std::time::Duration;

/// How the producer retries a lost or refused connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Consecutive failed attempts tolerated before giving up; `None` retries
    /// forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    /// 5 s initial delay, capped at 60 s, unbounded attempts.
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `failures` consecutive failures (0-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        2u32.checked_pow(failures)
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Returns `true` if another attempt is allowed after `failures`
    /// consecutive failures.
    pub fn allows_retry(&self, failures: u32) -> bool {
        self.max_attempts.map_or(true, |max| failures < max)
    }
}
