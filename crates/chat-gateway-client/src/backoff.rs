//! Reconnect backoff
//!
//! Exponential backoff with jitter, bounded by a maximum delay. Each
//! shard owns one; a successful connection resets it.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with equal jitter
#[derive(Debug)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff ramping from `base_ms` up to `max_ms`
    #[must_use]
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms: base_ms.max(1),
            max_ms: max_ms.max(base_ms.max(1)),
            attempt: 0,
        }
    }

    /// Next delay: half the exponential ceiling plus a random half
    pub fn next_delay(&mut self) -> Duration {
        let exp = self
            .base_ms
            .saturating_mul(1u64.checked_shl(self.attempt).unwrap_or(u64::MAX))
            .min(self.max_ms);
        self.attempt = self.attempt.saturating_add(1);

        let half = exp / 2;
        let jitter = rand::thread_rng().gen_range(0..=half.max(1));
        Duration::from_millis(half + jitter)
    }

    /// Forget accumulated attempts after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
