//! Identify rate limiting
//!
//! The session start limit is the only state shared across shards: a
//! global quota window plus `max_concurrency` buckets, each allowing one
//! in-flight Identify at a time. Resume attempts do not touch it.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// Identify quota returned by the gateway bootstrap call
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SessionStartLimit {
    /// Total Identify calls allowed per window
    pub total: u32,
    /// Calls left in the current window
    pub remaining: u32,
    /// Milliseconds until the window resets
    pub reset_after: u64,
    /// Number of concurrency buckets
    pub max_concurrency: u32,
}

/// Permission to send one Identify
///
/// Holds the concurrency bucket until dropped; keep it alive until READY
/// arrives (or the attempt fails) so the bucket stays serialized.
#[derive(Debug)]
pub struct IdentifyPermit {
    bucket: u32,
    _guard: OwnedMutexGuard<()>,
}

impl IdentifyPermit {
    /// The concurrency bucket this permit belongs to
    #[must_use]
    pub fn bucket(&self) -> u32 {
        self.bucket
    }
}

#[derive(Debug)]
struct QuotaWindow {
    total: u32,
    remaining: u32,
    window: Duration,
    reset_at: Instant,
}

/// Application-wide Identify limiter shared by every shard
#[derive(Debug)]
pub struct IdentifyLimiter {
    buckets: Vec<Arc<Mutex<()>>>,
    quota: Mutex<QuotaWindow>,
    max_concurrency: u32,
}

impl IdentifyLimiter {
    /// Build a limiter from a freshly fetched session start limit
    #[must_use]
    pub fn new(limit: &SessionStartLimit) -> Arc<Self> {
        let max_concurrency = limit.max_concurrency.max(1);
        let window = Duration::from_millis(limit.reset_after.max(1));

        Arc::new(Self {
            buckets: (0..max_concurrency).map(|_| Arc::new(Mutex::new(()))).collect(),
            quota: Mutex::new(QuotaWindow {
                total: limit.total,
                remaining: limit.remaining,
                window,
                reset_at: Instant::now() + window,
            }),
            max_concurrency,
        })
    }

    /// The bucket a shard identifies through
    #[must_use]
    pub fn bucket_for(&self, shard_id: u32) -> u32 {
        shard_id % self.max_concurrency
    }

    /// Wait for permission to send one Identify
    ///
    /// Blocks until the shard's concurrency bucket is free and the global
    /// window has quota left. When `remaining` is exhausted the call
    /// sleeps until the window resets; nothing goes on the wire early.
    pub async fn acquire(&self, shard_id: u32) -> IdentifyPermit {
        let bucket = self.bucket_for(shard_id);
        let guard = Arc::clone(&self.buckets[bucket as usize]).lock_owned().await;

        loop {
            let wait = {
                let mut quota = self.quota.lock().await;
                let now = Instant::now();

                if now >= quota.reset_at {
                    quota.remaining = quota.total;
                    quota.reset_at = now + quota.window;
                }

                if quota.remaining > 0 {
                    quota.remaining -= 1;
                    tracing::debug!(
                        shard_id,
                        bucket,
                        remaining = quota.remaining,
                        "Identify quota consumed"
                    );
                    return IdentifyPermit {
                        bucket,
                        _guard: guard,
                    };
                }

                let wait = quota.reset_at.saturating_duration_since(now);
                tracing::info!(
                    shard_id,
                    wait_ms = wait.as_millis() as u64,
                    "Identify quota exhausted, waiting for window reset"
                );
                wait
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// Refresh the quota from a re-fetched bootstrap response
    pub async fn refresh(&self, limit: &SessionStartLimit) {
        let mut quota = self.quota.lock().await;
        quota.total = limit.total;
        quota.remaining = limit.remaining;
        quota.window = Duration::from_millis(limit.reset_after.max(1));
        quota.reset_at = Instant::now() + quota.window;
    }
}
