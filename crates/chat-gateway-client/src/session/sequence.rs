//! Sequence tracking
//!
//! Records the highest dispatch sequence number seen on a session. The
//! value feeds Heartbeat and Resume commands.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic latch over the last observed sequence number
///
/// Wire sequence numbers start at 1, so 0 marks "nothing observed yet".
/// Observations may race between the read loop and replay; stale or
/// duplicate values are discarded rather than treated as errors.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    value: AtomicU64,
}

impl SequenceTracker {
    /// Create a tracker with no observed sequence
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Record a sequence number, keeping the maximum seen so far
    pub fn observe(&self, seq: u64) {
        self.value.fetch_max(seq, Ordering::AcqRel);
    }

    /// The highest sequence observed, or None before the first dispatch
    #[must_use]
    pub fn current(&self) -> Option<u64> {
        match self.value.load(Ordering::Acquire) {
            0 => None,
            seq => Some(seq),
        }
    }

    /// Forget all observations
    ///
    /// Only called when the session itself is discarded (non-resumable
    /// invalidation or a deliberate fresh Identify).
    pub fn reset(&self) {
        self.value.store(0, Ordering::Release);
    }
}
