//! Heartbeat scheduling
//!
//! Keeps one connection alive at the server-dictated interval and detects
//! zombied connections whose acks stopped coming back.

use super::{Outbound, SequenceTracker};
use crate::protocol::GatewayMessage;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Periodic heartbeat task for one connection
///
/// The first beat fires after a random delay in `[0, interval)` so a
/// fleet of shards reconnecting together does not beat in lockstep.
/// If a beat is still unacknowledged when the next tick arrives, exactly
/// one zombie signal is emitted and the task stops for good; the session
/// tears the connection down and resumes on a fresh one.
pub struct HeartbeatScheduler {
    acked: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl HeartbeatScheduler {
    /// Spawn the heartbeat task for a freshly established connection
    #[must_use]
    pub fn spawn(
        interval_ms: u64,
        sequence: Arc<SequenceTracker>,
        outbound_tx: mpsc::Sender<Outbound>,
        zombie_tx: oneshot::Sender<()>,
    ) -> Self {
        // The previous beat starts out "acked" so the first tick sends
        // instead of flagging a zombie.
        let acked = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(run_heartbeat(
            interval_ms,
            sequence,
            Arc::clone(&acked),
            outbound_tx,
            zombie_tx,
        ));

        Self { acked, task }
    }

    /// Record a Heartbeat ACK from the server
    pub fn ack(&self) {
        self.acked.store(true, Ordering::Release);
    }

    /// Stop ticking; called whenever the connection ends
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_heartbeat(
    interval_ms: u64,
    sequence: Arc<SequenceTracker>,
    acked: Arc<AtomicBool>,
    outbound_tx: mpsc::Sender<Outbound>,
    zombie_tx: oneshot::Sender<()>,
) {
    let interval = Duration::from_millis(interval_ms);
    let first_delay = {
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..interval_ms.max(1)))
    };

    tracing::debug!(
        interval_ms,
        first_delay_ms = first_delay.as_millis() as u64,
        "Heartbeat started"
    );
    tokio::time::sleep(first_delay).await;

    loop {
        if !acked.load(Ordering::Acquire) {
            tracing::warn!("Heartbeat not acknowledged before next tick");
            let _ = zombie_tx.send(());
            return;
        }

        acked.store(false, Ordering::Release);
        let beat = GatewayMessage::heartbeat(sequence.current());
        if outbound_tx.send(Outbound::Frame(beat)).await.is_err() {
            // Connection writer is gone; nothing left to keep alive.
            return;
        }
        tracing::trace!(seq = ?sequence.current(), "Heartbeat sent");

        tokio::time::sleep(interval).await;
    }
}
