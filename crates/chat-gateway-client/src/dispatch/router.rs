//! Dispatch router
//!
//! Decodes named dispatch bodies into typed events and forwards them to
//! the subscriber stream in exact wire order, filtered by the intents
//! negotiated at Identify time.

use super::GatewayEvent;
use chat_core::Intents;
use serde_json::Value;
use tokio::sync::mpsc;

/// A dispatch event tagged with the shard that received it
///
/// Ordering is guaranteed per shard only; consumers must not assume any
/// ordering across shards.
#[derive(Debug, Clone)]
pub struct ShardEvent {
    pub shard_id: u32,
    pub event: GatewayEvent,
}

/// The subscriber stream is gone; the session should shut down
#[derive(Debug, thiserror::Error)]
#[error("event subscriber dropped")]
pub struct SubscriberClosed;

/// Routes inbound dispatch events for one shard
pub struct DispatchRouter {
    shard_id: u32,
    intents: Intents,
    events_tx: mpsc::Sender<ShardEvent>,
}

impl DispatchRouter {
    /// Create a router for one shard's session
    #[must_use]
    pub fn new(shard_id: u32, intents: Intents, events_tx: mpsc::Sender<ShardEvent>) -> Self {
        Self {
            shard_id,
            intents,
            events_tx,
        }
    }

    /// Decode and forward one dispatch event
    ///
    /// Returns whether the event was delivered. Events gated behind an
    /// intent the session did not negotiate are dropped; unknown event
    /// names and known names with undecodable bodies are forwarded
    /// opaquely rather than lost.
    pub async fn route(&self, name: &str, data: Value) -> Result<bool, SubscriberClosed> {
        let event = match GatewayEvent::parse(name, data.clone()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    shard_id = self.shard_id,
                    event = %name,
                    error = %e,
                    "Undecodable event body, forwarding as opaque payload"
                );
                GatewayEvent::Unknown {
                    name: name.to_string(),
                    data,
                }
            }
        };

        if let Some(required) = event.event_type().and_then(|t| t.required_intent()) {
            if !self.intents.has(required) {
                tracing::trace!(
                    shard_id = self.shard_id,
                    event = %name,
                    "Event filtered by intents"
                );
                return Ok(false);
            }
        }

        self.events_tx
            .send(ShardEvent {
                shard_id: self.shard_id,
                event,
            })
            .await
            .map_err(|_| SubscriberClosed)?;

        Ok(true)
    }
}
