//! # chat-gateway-client
//!
//! Client side of the real-time gateway: sharded, resumable WebSocket
//! sessions delivering typed dispatch events to the embedding
//! application.
//!
//! ```no_run
//! use chat_common::ClientConfig;
//! use chat_gateway_client::ShardCoordinator;
//!
//! # async fn run() -> Result<(), chat_gateway_client::GatewayError> {
//! let config = ClientConfig::from_env().map_err(|e| {
//!     chat_gateway_client::GatewayError::Config(e.to_string())
//! })?;
//! let (coordinator, mut events) = ShardCoordinator::start(config).await?;
//!
//! while let Some(shard_event) = events.recv().await {
//!     tracing::info!(
//!         shard_id = shard_event.shard_id,
//!         event = shard_event.event.name(),
//!         "Dispatch received"
//!     );
//! }
//!
//! coordinator.shutdown();
//! coordinator.join().await
//! # }
//! ```

pub mod backoff;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod rest;
pub mod session;
pub mod shard;
pub mod transport;

// Re-export commonly used types at crate root
pub use dispatch::{DispatchRouter, GatewayEvent, GatewayEventType, ShardEvent};
pub use error::{GatewayError, GatewayResult};
pub use protocol::{CloseCode, Codec, DecodeError, GatewayMessage, OpCode, ReconnectPolicy};
pub use session::{SequenceTracker, Session, SessionState, ShardSession};
pub use shard::{IdentifyLimiter, SessionStartLimit, ShardCoordinator};
