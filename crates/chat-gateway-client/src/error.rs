//! Client error types

use crate::dispatch::SubscriberClosed;
use crate::protocol::{CloseCode, DecodeError};
use thiserror::Error;

/// Gateway client error type
///
/// Transport hiccups are retried inside the session loop; only the
/// variants below escape to the embedding application.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// WebSocket-level failure
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The inbound stream produced an undecodable frame
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Gateway bootstrap request failed
    #[error("bootstrap request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server never sent Hello within the allowed window
    #[error("timed out waiting for Hello")]
    HelloTimeout,

    /// Close code that must not be retried with this configuration
    #[error("fatal close: {0}")]
    FatalClose(CloseCode),

    /// Too many consecutive fresh-Identify failures
    #[error("gave up after {attempts} consecutive identify failures")]
    IdentifyExhausted { attempts: u32 },

    /// The application stopped consuming events
    #[error(transparent)]
    SubscriberClosed(#[from] SubscriberClosed),

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Orderly shutdown requested
    #[error("client shut down")]
    Shutdown,
}

impl GatewayError {
    /// Whether this error ends the shard for good
    ///
    /// Non-fatal errors are re-entered through the reconnect loop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FatalClose(_)
                | Self::IdentifyExhausted { .. }
                | Self::SubscriberClosed(_)
                | Self::Config(_)
                | Self::Shutdown
        )
    }
}

/// Result type for gateway client operations
pub type GatewayResult<T> = Result<T, GatewayError>;
