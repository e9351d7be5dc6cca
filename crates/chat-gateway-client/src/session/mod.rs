//! Session lifecycle
//!
//! One shard's connection: sequence tracking, heartbeating, session
//! identity, and the state machine driving connect/identify/resume.

mod heartbeat;
mod machine;
mod sequence;
mod state;

pub use heartbeat::HeartbeatScheduler;
pub use machine::ShardSession;
pub use sequence::SequenceTracker;
pub use state::{Session, SessionState};

use crate::protocol::{CloseCode, GatewayMessage};

/// Frames queued to a connection's writer task
#[derive(Debug)]
pub enum Outbound {
    /// Encode and send an envelope
    Frame(GatewayMessage),
    /// Send a close frame, then stop writing
    Close(CloseCode),
}
