//! Gateway message envelope
//!
//! The `{op, d, s, t}` structure every wire frame carries, with
//! constructors for client commands and extractors for server messages.

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, RequestGuildMembersPayload,
    ResumePayload, VoiceStateUpdatePayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message envelope
///
/// All messages sent over the WebSocket connection follow this format.
/// `s` and `t` are present if and only if `op` is Dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    // === Client Commands ===

    /// Create an Identify message (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::command(OpCode::Identify, serde_json::to_value(payload).ok())
    }

    /// Create a Resume message (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::command(OpCode::Resume, serde_json::to_value(payload).ok())
    }

    /// Create a Heartbeat message (op=1) carrying the last observed sequence
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::command(
            OpCode::Heartbeat,
            Some(last_sequence.map_or(Value::Null, |s| Value::Number(s.into()))),
        )
    }

    /// Create a Presence Update message (op=3)
    #[must_use]
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Self {
        Self::command(OpCode::PresenceUpdate, serde_json::to_value(payload).ok())
    }

    /// Create a Voice State Update message (op=4)
    #[must_use]
    pub fn voice_state_update(payload: &VoiceStateUpdatePayload) -> Self {
        Self::command(OpCode::VoiceStateUpdate, serde_json::to_value(payload).ok())
    }

    /// Create a Request Guild Members message (op=8)
    #[must_use]
    pub fn request_guild_members(payload: &RequestGuildMembersPayload) -> Self {
        Self::command(OpCode::RequestGuildMembers, serde_json::to_value(payload).ok())
    }

    fn command(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d,
        }
    }

    // === Server Messages (constructors used by tests and tooling) ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self::command(
            OpCode::Hello,
            serde_json::to_value(HelloPayload { heartbeat_interval }).ok(),
        )
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::command(OpCode::HeartbeatAck, None)
    }

    /// Create a Reconnect message (op=7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::command(OpCode::Reconnect, None)
    }

    /// Create an Invalid Session message (op=9)
    ///
    /// `resumable` indicates if the session can be resumed.
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::command(OpCode::InvalidSession, Some(Value::Bool(resumable)))
    }

    // === Parsing Server Messages ===

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse the Invalid Session resumable flag (op=9)
    ///
    /// A missing or non-boolean payload reads as not resumable.
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Check whether this is a server heartbeat request (op=1)
    #[must_use]
    pub fn is_heartbeat_request(&self) -> bool {
        self.op == OpCode::Heartbeat
    }

    /// Dispatch event name, if this is a Dispatch message
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        if self.op == OpCode::Dispatch {
            self.t.as_deref()
        } else {
            None
        }
    }

    /// Dispatch sequence number, if this is a Dispatch message
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        if self.op == OpCode::Dispatch {
            self.s
        } else {
            None
        }
    }

    // === Utilities ===

    /// Check the envelope invariant: `s`/`t` present iff op is Dispatch
    #[must_use]
    pub fn has_valid_shape(&self) -> bool {
        if self.op == OpCode::Dispatch {
            self.s.is_some() && self.t.is_some()
        } else {
            self.s.is_none() && self.t.is_none()
        }
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
