//! Gateway protocol definitions
//!
//! The wire envelope, op codes, close codes, command payloads, and the
//! dual-encoding codec.

mod close_codes;
mod codec;
mod envelope;
mod opcodes;
mod payloads;

pub use close_codes::{CloseCode, ReconnectPolicy};
pub use codec::{Codec, DecodeError, RawFrame};
pub use envelope::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload,
    RequestGuildMembersPayload, ResumePayload, VoiceStateUpdatePayload,
};
