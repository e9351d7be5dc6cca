//! Wire codec
//!
//! Pure, stateless transform between [`GatewayMessage`] envelopes and wire
//! frames. Two encodings are supported, selected once at connect time:
//!
//! - **json**: self-describing text frames.
//! - **bin**: compact binary frames:
//!
//! ```text
//! ┌────┬───────┬─────────────┬──────────────────┬──────────────────────┐
//! │ op │ flags │ s (u64 BE)  │ u16 len + t utf8 │ u32 len + d (JSON)   │
//! │ 1B │ 1B    │ if FLAG_SEQ │ if FLAG_EVENT    │ if FLAG_BODY         │
//! └────┴───────┴─────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! The body bytes stay JSON in both encodings so payload shapes have a
//! single representation.

use super::{GatewayMessage, OpCode};
use bytes::{Buf, BufMut, BytesMut};
use chat_common::WireEncoding;

/// Presence flag: the frame carries a sequence number
const FLAG_SEQ: u8 = 1 << 0;
/// Presence flag: the frame carries an event name
const FLAG_EVENT: u8 = 1 << 1;
/// Presence flag: the frame carries a body
const FLAG_BODY: u8 = 1 << 2;

/// A frame as it travels on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Codec errors
///
/// A decode failure means the stream can no longer be trusted; the caller
/// closes the connection and discards the session.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown op code: {0}")]
    UnknownOpcode(u8),

    #[error("truncated binary frame")]
    Truncated,

    #[error("{0} trailing bytes after binary frame")]
    TrailingBytes(usize),

    #[error("event name is not valid UTF-8")]
    InvalidEventName,

    #[error("sequence/event fields inconsistent with op {0}")]
    InvalidShape(OpCode),

    #[error("missing or malformed body for op {0}")]
    MalformedBody(OpCode),

    #[error("expected a {expected} frame")]
    UnexpectedFrameType { expected: &'static str },
}

/// Encodes and decodes envelopes for one negotiated encoding
///
/// Stateless; safe to share across tasks.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    encoding: WireEncoding,
}

impl Codec {
    #[must_use]
    pub const fn new(encoding: WireEncoding) -> Self {
        Self { encoding }
    }

    #[must_use]
    pub const fn encoding(&self) -> WireEncoding {
        self.encoding
    }

    /// Encode an envelope into a wire frame
    pub fn encode(&self, message: &GatewayMessage) -> Result<RawFrame, DecodeError> {
        if !message.has_valid_shape() {
            return Err(DecodeError::InvalidShape(message.op));
        }

        match self.encoding {
            WireEncoding::Json => Ok(RawFrame::Text(serde_json::to_string(message)?)),
            WireEncoding::Binary => Ok(RawFrame::Binary(Self::encode_binary(message)?)),
        }
    }

    /// Decode a wire frame into an envelope
    pub fn decode(&self, frame: &RawFrame) -> Result<GatewayMessage, DecodeError> {
        let message = match (self.encoding, frame) {
            (WireEncoding::Json, RawFrame::Text(text)) => serde_json::from_str(text)?,
            (WireEncoding::Binary, RawFrame::Binary(data)) => Self::decode_binary(data)?,
            (WireEncoding::Json, RawFrame::Binary(_)) => {
                return Err(DecodeError::UnexpectedFrameType { expected: "text" })
            }
            (WireEncoding::Binary, RawFrame::Text(_)) => {
                return Err(DecodeError::UnexpectedFrameType { expected: "binary" })
            }
        };

        if !message.has_valid_shape() {
            return Err(DecodeError::InvalidShape(message.op));
        }

        Ok(message)
    }

    fn encode_binary(message: &GatewayMessage) -> Result<Vec<u8>, DecodeError> {
        let body = match &message.d {
            Some(d) => Some(serde_json::to_vec(d)?),
            None => None,
        };

        let mut flags = 0u8;
        if message.s.is_some() {
            flags |= FLAG_SEQ;
        }
        if message.t.is_some() {
            flags |= FLAG_EVENT;
        }
        if body.is_some() {
            flags |= FLAG_BODY;
        }

        let mut buf = BytesMut::with_capacity(
            2 + 8 + message.t.as_ref().map_or(0, String::len)
                + body.as_ref().map_or(0, Vec::len)
                + 6,
        );
        buf.put_u8(message.op.as_u8());
        buf.put_u8(flags);

        if let Some(s) = message.s {
            buf.put_u64(s);
        }
        if let Some(t) = &message.t {
            buf.put_u16(t.len() as u16);
            buf.put_slice(t.as_bytes());
        }
        if let Some(body) = body {
            buf.put_u32(body.len() as u32);
            buf.put_slice(&body);
        }

        Ok(buf.to_vec())
    }

    fn decode_binary(data: &[u8]) -> Result<GatewayMessage, DecodeError> {
        let mut buf = data;

        if buf.remaining() < 2 {
            return Err(DecodeError::Truncated);
        }
        let raw_op = buf.get_u8();
        let op = OpCode::from_u8(raw_op).ok_or(DecodeError::UnknownOpcode(raw_op))?;
        let flags = buf.get_u8();

        let s = if flags & FLAG_SEQ != 0 {
            if buf.remaining() < 8 {
                return Err(DecodeError::Truncated);
            }
            Some(buf.get_u64())
        } else {
            None
        };

        let t = if flags & FLAG_EVENT != 0 {
            if buf.remaining() < 2 {
                return Err(DecodeError::Truncated);
            }
            let len = buf.get_u16() as usize;
            if buf.remaining() < len {
                return Err(DecodeError::Truncated);
            }
            let name = std::str::from_utf8(&buf[..len])
                .map_err(|_| DecodeError::InvalidEventName)?
                .to_string();
            buf.advance(len);
            Some(name)
        } else {
            None
        };

        let d = if flags & FLAG_BODY != 0 {
            if buf.remaining() < 4 {
                return Err(DecodeError::Truncated);
            }
            let len = buf.get_u32() as usize;
            if buf.remaining() < len {
                return Err(DecodeError::Truncated);
            }
            let value = serde_json::from_slice(&buf[..len])?;
            buf.advance(len);
            Some(value)
        } else {
            None
        };

        if buf.has_remaining() {
            return Err(DecodeError::TrailingBytes(buf.remaining()));
        }

        Ok(GatewayMessage { op, t, s, d })
    }
}
