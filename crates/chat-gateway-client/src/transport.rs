//! WebSocket transport
//!
//! Owns the connect handshake (including the `v`/`encoding`/`compress`
//! query parameters) and the mapping between transport frames and codec
//! frames. Protocol behavior lives in the session layer.

use crate::error::GatewayResult;
use crate::protocol::{Codec, DecodeError, GatewayMessage, RawFrame};
use chat_common::GatewaySettings;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// The underlying WebSocket stream type
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a gateway connection
pub type WsWriter = SplitSink<WsStream, Message>;

/// Read half of a gateway connection
pub type WsReader = SplitStream<WsStream>;

/// One established WebSocket connection to the gateway
pub struct GatewayConnection {
    stream: WsStream,
    codec: Codec,
}

impl GatewayConnection {
    /// Open a WebSocket connection to `gateway_url`
    ///
    /// `gateway_url` is the bare URL from the bootstrap response (or the
    /// session's resume URL); the negotiated query parameters are
    /// appended here.
    pub async fn connect(gateway_url: &str, settings: &GatewaySettings) -> GatewayResult<Self> {
        let url = Self::build_url(gateway_url, settings);
        tracing::debug!(url = %url, "Opening gateway connection");

        let (stream, _response) = tokio_tungstenite::connect_async(&url).await?;

        Ok(Self {
            stream,
            codec: Codec::new(settings.encoding),
        })
    }

    /// The full connect URL with negotiated query parameters
    #[must_use]
    pub fn build_url(gateway_url: &str, settings: &GatewaySettings) -> String {
        let mut url = format!(
            "{}?v={}&encoding={}",
            gateway_url,
            settings.protocol_version,
            settings.encoding.as_query_value()
        );
        if settings.compress {
            url.push_str("&compress=zlib-stream");
        }
        url
    }

    /// Split into writer and reader halves plus the negotiated codec
    #[must_use]
    pub fn into_parts(self) -> (WsWriter, WsReader, Codec) {
        let (writer, reader) = self.stream.split();
        (writer, reader, self.codec)
    }
}

/// Encode an envelope into a transport frame
pub fn to_ws_message(codec: &Codec, message: &GatewayMessage) -> Result<Message, DecodeError> {
    Ok(match codec.encode(message)? {
        RawFrame::Text(text) => Message::Text(text.into()),
        RawFrame::Binary(data) => Message::Binary(data.into()),
    })
}

/// Decode a data-bearing transport frame into an envelope
///
/// Returns `None` for control frames (ping/pong/close) the session layer
/// handles itself.
pub fn from_ws_message(
    codec: &Codec,
    message: &Message,
) -> Option<Result<GatewayMessage, DecodeError>> {
    match message {
        Message::Text(text) => Some(codec.decode(&RawFrame::Text(text.to_string()))),
        Message::Binary(data) => Some(codec.decode(&RawFrame::Binary(data.to_vec()))),
        _ => None,
    }
}
