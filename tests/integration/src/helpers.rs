//! Mock servers and shard harness

use anyhow::{anyhow, bail, Context, Result};
use chat_common::ClientConfig;
use chat_gateway_client::shard::{IdentifyLimiter, SessionStartLimit};
use chat_gateway_client::protocol::RawFrame;
use chat_gateway_client::{Codec, GatewayMessage, GatewayResult, ShardEvent, ShardSession};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// How long helpers wait for an expected frame before failing the test
///
/// Generous enough to cover the mandatory pre-Identify pause.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// In-process mock gateway accepting WebSocket connections
pub struct MockGateway {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockGateway {
    /// Bind on an ephemeral local port
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// The URL clients connect to
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Accept the next client connection and complete the WS handshake
    pub async fn accept(&self) -> Result<GatewayPeer> {
        let (stream, _) = tokio::time::timeout(RECV_TIMEOUT, self.listener.accept())
            .await
            .context("timed out waiting for a client connection")??;
        let ws = tokio_tungstenite::accept_async(stream).await?;
        Ok(GatewayPeer { ws })
    }
}

/// One accepted client connection, driven by the test script
pub struct GatewayPeer {
    ws: WebSocketStream<TcpStream>,
}

impl GatewayPeer {
    /// Send a raw JSON frame
    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.ws.send(Message::Text(value.to_string().into())).await?;
        Ok(())
    }

    /// Send Hello (op 10)
    pub async fn send_hello(&mut self, heartbeat_interval: u64) -> Result<()> {
        self.send_json(&json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval}}))
            .await
    }

    /// Send a Dispatch frame (op 0)
    pub async fn send_dispatch(&mut self, event: &str, seq: u64, data: Value) -> Result<()> {
        self.send_json(&json!({"op": 0, "t": event, "s": seq, "d": data}))
            .await
    }

    /// Send a Heartbeat ACK (op 11)
    pub async fn send_heartbeat_ack(&mut self) -> Result<()> {
        self.send_json(&json!({"op": 11})).await
    }

    /// Receive the next data frame as JSON
    pub async fn recv_json(&mut self) -> Result<Value> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .context("timed out waiting for a client frame")?;

            match frame {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(_))) => bail!("client closed the connection"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => bail!("client stream ended"),
            }
        }
    }

    /// Receive the next non-heartbeat frame and assert its op code
    ///
    /// Scheduled heartbeats interleave with everything else, so they are
    /// skipped here; use [`Self::expect_heartbeat`] to assert on them.
    pub async fn expect_op(&mut self, op: u8) -> Result<Value> {
        loop {
            let value = self.recv_json().await?;
            let got = value
                .get("op")
                .and_then(Value::as_u64)
                .ok_or_else(|| anyhow!("frame without op: {value}"))?;
            if got == 1 && op != 1 {
                continue;
            }
            if got != u64::from(op) {
                bail!("expected op {op}, got {value}");
            }
            return Ok(value);
        }
    }

    /// Receive the next heartbeat and return its sequence payload
    pub async fn expect_heartbeat(&mut self) -> Result<Value> {
        let value = self.expect_op(1).await?;
        Ok(value.get("d").cloned().unwrap_or(Value::Null))
    }

    /// Assert that no Identify is sent within `window`
    ///
    /// Heartbeats are allowed to flow; an Identify fails the assertion.
    pub async fn expect_no_identify(&mut self, window: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Ok(()),
                Ok(Some(Ok(Message::Text(text)))) => {
                    let value: Value = serde_json::from_str(&text)?;
                    if value.get("op").and_then(Value::as_u64) == Some(2) {
                        bail!("identify sent before the quota window reset");
                    }
                }
                Ok(Some(Ok(_))) => {}
                Ok(other) => bail!("connection ended during quota wait: {other:?}"),
            }
        }
    }

    /// Send an envelope through a codec (for encoding-negotiation tests)
    pub async fn send_message(
        &mut self,
        codec: &Codec,
        message: &GatewayMessage,
    ) -> Result<()> {
        let ws_message = match codec.encode(message)? {
            RawFrame::Text(text) => Message::Text(text.into()),
            RawFrame::Binary(data) => Message::Binary(data.into()),
        };
        self.ws.send(ws_message).await?;
        Ok(())
    }

    /// Receive an envelope through a codec
    pub async fn recv_message(&mut self, codec: &Codec) -> Result<GatewayMessage> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .context("timed out waiting for a client frame")?;

            let raw = match frame {
                Some(Ok(Message::Text(text))) => RawFrame::Text(text.to_string()),
                Some(Ok(Message::Binary(data))) => RawFrame::Binary(data.to_vec()),
                Some(Ok(Message::Close(_))) => bail!("client closed the connection"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => bail!("client stream ended"),
            };
            return Ok(codec.decode(&raw)?);
        }
    }

    /// Close the connection with a specific close code
    pub async fn close_with(mut self, code: u16, reason: &str) -> Result<()> {
        self.ws
            .send(Message::Close(Some(CloseFrame {
                code: WsCloseCode::from(code),
                reason: reason.to_string().into(),
            })))
            .await?;
        // Drain until the peer acknowledges the close
        while self.ws.next().await.is_some() {}
        Ok(())
    }

    /// Drop the TCP connection without a close frame (transport failure)
    pub fn drop_abruptly(self) {
        drop(self);
    }
}

/// Mock REST endpoint answering `GET /gateway/bot`
pub struct MockRest {
    addr: SocketAddr,
    _task: JoinHandle<()>,
}

impl MockRest {
    /// Serve a fixed bootstrap response on an ephemeral port
    pub async fn serve(gateway_url: String, shards: u32, limit: SessionStartLimit) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let body = json!({
            "url": gateway_url,
            "shards": shards,
            "session_start_limit": {
                "total": limit.total,
                "remaining": limit.remaining,
                "reset_after": limit.reset_after,
                "max_concurrency": limit.max_concurrency,
            }
        })
        .to_string();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let _ = answer_http(stream, &body).await;
                });
            }
        });

        Ok(Self { addr, _task: task })
    }

    /// Base URL for `ClientConfig::api_base_url`
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn answer_http(mut stream: TcpStream, body: &str) -> Result<()> {
    // Read until the end of the request headers
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// A shard session under test, wired to fresh channels
pub struct TestShard {
    pub task: JoinHandle<GatewayResult<()>>,
    pub events: mpsc::Receiver<ShardEvent>,
    pub shutdown: broadcast::Sender<()>,
    pub commands: mpsc::Sender<GatewayMessage>,
}

impl TestShard {
    /// Spawn shard 0 of 1 against `gateway_url`
    #[must_use]
    pub fn spawn(config: ClientConfig, gateway_url: &str, limit: SessionStartLimit) -> Self {
        let limiter = IdentifyLimiter::new(&limit);
        let (events_tx, events) = mpsc::channel(64);
        let (commands, command_rx) = mpsc::channel(64);
        let (shutdown, shutdown_rx) = broadcast::channel(1);

        let session = ShardSession::new(
            0,
            1,
            Arc::new(config),
            gateway_url.to_string(),
            limiter,
            events_tx,
            command_rx,
        );
        let task = tokio::spawn(session.run(shutdown_rx));

        Self {
            task,
            events,
            shutdown,
            commands,
        }
    }

    /// Receive the next dispatched event, bounded by the helper timeout
    pub async fn next_event(&mut self) -> Result<ShardEvent> {
        tokio::time::timeout(RECV_TIMEOUT, self.events.recv())
            .await
            .context("timed out waiting for a dispatched event")?
            .ok_or_else(|| anyhow!("event stream ended"))
    }

    /// Signal shutdown and wait for the session to finish
    pub async fn stop(self) -> Result<GatewayResult<()>> {
        let _ = self.shutdown.send(());
        Ok(tokio::time::timeout(RECV_TIMEOUT, self.task)
            .await
            .context("timed out waiting for the shard to stop")??)
    }
}

/// Client configuration tuned for fast test reconnects
#[must_use]
pub fn test_config(api_base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new("test-token");
    config.api_base_url = api_base_url.to_string();
    config.backoff.base_ms = 50;
    config.backoff.max_ms = 200;
    config.session.hello_timeout_ms = 2_000;
    config.session.max_identify_failures = 3;
    config
}

/// A permissive session start limit for tests that are not about quota
#[must_use]
pub fn open_limit() -> SessionStartLimit {
    SessionStartLimit {
        total: 1000,
        remaining: 1000,
        reset_after: 60_000,
        max_concurrency: 1,
    }
}
