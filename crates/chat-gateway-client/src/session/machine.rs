//! Per-shard session state machine
//!
//! Owns one transport connection at a time and drives it through the
//! lifecycle: connect, await Hello, Identify or Resume, steady-state
//! dispatch, and close classification. The outer loop re-enters with the
//! session retained (resume) or wiped (fresh Identify), under backoff.

use super::{HeartbeatScheduler, Outbound, Session, SessionState};
use crate::backoff::Backoff;
use crate::dispatch::{DispatchRouter, GatewayEventType, ReadyEvent, ShardEvent};
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    CloseCode, Codec, DecodeError, GatewayMessage, HelloPayload, IdentifyPayload,
    IdentifyProperties, OpCode, ReconnectPolicy, ResumePayload,
};
use crate::rest::RestClient;
use crate::shard::{IdentifyLimiter, IdentifyPermit};
use crate::transport::{from_ws_message, to_ws_message, GatewayConnection, WsReader, WsWriter};
use chat_common::ClientConfig;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};

/// Buffer size for the outbound writer channel
const OUTBOUND_BUFFER: usize = 64;

/// How long the writer task gets to flush after the event loop ends
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// What the outer reconnect loop does after a connection ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopAction {
    /// Reconnect and Resume with the retained session
    Resume,
    /// Discard the session; fresh Identify after a mandatory pause
    Reidentify,
    /// Orderly shutdown, no reconnect
    Shutdown,
}

/// Result of one connection attempt
#[derive(Debug, Clone, Copy)]
struct AttemptOutcome {
    action: LoopAction,
    /// Whether the attempt reached steady state at least once
    connected: bool,
}

/// The session state machine for one shard
///
/// Runs as its own unit of concurrency; shares nothing with other shards
/// except the Identify limiter.
pub struct ShardSession {
    shard_id: u32,
    num_shards: u32,
    config: Arc<ClientConfig>,
    rest: RestClient,
    limiter: Arc<IdentifyLimiter>,
    router: DispatchRouter,
    session: Session,
    state: SessionState,
    default_gateway_url: String,
    /// The coordinator's bootstrap is fresh for the first attempt only
    bootstrap_fresh: bool,
    command_rx: mpsc::Receiver<GatewayMessage>,
}

impl ShardSession {
    /// Create the state machine for one shard
    ///
    /// `gateway_url` comes from the coordinator's bootstrap fetch;
    /// `command_rx` carries application commands (presence updates,
    /// member requests) that are forwarded while connected.
    #[must_use]
    pub fn new(
        shard_id: u32,
        num_shards: u32,
        config: Arc<ClientConfig>,
        gateway_url: String,
        limiter: Arc<IdentifyLimiter>,
        events_tx: mpsc::Sender<ShardEvent>,
        command_rx: mpsc::Receiver<GatewayMessage>,
    ) -> Self {
        let router = DispatchRouter::new(shard_id, config.intents, events_tx);
        let rest = RestClient::new(config.api_base_url.clone(), config.token.clone());

        Self {
            shard_id,
            num_shards,
            config,
            rest,
            limiter,
            router,
            session: Session::new(),
            state: SessionState::Closed { reconnect: false },
            default_gateway_url: gateway_url,
            bootstrap_fresh: true,
            command_rx,
        }
    }

    /// Run the session until shutdown or a fatal error
    ///
    /// Reconnects internally with backoff. Returns `Ok(())` on shutdown;
    /// fatal errors (bad credentials, bad shard configuration, exhausted
    /// Identify retries) surface as `Err`.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> GatewayResult<()> {
        let mut backoff = Backoff::new(self.config.backoff.base_ms, self.config.backoff.max_ms);
        let mut identify_failures: u32 = 0;

        loop {
            let fresh_attempt = !self.session.can_resume();

            let outcome = match self.connect_and_run(&mut shutdown_rx).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => {
                    return match e {
                        GatewayError::Shutdown => Ok(()),
                        other => {
                            tracing::error!(
                                shard_id = self.shard_id,
                                error = %other,
                                "Fatal gateway error"
                            );
                            Err(other)
                        }
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        shard_id = self.shard_id,
                        error = %e,
                        "Gateway connection error"
                    );
                    let action = if matches!(e, GatewayError::Decode(_)) {
                        // A corrupt stream cannot be trusted to resume.
                        self.session.invalidate(false);
                        LoopAction::Reidentify
                    } else if self.session.can_resume() {
                        LoopAction::Resume
                    } else {
                        LoopAction::Reidentify
                    };
                    AttemptOutcome {
                        action,
                        connected: false,
                    }
                }
            };

            if outcome.connected {
                backoff.reset();
                identify_failures = 0;
            } else if fresh_attempt {
                identify_failures += 1;
                if identify_failures >= self.config.session.max_identify_failures {
                    return Err(GatewayError::IdentifyExhausted {
                        attempts: identify_failures,
                    });
                }
            }

            let delay = match outcome.action {
                LoopAction::Shutdown => return Ok(()),
                LoopAction::Resume => {
                    self.set_state(SessionState::Closed { reconnect: true });
                    backoff.next_delay()
                }
                LoopAction::Reidentify => {
                    self.session.invalidate(false);
                    self.set_state(SessionState::Closed { reconnect: false });
                    backoff.next_delay().max(reidentify_delay())
                }
            };

            tracing::info!(
                shard_id = self.shard_id,
                delay_ms = delay.as_millis() as u64,
                resume = matches!(outcome.action, LoopAction::Resume),
                "Reconnecting after delay"
            );
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Single connection attempt: connect, handshake, run the event loop
    async fn connect_and_run(
        &mut self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> GatewayResult<AttemptOutcome> {
        self.set_state(SessionState::Connecting);
        let gateway_url = self.resolve_gateway_url().await?;

        let connection = or_shutdown(
            shutdown_rx,
            GatewayConnection::connect(&gateway_url, &self.config.gateway),
        )
        .await??;
        let (ws_writer, mut ws_reader, codec) = connection.into_parts();

        self.set_state(SessionState::AwaitingHello);
        let hello = or_shutdown(shutdown_rx, self.wait_for_hello(&mut ws_reader, &codec)).await??;

        let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER);
        let mut writer_handle = spawn_writer(ws_writer, outbound_rx, codec);

        let (zombie_tx, zombie_rx) = oneshot::channel();
        let heartbeat = HeartbeatScheduler::spawn(
            hello.heartbeat_interval,
            self.session.sequence(),
            outbound_tx.clone(),
            zombie_tx,
        );

        // Identify consumes start-limit quota; Resume does not.
        let identify_permit = if self.session.can_resume() {
            self.set_state(SessionState::Resuming);
            None
        } else {
            let permit = or_shutdown(shutdown_rx, self.limiter.acquire(self.shard_id)).await?;
            self.set_state(SessionState::Identifying);
            Some(permit)
        };

        let auth = self.build_auth();
        let result = if outbound_tx.send(Outbound::Frame(auth)).await.is_err() {
            Ok(self.disconnect_outcome(false))
        } else {
            self.event_loop(
                shutdown_rx,
                &mut ws_reader,
                &codec,
                &outbound_tx,
                &heartbeat,
                zombie_rx,
                identify_permit,
            )
            .await
        };

        heartbeat.stop();
        self.set_state(SessionState::Closing);

        // Drop our sender so the writer sees EOF, then give it a moment
        // to flush before aborting.
        drop(outbound_tx);
        tokio::select! {
            _ = &mut writer_handle => {}
            () = tokio::time::sleep(WRITER_FLUSH_TIMEOUT) => {
                writer_handle.abort();
            }
        }

        result
    }

    /// The URL for the next connection attempt
    ///
    /// Resume attempts prefer the URL the server handed out in READY. A
    /// fresh Identify re-fetches the bootstrap (the quota numbers are not
    /// cacheable) unless the coordinator's fetch is still unused.
    async fn resolve_gateway_url(&mut self) -> GatewayResult<String> {
        if self.session.can_resume() {
            if let Some(url) = self.session.resume_gateway_url() {
                return Ok(url.to_string());
            }
            return Ok(self.default_gateway_url.clone());
        }

        if std::mem::take(&mut self.bootstrap_fresh) {
            return Ok(self.default_gateway_url.clone());
        }

        let bot = self.rest.gateway_bot().await?;
        self.limiter.refresh(&bot.session_start_limit).await;
        self.default_gateway_url = bot.url.clone();
        Ok(bot.url)
    }

    /// Read frames until Hello arrives, bounded by the configured timeout
    async fn wait_for_hello(
        &self,
        ws_reader: &mut WsReader,
        codec: &Codec,
    ) -> GatewayResult<HelloPayload> {
        let hello_timeout = Duration::from_millis(self.config.session.hello_timeout_ms);

        let result = tokio::time::timeout(hello_timeout, async {
            loop {
                let Some(frame) = ws_reader.next().await else {
                    return Err(GatewayError::Transport(tungstenite::Error::ConnectionClosed));
                };
                let frame = frame?;

                if matches!(frame, Message::Close(_)) {
                    return Err(GatewayError::Transport(tungstenite::Error::ConnectionClosed));
                }

                match from_ws_message(codec, &frame) {
                    Some(Ok(message)) if message.op == OpCode::Hello => {
                        return message
                            .as_hello()
                            .ok_or(GatewayError::Decode(DecodeError::MalformedBody(OpCode::Hello)));
                    }
                    Some(Ok(message)) => {
                        tracing::warn!(
                            shard_id = self.shard_id,
                            op = %message.op,
                            "Expected Hello, ignoring other op"
                        );
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {}
                }
            }
        })
        .await;

        result.map_err(|_| GatewayError::HelloTimeout)?
    }

    /// Steady-state loop: read, classify, dispatch
    #[allow(clippy::too_many_arguments)]
    async fn event_loop(
        &mut self,
        shutdown_rx: &mut broadcast::Receiver<()>,
        ws_reader: &mut WsReader,
        codec: &Codec,
        outbound_tx: &mpsc::Sender<Outbound>,
        heartbeat: &HeartbeatScheduler,
        mut zombie_rx: oneshot::Receiver<()>,
        mut identify_permit: Option<IdentifyPermit>,
    ) -> GatewayResult<AttemptOutcome> {
        let mut connected = false;
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    tracing::info!(shard_id = self.shard_id, "Shard received shutdown signal");
                    return Ok(AttemptOutcome { action: LoopAction::Shutdown, connected });
                }

                _ = &mut zombie_rx => {
                    tracing::warn!(shard_id = self.shard_id, "Zombied connection detected");
                    self.session.invalidate(true);
                    return Ok(self.disconnect_outcome(connected));
                }

                command = self.command_rx.recv(), if commands_open => {
                    match command {
                        Some(message) => {
                            if outbound_tx.send(Outbound::Frame(message)).await.is_err() {
                                return Ok(self.disconnect_outcome(connected));
                            }
                        }
                        None => commands_open = false,
                    }
                }

                frame = ws_reader.next() => {
                    match frame {
                        Some(Ok(Message::Close(close_frame))) => {
                            let code = close_frame.as_ref().map_or(1000u16, |f| f.code.into());
                            return self.apply_close_code(code, connected);
                        }
                        Some(Ok(frame)) => {
                            match from_ws_message(codec, &frame) {
                                Some(Ok(message)) => {
                                    if let Some(outcome) = self
                                        .handle_message(
                                            message,
                                            outbound_tx,
                                            heartbeat,
                                            &mut identify_permit,
                                            &mut connected,
                                        )
                                        .await?
                                    {
                                        return Ok(outcome);
                                    }
                                }
                                Some(Err(e)) => {
                                    tracing::error!(
                                        shard_id = self.shard_id,
                                        error = %e,
                                        "Undecodable frame, closing connection"
                                    );
                                    let _ = outbound_tx
                                        .send(Outbound::Close(CloseCode::DecodeError))
                                        .await;
                                    self.session.invalidate(false);
                                    return Err(e.into());
                                }
                                None => {}
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                shard_id = self.shard_id,
                                error = %e,
                                "WebSocket read error"
                            );
                            return Ok(self.disconnect_outcome(connected));
                        }
                        None => {
                            tracing::warn!(shard_id = self.shard_id, "WebSocket stream ended");
                            return Ok(self.disconnect_outcome(connected));
                        }
                    }
                }
            }
        }
    }

    /// Handle one decoded server message
    ///
    /// Returns `Some(outcome)` when the connection attempt is over.
    async fn handle_message(
        &mut self,
        message: GatewayMessage,
        outbound_tx: &mpsc::Sender<Outbound>,
        heartbeat: &HeartbeatScheduler,
        identify_permit: &mut Option<IdentifyPermit>,
        connected: &mut bool,
    ) -> GatewayResult<Option<AttemptOutcome>> {
        match message.op {
            OpCode::Dispatch => {
                if let Some(seq) = message.s {
                    self.session.sequence().observe(seq);
                }
                let name = message.t.unwrap_or_default();
                let data = message.d.unwrap_or(Value::Null);

                if name == GatewayEventType::Ready.as_str() {
                    let ready: ReadyEvent = serde_json::from_value(data.clone())
                        .map_err(|_| DecodeError::MalformedBody(OpCode::Dispatch))?;
                    tracing::info!(
                        shard_id = self.shard_id,
                        session_id = %ready.session_id,
                        "Session established"
                    );
                    self.session
                        .established(ready.session_id.clone(), ready.resume_gateway_url.clone());
                    // The Identify is complete; free the concurrency bucket.
                    identify_permit.take();
                    self.set_state(SessionState::Connected);
                    *connected = true;
                } else if name == GatewayEventType::Resumed.as_str() {
                    tracing::info!(
                        shard_id = self.shard_id,
                        seq = ?self.session.sequence().current(),
                        "Session resumed, replay complete"
                    );
                    self.set_state(SessionState::Connected);
                    *connected = true;
                }

                self.router.route(&name, data).await?;
                Ok(None)
            }
            OpCode::Heartbeat => {
                // Server asked for an immediate beat outside the schedule.
                let beat = GatewayMessage::heartbeat(self.session.sequence().current());
                let _ = outbound_tx.send(Outbound::Frame(beat)).await;
                Ok(None)
            }
            OpCode::HeartbeatAck => {
                heartbeat.ack();
                Ok(None)
            }
            OpCode::Reconnect => {
                tracing::info!(shard_id = self.shard_id, "Server requested reconnect");
                self.session.invalidate(true);
                Ok(Some(self.disconnect_outcome(*connected)))
            }
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                tracing::warn!(shard_id = self.shard_id, resumable, "Server invalidated session");
                self.session.invalidate(resumable);
                let action = if self.session.can_resume() {
                    LoopAction::Resume
                } else {
                    LoopAction::Reidentify
                };
                Ok(Some(AttemptOutcome {
                    action,
                    connected: *connected,
                }))
            }
            OpCode::Hello => {
                tracing::warn!(shard_id = self.shard_id, "Unexpected Hello mid-session");
                Ok(None)
            }
            op => {
                tracing::warn!(shard_id = self.shard_id, op = %op, "Client-only op from server");
                Ok(None)
            }
        }
    }

    /// Classify a received close code into the next action
    fn apply_close_code(
        &mut self,
        code: u16,
        connected: bool,
    ) -> GatewayResult<AttemptOutcome> {
        let known = CloseCode::from_u16(code);
        let policy = known.map_or_else(|| CloseCode::policy_for_raw(code), CloseCode::reconnect_policy);

        tracing::info!(
            shard_id = self.shard_id,
            close_code = code,
            policy = ?policy,
            "Connection closed by server"
        );

        match (policy, known) {
            (ReconnectPolicy::Fatal, Some(close)) => Err(GatewayError::FatalClose(close)),
            (ReconnectPolicy::Resume, _) => {
                self.session.invalidate(true);
                Ok(AttemptOutcome {
                    action: if self.session.can_resume() {
                        LoopAction::Resume
                    } else {
                        LoopAction::Reidentify
                    },
                    connected,
                })
            }
            _ => {
                self.session.invalidate(false);
                Ok(AttemptOutcome {
                    action: LoopAction::Reidentify,
                    connected,
                })
            }
        }
    }

    /// Build the Identify or Resume command for this attempt
    fn build_auth(&self) -> GatewayMessage {
        if self.session.can_resume() {
            let payload = ResumePayload {
                token: self.config.token.clone(),
                session_id: self.session.session_id().unwrap_or("").to_string(),
                seq: self.session.sequence().current().unwrap_or(0),
            };
            GatewayMessage::resume(&payload)
        } else {
            let payload = IdentifyPayload {
                token: self.config.token.clone(),
                properties: Some(IdentifyProperties::current()),
                intents: self.config.intents,
                shard: [self.shard_id, self.num_shards],
                presence: None,
            };
            GatewayMessage::identify(&payload)
        }
    }

    /// Resume if the session identity survives, otherwise fresh Identify
    fn disconnect_outcome(&self, connected: bool) -> AttemptOutcome {
        AttemptOutcome {
            action: if self.session.can_resume() {
                LoopAction::Resume
            } else {
                LoopAction::Reidentify
            },
            connected,
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(
                shard_id = self.shard_id,
                from = %self.state,
                to = %next,
                "Session state transition"
            );
            self.state = next;
        }
    }
}

/// Mandatory pause before a fresh Identify after an invalidation
fn reidentify_delay() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(1_000..=5_000))
}

/// Race a future against the shutdown signal
async fn or_shutdown<T>(
    shutdown_rx: &mut broadcast::Receiver<()>,
    future: impl Future<Output = T>,
) -> GatewayResult<T> {
    tokio::select! {
        biased;
        _ = shutdown_rx.recv() => Err(GatewayError::Shutdown),
        value = future => Ok(value),
    }
}

/// Writer task: encodes queued envelopes onto the socket
fn spawn_writer(
    mut ws_writer: WsWriter,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    codec: Codec,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outbound) = outbound_rx.recv().await {
            match outbound {
                Outbound::Frame(message) => match to_ws_message(&codec, &message) {
                    Ok(frame) => {
                        if ws_writer.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode outbound frame");
                    }
                },
                Outbound::Close(code) => {
                    let frame = CloseFrame {
                        code: WsCloseCode::from(code.as_u16()),
                        reason: code.description().into(),
                    };
                    let _ = ws_writer.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
        let _ = ws_writer.close().await;
    })
}
