//! Shard coordination
//!
//! Bootstraps the gateway, spawns one session per shard, and routes
//! application commands to the shard that owns a guild. Shards share
//! nothing but the Identify limiter; each one reconnects and resumes on
//! its own.

use super::IdentifyLimiter;
use crate::dispatch::ShardEvent;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{GatewayMessage, PresenceUpdatePayload, RequestGuildMembersPayload};
use crate::rest::RestClient;
use crate::session::ShardSession;
use chat_common::ClientConfig;
use chat_core::Snowflake;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Buffer for the shared event stream delivered to the application
const EVENTS_BUFFER: usize = 256;

/// Buffer for per-shard command queues
const COMMAND_BUFFER: usize = 64;

/// Handle to one running shard session
struct ShardHandle {
    command_tx: mpsc::Sender<GatewayMessage>,
    task: JoinHandle<GatewayResult<()>>,
}

/// Owns every shard session of one gateway client
///
/// Created by [`ShardCoordinator::start`], which performs the bootstrap
/// REST call and spawns `num_shards` independent sessions. Dispatch
/// events from all shards arrive on the single receiver returned
/// alongside the coordinator.
pub struct ShardCoordinator {
    num_shards: u32,
    limiter: Arc<IdentifyLimiter>,
    shards: DashMap<u32, ShardHandle>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ShardCoordinator {
    /// Bootstrap the gateway and spawn all shard sessions
    ///
    /// The shard count comes from the configuration override when set,
    /// otherwise from the server recommendation. The session start limit
    /// from the same response seeds the shared Identify limiter.
    pub async fn start(
        config: ClientConfig,
    ) -> GatewayResult<(Self, mpsc::Receiver<ShardEvent>)> {
        if config.token.is_empty() {
            return Err(GatewayError::Config("token must not be empty".to_string()));
        }

        let config = Arc::new(config);
        let rest = RestClient::new(config.api_base_url.clone(), config.token.clone());
        let bot = rest.gateway_bot().await?;

        let num_shards = config.shards.count.unwrap_or(bot.shards).max(1);
        let limiter = IdentifyLimiter::new(&bot.session_start_limit);

        tracing::info!(
            num_shards,
            recommended = bot.shards,
            max_concurrency = bot.session_start_limit.max_concurrency,
            "Starting shard sessions"
        );

        let (events_tx, events_rx) = mpsc::channel(EVENTS_BUFFER);
        let (shutdown_tx, _) = broadcast::channel(1);
        let shards = DashMap::new();

        for shard_id in 0..num_shards {
            let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
            let session = ShardSession::new(
                shard_id,
                num_shards,
                Arc::clone(&config),
                bot.url.clone(),
                Arc::clone(&limiter),
                events_tx.clone(),
                command_rx,
            );
            let task = tokio::spawn(session.run(shutdown_tx.subscribe()));

            shards.insert(shard_id, ShardHandle { command_tx, task });
        }

        Ok((
            Self {
                num_shards,
                limiter,
                shards,
                shutdown_tx,
            },
            events_rx,
        ))
    }

    /// Number of shards this coordinator runs
    #[must_use]
    pub fn num_shards(&self) -> u32 {
        self.num_shards
    }

    /// The shared Identify limiter
    #[must_use]
    pub fn limiter(&self) -> Arc<IdentifyLimiter> {
        Arc::clone(&self.limiter)
    }

    /// The shard that owns a guild
    ///
    /// Guild snowflakes carry their creation timestamp in the high bits;
    /// shifting it out leaves a stable value that distributes evenly.
    #[must_use]
    pub fn shard_id(guild_id: Snowflake, num_shards: u32) -> u32 {
        ((guild_id.as_u64() >> 22) % u64::from(num_shards.max(1))) as u32
    }

    /// The shard of this coordinator that owns a guild
    #[must_use]
    pub fn shard_for_guild(&self, guild_id: Snowflake) -> u32 {
        Self::shard_id(guild_id, self.num_shards)
    }

    /// Queue a raw command on a specific shard
    ///
    /// Commands are forwarded once the shard is connected; they queue
    /// across reconnects up to the buffer size.
    pub async fn send_command(&self, shard_id: u32, command: GatewayMessage) -> GatewayResult<()> {
        let handle = self
            .shards
            .get(&shard_id)
            .ok_or_else(|| GatewayError::Config(format!("no such shard: {shard_id}")))?;

        handle
            .command_tx
            .send(command)
            .await
            .map_err(|_| GatewayError::Config(format!("shard {shard_id} is not running")))
    }

    /// Update presence on every shard
    pub async fn update_presence(&self, payload: &PresenceUpdatePayload) -> GatewayResult<()> {
        for shard_id in 0..self.num_shards {
            self.send_command(shard_id, GatewayMessage::presence_update(payload))
                .await?;
        }
        Ok(())
    }

    /// Request member chunks from the shard that owns the guild
    pub async fn request_guild_members(
        &self,
        payload: &RequestGuildMembersPayload,
    ) -> GatewayResult<()> {
        let shard_id = self.shard_for_guild(payload.guild_id);
        self.send_command(shard_id, GatewayMessage::request_guild_members(payload))
            .await
    }

    /// Signal every shard to shut down
    ///
    /// Each shard tears down its own transport and heartbeat; none of
    /// them affects the others.
    pub fn shutdown(&self) {
        tracing::info!(num_shards = self.num_shards, "Shutting down all shards");
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for every shard to finish, surfacing the first fatal error
    pub async fn join(self) -> GatewayResult<()> {
        let mut first_error = None;

        for (shard_id, handle) in self.shards.into_iter() {
            match handle.task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(shard_id, error = %e, "Shard ended with error");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(shard_id, error = %e, "Shard task failed");
                    first_error
                        .get_or_insert_with(|| GatewayError::Config(format!("shard task failed: {e}")));
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
