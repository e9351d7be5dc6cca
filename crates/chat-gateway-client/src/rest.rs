//! Gateway bootstrap REST call
//!
//! `GET /gateway/bot` returns the connect URL, the recommended shard
//! count, and the session start limit. The response is intentionally not
//! cached: it is re-fetched before each fresh Identify burst because the
//! quota numbers go stale quickly.

use crate::error::GatewayResult;
use crate::shard::SessionStartLimit;
use serde::Deserialize;

/// Response of `GET /gateway/bot`
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayBot {
    /// WebSocket URL to connect to
    pub url: String,
    /// Recommended shard count
    pub shards: u32,
    /// Identify quota for this application
    pub session_start_limit: SessionStartLimit,
}

/// Minimal REST client for gateway bootstrap
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_base_url: String,
    token: String,
}

impl RestClient {
    /// Create a client for the given API base URL and token
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: api_base_url.into(),
            token: token.into(),
        }
    }

    /// Fetch the gateway connect information and Identify quota
    pub async fn gateway_bot(&self) -> GatewayResult<GatewayBot> {
        let url = format!("{}/gateway/bot", self.api_base_url.trim_end_matches('/'));

        let bot: GatewayBot = self
            .http
            .get(&url)
            .header("Authorization", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(
            url = %bot.url,
            shards = bot.shards,
            remaining = bot.session_start_limit.remaining,
            max_concurrency = bot.session_start_limit.max_concurrency,
            "Gateway bootstrap fetched"
        );

        Ok(bot)
    }
}
