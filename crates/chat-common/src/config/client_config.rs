//! Client configuration structs
//!
//! Loads configuration from environment variables with serde-friendly
//! sections so embedders can also deserialize from a file.

use chat_core::Intents;
use serde::Deserialize;
use std::env;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Authentication token sent in Identify and Resume
    pub token: String,
    /// Base URL of the REST API (for the gateway bootstrap call)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Intents bitmask negotiated at Identify time
    #[serde(default)]
    pub intents: Intents,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub shards: ShardConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub session: SessionSettings,
}

/// Wire encoding negotiated via the connect URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireEncoding {
    /// Self-describing text frames
    #[default]
    Json,
    /// Compact binary frames
    Binary,
}

impl WireEncoding {
    /// Value of the `encoding` query parameter
    #[must_use]
    pub const fn as_query_value(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "bin",
        }
    }
}

/// Connection-level gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Gateway protocol version (the `v` query parameter)
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u8,
    /// Wire encoding (the `encoding` query parameter)
    #[serde(default)]
    pub encoding: WireEncoding,
    /// Request transport compression (the `compress` query parameter)
    #[serde(default)]
    pub compress: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            encoding: WireEncoding::default(),
            compress: false,
        }
    }
}

/// Shard count configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShardConfig {
    /// Fixed shard count; None uses the server-recommended count
    #[serde(default)]
    pub count: Option<u32>,
}

/// Reconnect backoff bounds
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_backoff_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_backoff_base_ms(),
            max_ms: default_backoff_max_ms(),
        }
    }
}

/// Session lifecycle bounds
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// How long to wait for Hello after the transport handshake
    #[serde(default = "default_hello_timeout_ms")]
    pub hello_timeout_ms: u64,
    /// Consecutive fresh-Identify failures tolerated before surfacing an error
    #[serde(default = "default_max_identify_failures")]
    pub max_identify_failures: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            hello_timeout_ms: default_hello_timeout_ms(),
            max_identify_failures: default_max_identify_failures(),
        }
    }
}

// Default value functions
fn default_api_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_protocol_version() -> u8 {
    1
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_hello_timeout_ms() -> u64 {
    20_000
}

fn default_max_identify_failures() -> u32 {
    5
}

impl ClientConfig {
    /// Build a configuration from a token with defaults everywhere else
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base_url: default_api_base_url(),
            intents: Intents::default(),
            gateway: GatewaySettings::default(),
            shards: ShardConfig::default(),
            backoff: BackoffConfig::default(),
            session: SessionSettings::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or
    /// unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            token: env::var("CHAT_TOKEN").map_err(|_| ConfigError::MissingVar("CHAT_TOKEN"))?,
            api_base_url: env::var("CHAT_API_URL").unwrap_or_else(|_| default_api_base_url()),
            intents: match env::var("CHAT_INTENTS") {
                Ok(s) => Intents::from_u32(
                    s.parse().map_err(|_| ConfigError::InvalidVar("CHAT_INTENTS"))?,
                ),
                Err(_) => Intents::default(),
            },
            gateway: GatewaySettings {
                protocol_version: parse_or_default(
                    "CHAT_GATEWAY_VERSION",
                    default_protocol_version(),
                )?,
                encoding: match env::var("CHAT_GATEWAY_ENCODING").ok().as_deref() {
                    None | Some("json") => WireEncoding::Json,
                    Some("bin" | "binary") => WireEncoding::Binary,
                    Some(_) => return Err(ConfigError::InvalidVar("CHAT_GATEWAY_ENCODING")),
                },
                compress: env::var("CHAT_GATEWAY_COMPRESS")
                    .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
            },
            shards: ShardConfig {
                count: match env::var("CHAT_SHARD_COUNT") {
                    Ok(s) => Some(s.parse().map_err(|_| ConfigError::InvalidVar("CHAT_SHARD_COUNT"))?),
                    Err(_) => None,
                },
            },
            backoff: BackoffConfig {
                base_ms: parse_or_default("CHAT_BACKOFF_BASE_MS", default_backoff_base_ms())?,
                max_ms: parse_or_default("CHAT_BACKOFF_MAX_MS", default_backoff_max_ms())?,
            },
            session: SessionSettings {
                hello_timeout_ms: parse_or_default(
                    "CHAT_HELLO_TIMEOUT_MS",
                    default_hello_timeout_ms(),
                )?,
                max_identify_failures: parse_or_default(
                    "CHAT_MAX_IDENTIFY_FAILURES",
                    default_max_identify_failures(),
                )?,
            },
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(s) => s.parse().map_err(|_| ConfigError::InvalidVar(var)),
        Err(_) => Ok(default),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable: {0}")]
    InvalidVar(&'static str),
}
