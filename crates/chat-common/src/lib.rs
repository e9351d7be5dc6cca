//! # chat-common
//!
//! Shared utilities for the client: configuration loading and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    BackoffConfig, ClientConfig, ConfigError, GatewaySettings, SessionSettings, ShardConfig,
    WireEncoding,
};
pub use telemetry::{init_tracing, try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
