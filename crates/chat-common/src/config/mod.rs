//! Configuration structs

mod client_config;

pub use client_config::{
    BackoffConfig, ClientConfig, ConfigError, GatewaySettings, SessionSettings, ShardConfig,
    WireEncoding,
};
