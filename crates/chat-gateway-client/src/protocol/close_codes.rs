//! WebSocket close codes
//!
//! Defines gateway-specific close codes and the reconnect decision the
//! client derives from them.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
///
/// These codes arrive when the server (or the client itself) closes a
/// connection, and they decide what the client does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Invalid opcode sent
    UnknownOpcode = 4001,
    /// Invalid payload encoding
    DecodeError = 4002,
    /// Sent payload before Identify
    NotAuthenticated = 4003,
    /// Invalid token provided
    AuthenticationFailed = 4004,
    /// Sent Identify twice
    AlreadyAuthenticated = 4005,
    /// Invalid sequence number for Resume
    InvalidSequence = 4007,
    /// Too many requests (rate limited)
    RateLimited = 4008,
    /// Session has timed out
    SessionTimeout = 4009,
    /// Invalid shard configuration
    InvalidShard = 4010,
    /// Sharding is required
    ShardingRequired = 4011,
    /// Invalid/outdated API version
    InvalidApiVersion = 4012,
    /// Invalid intents bitmask
    InvalidIntents = 4013,
    /// Intents the token is not approved for
    DisallowedIntents = 4014,
}

/// What the client does after a connection closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Reconnect and attempt Resume, retaining session id and sequence
    Resume,
    /// Discard the session and send a fresh Identify after a short delay
    Reidentify,
    /// Configuration/credential error; surface to the application, no retry
    Fatal,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimeout),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// The reconnect decision for this close code
    #[must_use]
    pub const fn reconnect_policy(self) -> ReconnectPolicy {
        match self {
            Self::UnknownError
            | Self::UnknownOpcode
            | Self::DecodeError
            | Self::NotAuthenticated
            | Self::AlreadyAuthenticated
            | Self::RateLimited
            | Self::SessionTimeout => ReconnectPolicy::Resume,
            Self::InvalidSequence => ReconnectPolicy::Reidentify,
            Self::AuthenticationFailed
            | Self::InvalidShard
            | Self::ShardingRequired
            | Self::InvalidApiVersion
            | Self::InvalidIntents
            | Self::DisallowedIntents => ReconnectPolicy::Fatal,
        }
    }

    /// Classify a raw close code, including values outside the known set
    ///
    /// Unknown 4xxx codes are treated as generic server errors (resume);
    /// anything else, including clean closes, discards the session.
    #[must_use]
    pub fn policy_for_raw(code: u16) -> ReconnectPolicy {
        match Self::from_u16(code) {
            Some(known) => known.reconnect_policy(),
            None if (4000..5000).contains(&code) => ReconnectPolicy::Resume,
            None => ReconnectPolicy::Reidentify,
        }
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload encoding",
            Self::NotAuthenticated => "Not authenticated",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Already authenticated",
            Self::InvalidSequence => "Invalid sequence number",
            Self::RateLimited => "Rate limited",
            Self::SessionTimeout => "Session timeout",
            Self::InvalidShard => "Invalid shard configuration",
            Self::ShardingRequired => "Sharding required",
            Self::InvalidApiVersion => "Invalid API version",
            Self::InvalidIntents => "Invalid intents",
            Self::DisallowedIntents => "Disallowed intents",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::UnknownOpcode => "UnknownOpcode",
            Self::DecodeError => "DecodeError",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::AlreadyAuthenticated => "AlreadyAuthenticated",
            Self::InvalidSequence => "InvalidSequence",
            Self::RateLimited => "RateLimited",
            Self::SessionTimeout => "SessionTimeout",
            Self::InvalidShard => "InvalidShard",
            Self::ShardingRequired => "ShardingRequired",
            Self::InvalidApiVersion => "InvalidApiVersion",
            Self::InvalidIntents => "InvalidIntents",
            Self::DisallowedIntents => "DisallowedIntents",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(4000), Some(CloseCode::UnknownError));
        assert_eq!(CloseCode::from_u16(4004), Some(CloseCode::AuthenticationFailed));
        assert_eq!(CloseCode::from_u16(4014), Some(CloseCode::DisallowedIntents));
        assert_eq!(CloseCode::from_u16(1000), None);
        assert_eq!(CloseCode::from_u16(4006), None); // 4006 is not defined
    }

    #[test]
    fn test_resumable_codes() {
        assert_eq!(CloseCode::UnknownError.reconnect_policy(), ReconnectPolicy::Resume);
        assert_eq!(CloseCode::UnknownOpcode.reconnect_policy(), ReconnectPolicy::Resume);
        assert_eq!(CloseCode::DecodeError.reconnect_policy(), ReconnectPolicy::Resume);
        assert_eq!(CloseCode::RateLimited.reconnect_policy(), ReconnectPolicy::Resume);
        assert_eq!(CloseCode::SessionTimeout.reconnect_policy(), ReconnectPolicy::Resume);
    }

    #[test]
    fn test_reidentify_codes() {
        assert_eq!(
            CloseCode::InvalidSequence.reconnect_policy(),
            ReconnectPolicy::Reidentify
        );
    }

    #[test]
    fn test_fatal_codes() {
        for code in [
            CloseCode::AuthenticationFailed,
            CloseCode::InvalidShard,
            CloseCode::ShardingRequired,
            CloseCode::InvalidApiVersion,
            CloseCode::InvalidIntents,
            CloseCode::DisallowedIntents,
        ] {
            assert_eq!(code.reconnect_policy(), ReconnectPolicy::Fatal);
        }
    }

    #[test]
    fn test_policy_for_raw() {
        // Known codes use their table entry
        assert_eq!(CloseCode::policy_for_raw(4004), ReconnectPolicy::Fatal);
        // Unknown 4xxx codes are generic server errors
        assert_eq!(CloseCode::policy_for_raw(4999), ReconnectPolicy::Resume);
        // Clean closes discard the session
        assert_eq!(CloseCode::policy_for_raw(1000), ReconnectPolicy::Reidentify);
        assert_eq!(CloseCode::policy_for_raw(1001), ReconnectPolicy::Reidentify);
    }

    #[test]
    fn test_close_code_display() {
        let code = CloseCode::AuthenticationFailed;
        let display = format!("{code}");
        assert!(display.contains("4004"));
        assert!(display.contains("Authentication"));
    }
}
