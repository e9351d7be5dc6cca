//! Gateway intents bitmask
//!
//! Each bit gates a named group of dispatch events. The mask is composed
//! once at Identify time and is immutable for the life of the session;
//! the server never delivers events from groups the client omitted.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Gateway intent flags
    ///
    /// Sent as a plain integer in the Identify payload (32-bit, safe in JSON).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        /// Guild lifecycle and channel events
        const GUILDS                  = 1 << 0;
        /// Member join/update/leave events
        const GUILD_MEMBERS           = 1 << 1;
        /// Messages in guild channels
        const GUILD_MESSAGES          = 1 << 2;
        /// Reactions on guild messages
        const GUILD_MESSAGE_REACTIONS = 1 << 3;
        /// Presence (online status) updates
        const GUILD_PRESENCES         = 1 << 4;
        /// Voice state and voice server events
        const GUILD_VOICE_STATES      = 1 << 5;
        /// Typing indicators
        const GUILD_TYPING            = 1 << 6;
        /// Direct messages
        const DIRECT_MESSAGES         = 1 << 7;

        /// Default set for a typical bot: everything except presences
        const DEFAULT = Self::GUILDS.bits()
            | Self::GUILD_MEMBERS.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::GUILD_MESSAGE_REACTIONS.bits()
            | Self::GUILD_VOICE_STATES.bits()
            | Self::GUILD_TYPING.bits()
            | Self::DIRECT_MESSAGES.bits();
    }
}

impl Intents {
    /// Check whether the mask contains a required intent group
    #[inline]
    pub fn has(&self, intent: Intents) -> bool {
        self.contains(intent)
    }

    /// Get the raw bits for the Identify payload
    #[inline]
    pub const fn to_u32(self) -> u32 {
        self.bits()
    }

    /// Create from raw bits, discarding unknown bits
    #[inline]
    pub const fn from_u32(bits: u32) -> Self {
        Intents::from_bits_truncate(bits)
    }
}

impl Default for Intents {
    fn default() -> Self {
        Intents::DEFAULT
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(Intents::from_bits_truncate(bits))
    }
}
