//! Typed dispatch events
//!
//! Partial, client-facing views of the event bodies, plus the tagged
//! union the router hands to subscribers. Fields the client does not
//! consume stay out of these views; the full REST shapes are owned by the
//! server side of the protocol.

use super::GatewayEventType;
use chat_core::Snowflake;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// READY event payload
///
/// Sent after successful Identify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    pub v: i32,

    /// Current user
    pub user: UserPayload,

    /// Guilds this shard owns (initially unavailable)
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,

    /// Session ID for resuming
    pub session_id: String,

    /// Gateway URL to prefer for resuming (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,

    /// Shard tuple echoed back by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
}

/// Unavailable guild stub in READY
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// User data included in events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// GUILD_CREATE / GUILD_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildEvent {
    pub id: Snowflake,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<i32>,
}

/// GUILD_DELETE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildDeleteEvent {
    pub id: Snowflake,
    /// True when the guild is merely unavailable (outage) rather than left
    #[serde(default)]
    pub unavailable: bool,
}

/// CHANNEL_CREATE / CHANNEL_UPDATE / CHANNEL_DELETE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// MESSAGE_CREATE / MESSAGE_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// MESSAGE_DELETE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_DELETE_BULK event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteBulkEvent {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// Emoji object, passed through untyped
    #[serde(default)]
    pub emoji: Value,
}

/// GUILD_MEMBER_ADD / GUILD_MEMBER_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

/// GUILD_MEMBER_REMOVE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
}

/// PRESENCE_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdateEvent {
    pub user_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// online, idle, dnd, or offline
    pub status: String,
}

/// TYPING_START event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingStartEvent {
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub timestamp: i64,
}

/// VOICE_STATE_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// None when the user left voice
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
}

/// VOICE_SERVER_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServerUpdateEvent {
    pub token: String,
    pub guild_id: Snowflake,
    /// None while the server is reallocating
    pub endpoint: Option<String>,
}

/// INTERACTION_CREATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionCreateEvent {
    pub id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// Interaction data, passed through untyped
    #[serde(default)]
    pub data: Value,
}

/// A dispatch event delivered to subscribers
///
/// One variant per known event name; names outside the vocabulary travel
/// as [`GatewayEvent::Unknown`] so new server events never break clients.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    Resumed,
    GuildCreate(GuildEvent),
    GuildUpdate(GuildEvent),
    GuildDelete(GuildDeleteEvent),
    ChannelCreate(ChannelEvent),
    ChannelUpdate(ChannelEvent),
    ChannelDelete(ChannelEvent),
    MessageCreate(MessageEvent),
    MessageUpdate(MessageEvent),
    MessageDelete(MessageDeleteEvent),
    MessageDeleteBulk(MessageDeleteBulkEvent),
    MessageReactionAdd(ReactionEvent),
    MessageReactionRemove(ReactionEvent),
    GuildMemberAdd(MemberEvent),
    GuildMemberUpdate(MemberEvent),
    GuildMemberRemove(MemberRemoveEvent),
    PresenceUpdate(PresenceUpdateEvent),
    TypingStart(TypingStartEvent),
    VoiceStateUpdate(VoiceStateEvent),
    VoiceServerUpdate(VoiceServerUpdateEvent),
    InteractionCreate(InteractionCreateEvent),
    UserUpdate(UserPayload),
    /// Event name outside the known vocabulary, forwarded opaquely
    Unknown { name: String, data: Value },
}

impl GatewayEvent {
    /// Decode an event body by its wire name
    ///
    /// Unknown names succeed as [`GatewayEvent::Unknown`]; a known name
    /// with an undecodable body is an error the caller can degrade.
    pub fn parse(name: &str, data: Value) -> Result<Self, serde_json::Error> {
        let Some(event_type) = GatewayEventType::from_str(name) else {
            return Ok(Self::Unknown {
                name: name.to_string(),
                data,
            });
        };

        Ok(match event_type {
            GatewayEventType::Ready => Self::Ready(serde_json::from_value(data)?),
            GatewayEventType::Resumed => Self::Resumed,
            GatewayEventType::GuildCreate => Self::GuildCreate(serde_json::from_value(data)?),
            GatewayEventType::GuildUpdate => Self::GuildUpdate(serde_json::from_value(data)?),
            GatewayEventType::GuildDelete => Self::GuildDelete(serde_json::from_value(data)?),
            GatewayEventType::ChannelCreate => Self::ChannelCreate(serde_json::from_value(data)?),
            GatewayEventType::ChannelUpdate => Self::ChannelUpdate(serde_json::from_value(data)?),
            GatewayEventType::ChannelDelete => Self::ChannelDelete(serde_json::from_value(data)?),
            GatewayEventType::MessageCreate => Self::MessageCreate(serde_json::from_value(data)?),
            GatewayEventType::MessageUpdate => Self::MessageUpdate(serde_json::from_value(data)?),
            GatewayEventType::MessageDelete => Self::MessageDelete(serde_json::from_value(data)?),
            GatewayEventType::MessageDeleteBulk => {
                Self::MessageDeleteBulk(serde_json::from_value(data)?)
            }
            GatewayEventType::MessageReactionAdd => {
                Self::MessageReactionAdd(serde_json::from_value(data)?)
            }
            GatewayEventType::MessageReactionRemove => {
                Self::MessageReactionRemove(serde_json::from_value(data)?)
            }
            GatewayEventType::GuildMemberAdd => Self::GuildMemberAdd(serde_json::from_value(data)?),
            GatewayEventType::GuildMemberUpdate => {
                Self::GuildMemberUpdate(serde_json::from_value(data)?)
            }
            GatewayEventType::GuildMemberRemove => {
                Self::GuildMemberRemove(serde_json::from_value(data)?)
            }
            GatewayEventType::PresenceUpdate => Self::PresenceUpdate(serde_json::from_value(data)?),
            GatewayEventType::TypingStart => Self::TypingStart(serde_json::from_value(data)?),
            GatewayEventType::VoiceStateUpdate => {
                Self::VoiceStateUpdate(serde_json::from_value(data)?)
            }
            GatewayEventType::VoiceServerUpdate => {
                Self::VoiceServerUpdate(serde_json::from_value(data)?)
            }
            GatewayEventType::InteractionCreate => {
                Self::InteractionCreate(serde_json::from_value(data)?)
            }
            GatewayEventType::UserUpdate => Self::UserUpdate(serde_json::from_value(data)?),
        })
    }

    /// The event type, or None for unknown events
    #[must_use]
    pub fn event_type(&self) -> Option<GatewayEventType> {
        Some(match self {
            Self::Ready(_) => GatewayEventType::Ready,
            Self::Resumed => GatewayEventType::Resumed,
            Self::GuildCreate(_) => GatewayEventType::GuildCreate,
            Self::GuildUpdate(_) => GatewayEventType::GuildUpdate,
            Self::GuildDelete(_) => GatewayEventType::GuildDelete,
            Self::ChannelCreate(_) => GatewayEventType::ChannelCreate,
            Self::ChannelUpdate(_) => GatewayEventType::ChannelUpdate,
            Self::ChannelDelete(_) => GatewayEventType::ChannelDelete,
            Self::MessageCreate(_) => GatewayEventType::MessageCreate,
            Self::MessageUpdate(_) => GatewayEventType::MessageUpdate,
            Self::MessageDelete(_) => GatewayEventType::MessageDelete,
            Self::MessageDeleteBulk(_) => GatewayEventType::MessageDeleteBulk,
            Self::MessageReactionAdd(_) => GatewayEventType::MessageReactionAdd,
            Self::MessageReactionRemove(_) => GatewayEventType::MessageReactionRemove,
            Self::GuildMemberAdd(_) => GatewayEventType::GuildMemberAdd,
            Self::GuildMemberUpdate(_) => GatewayEventType::GuildMemberUpdate,
            Self::GuildMemberRemove(_) => GatewayEventType::GuildMemberRemove,
            Self::PresenceUpdate(_) => GatewayEventType::PresenceUpdate,
            Self::TypingStart(_) => GatewayEventType::TypingStart,
            Self::VoiceStateUpdate(_) => GatewayEventType::VoiceStateUpdate,
            Self::VoiceServerUpdate(_) => GatewayEventType::VoiceServerUpdate,
            Self::InteractionCreate(_) => GatewayEventType::InteractionCreate,
            Self::UserUpdate(_) => GatewayEventType::UserUpdate,
            Self::Unknown { .. } => return None,
        })
    }

    /// The wire name of this event
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unknown { name, .. } => name,
            _ => self.event_type().map_or("", GatewayEventType::as_str),
        }
    }

    /// The guild this event belongs to, for cross-shard routing
    #[must_use]
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::GuildCreate(e) | Self::GuildUpdate(e) => Some(e.id),
            Self::GuildDelete(e) => Some(e.id),
            Self::ChannelCreate(e) | Self::ChannelUpdate(e) | Self::ChannelDelete(e) => e.guild_id,
            Self::MessageCreate(e) | Self::MessageUpdate(e) => e.guild_id,
            Self::MessageDelete(e) => e.guild_id,
            Self::MessageDeleteBulk(e) => e.guild_id,
            Self::MessageReactionAdd(e) | Self::MessageReactionRemove(e) => e.guild_id,
            Self::GuildMemberAdd(e) | Self::GuildMemberUpdate(e) => Some(e.guild_id),
            Self::GuildMemberRemove(e) => Some(e.guild_id),
            Self::PresenceUpdate(e) => e.guild_id,
            Self::TypingStart(e) => e.guild_id,
            Self::VoiceStateUpdate(e) => e.guild_id,
            Self::VoiceServerUpdate(e) => Some(e.guild_id),
            Self::InteractionCreate(e) => e.guild_id,
            Self::Unknown { data, .. } => data
                .get("guild_id")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            Self::Ready(_) | Self::Resumed | Self::UserUpdate(_) => None,
        }
    }
}
