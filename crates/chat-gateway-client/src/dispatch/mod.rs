//! Dispatch events and routing
//!
//! Turns `{t, d}` pairs from the wire into typed events and delivers them
//! to the embedding application.

mod event_types;
mod events;
mod router;

pub use event_types::GatewayEventType;
pub use events::{
    ChannelEvent, GatewayEvent, GuildDeleteEvent, GuildEvent, InteractionCreateEvent,
    MemberEvent, MemberRemoveEvent, MessageDeleteBulkEvent, MessageDeleteEvent, MessageEvent,
    PresenceUpdateEvent, ReactionEvent, ReadyEvent, TypingStartEvent, UnavailableGuild,
    UserPayload, VoiceServerUpdateEvent, VoiceStateEvent,
};
pub use router::{DispatchRouter, ShardEvent, SubscriberClosed};
