//! Canned payloads for gateway scenarios

use serde_json::{json, Value};

/// A READY body for the given session id
#[must_use]
pub fn ready_body(session_id: &str) -> Value {
    json!({
        "v": 1,
        "user": {"id": "1", "username": "test-bot", "bot": true},
        "guilds": [{"id": "4194304", "unavailable": true}],
        "session_id": session_id,
        "shard": [0, 1]
    })
}

/// A READY body advertising a resume URL
#[must_use]
pub fn ready_body_with_resume_url(session_id: &str, resume_url: &str) -> Value {
    let mut body = ready_body(session_id);
    body["resume_gateway_url"] = json!(resume_url);
    body
}

/// A MESSAGE_CREATE body
#[must_use]
pub fn message_body(id: u64, content: &str) -> Value {
    json!({
        "id": id.to_string(),
        "channel_id": "200",
        "guild_id": "4194304",
        "author": {"id": "1", "username": "someone"},
        "content": content
    })
}

/// A fabricated unique session id
#[must_use]
pub fn fresh_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
