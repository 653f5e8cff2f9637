//! Typed payload definitions
//!
//! Structures for the protocol-level payloads the session interprets.
//! Dispatch payloads destined for consumers stay as raw JSON; only what
//! the state machine itself reads is typed.

use accord_core::{GuildMember, PrivateChannel, Snowflake, User};
use serde::Deserialize;
use serde_json::Value;

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,

    /// Connected gateway server trace
    #[serde(rename = "_trace", default)]
    pub trace: Option<Value>,
}

/// Payload for the READY dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyPayload {
    /// Gateway protocol version
    #[serde(default)]
    pub v: Option<u8>,

    /// The logged-in user
    pub user: User,

    /// Session ID permitting RESUME
    pub session_id: String,

    #[serde(default)]
    pub private_channels: Vec<PrivateChannel>,

    /// Guild stubs; each is replayed through the GUILD_CREATE handler
    #[serde(default)]
    pub guilds: Vec<Value>,

    #[serde(rename = "_trace", default)]
    pub trace: Option<Value>,
}

/// Payload for the GUILD_MEMBERS_CHUNK dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMembersChunk {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<GuildMember>,
}

/// Payload for the VOICE_SERVER_UPDATE dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceServerUpdatePayload {
    pub guild_id: Snowflake,
    pub token: String,
    /// May be null while the voice server is allocating
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_payload() {
        let json = r#"{"heartbeat_interval":41250,"_trace":["gateway-prd-main-1"]}"#;
        let hello: HelloPayload = serde_json::from_str(json).unwrap();
        assert_eq!(hello.heartbeat_interval, 41250);
        assert!(hello.trace.is_some());
    }

    #[test]
    fn test_ready_payload() {
        let json = serde_json::json!({
            "v": 6,
            "user": {"id": "1", "username": "bot", "discriminator": "0000", "bot": true},
            "session_id": "sess-abc",
            "private_channels": [
                {"id": "300", "type": 1,
                 "recipients": [{"id": "42", "username": "alice", "discriminator": "0001"}]}
            ],
            "guilds": [{"id": "100", "unavailable": true}],
            "_trace": ["gateway-prd-main-1"]
        });
        let ready: ReadyPayload = serde_json::from_value(json).unwrap();
        assert_eq!(ready.session_id, "sess-abc");
        assert_eq!(ready.user.username, "bot");
        assert_eq!(ready.private_channels.len(), 1);
        assert_eq!(ready.guilds.len(), 1);
    }

    #[test]
    fn test_guild_members_chunk_payload() {
        let json = serde_json::json!({
            "guild_id": "100",
            "members": [
                {"user": {"id": "1", "username": "a", "discriminator": "0001"}},
                {"user": {"id": "2", "username": "b", "discriminator": "0002"}}
            ]
        });
        let chunk: GuildMembersChunk = serde_json::from_value(json).unwrap();
        assert_eq!(chunk.guild_id, Snowflake::new(100));
        assert_eq!(chunk.members.len(), 2);
    }

    #[test]
    fn test_voice_server_update_payload() {
        let json = serde_json::json!({
            "guild_id": "100",
            "token": "voice-tok",
            "endpoint": "smart.loyal.discord.gg:80"
        });
        let update: VoiceServerUpdatePayload = serde_json::from_value(json).unwrap();
        assert_eq!(update.token, "voice-tok");
        assert_eq!(update.endpoint.as_deref(), Some("smart.loyal.discord.gg:80"));

        let json = serde_json::json!({"guild_id": "100", "token": "t", "endpoint": null});
        let update: VoiceServerUpdatePayload = serde_json::from_value(json).unwrap();
        assert!(update.endpoint.is_none());
    }
}
