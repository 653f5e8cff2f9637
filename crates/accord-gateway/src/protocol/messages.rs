//! Gateway packet envelope
//!
//! All frames exchanged with the gateway follow the `op/t/s/d` format.

use super::OpCode;
use accord_core::Snowflake;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::rest::USER_AGENT;

/// Gateway packet
///
/// The opcode is kept as a raw integer so that frames carrying unknown
/// opcodes still decode; the session ignores them instead of treating
/// them as protocol errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPacket {
    /// Operation code
    pub op: u8,

    /// Event name (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub s: Option<u64>,

    /// Payload
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub d: Option<Value>,
}

impl GatewayPacket {
    /// Decode the opcode, if it is one we know
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    /// The dispatch event name, for op=0 frames
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.t.as_deref()
    }

    fn command(op: OpCode, d: Value) -> Self {
        Self {
            op: op.as_u8(),
            t: None,
            s: None,
            d: Some(d),
        }
    }

    /// Create a Heartbeat packet (op=1) carrying the last seen sequence
    #[must_use]
    pub fn heartbeat(seq: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat.as_u8(),
            t: None,
            s: None,
            d: seq.map(Value::from),
        }
    }

    /// Create an Identify packet (op=2)
    ///
    /// The shard field is included only when both coordinates are
    /// configured. Inbound zlib compression is always requested.
    #[must_use]
    pub fn identify(token: &str, shard: Option<(u16, u16)>) -> Self {
        let mut d = json!({
            "token": token,
            "properties": {
                "$os": std::env::consts::OS,
                "$browser": USER_AGENT,
                "$device": USER_AGENT,
                "$referrer": "",
                "$referring_domain": "",
            },
            "compress": true,
        });
        if let Some((id, count)) = shard {
            d["shard"] = json!([id, count]);
        }
        Self::command(OpCode::Identify, d)
    }

    /// Create a Resume packet (op=6)
    #[must_use]
    pub fn resume(token: &str, session_id: &str, seq: u64) -> Self {
        Self::command(
            OpCode::Resume,
            json!({
                "token": token,
                "session_id": session_id,
                "seq": seq,
            }),
        )
    }

    /// Create a Presence Update packet (op=3)
    #[must_use]
    pub fn presence_update(game: Option<&str>, idle_since: Option<u64>) -> Self {
        Self::command(
            OpCode::PresenceUpdate,
            json!({
                "idle_since": idle_since,
                "game": game.map(|name| json!({ "name": name })),
            }),
        )
    }

    /// Create a Request Guild Members packet (op=8) for a chunk of guilds
    #[must_use]
    pub fn request_guild_members(guild_ids: &[Snowflake]) -> Self {
        Self::command(
            OpCode::RequestGuildMembers,
            json!({
                "guild_id": guild_ids,
                "query": "",
                "limit": 0,
            }),
        )
    }

    /// Create a Voice State Update packet (op=4)
    ///
    /// A `None` channel disconnects from voice in that guild.
    #[must_use]
    pub fn voice_state_update(
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        self_mute: bool,
        self_deaf: bool,
    ) -> Self {
        Self::command(
            OpCode::VoiceStateUpdate,
            json!({
                "guild_id": guild_id,
                "channel_id": channel_id,
                "self_mute": self_mute,
                "self_deaf": self_deaf,
            }),
        )
    }
}

impl std::fmt::Display for GatewayPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayPacket(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayPacket(op={})", self.op)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_packet() {
        let packet = GatewayPacket::heartbeat(Some(41));
        assert_eq!(packet.opcode(), Some(OpCode::Heartbeat));
        assert_eq!(packet.d, Some(Value::from(41)));

        let packet = GatewayPacket::heartbeat(None);
        assert!(packet.d.is_none());
    }

    #[test]
    fn test_identify_packet() {
        let packet = GatewayPacket::identify("token123", None);
        assert_eq!(packet.opcode(), Some(OpCode::Identify));

        let d = packet.d.unwrap();
        assert_eq!(d["token"], "token123");
        assert_eq!(d["compress"], true);
        assert_eq!(d["properties"]["$browser"], d["properties"]["$device"]);
        assert!(d.get("shard").is_none());
    }

    #[test]
    fn test_identify_packet_with_shard() {
        let packet = GatewayPacket::identify("token123", Some((2, 8)));
        let d = packet.d.unwrap();
        assert_eq!(d["shard"], serde_json::json!([2, 8]));
    }

    #[test]
    fn test_resume_packet() {
        let packet = GatewayPacket::resume("tok", "sess-1", 42);
        assert_eq!(packet.opcode(), Some(OpCode::Resume));
        let d = packet.d.unwrap();
        assert_eq!(d["session_id"], "sess-1");
        assert_eq!(d["seq"], 42);
        assert_eq!(d["token"], "tok");
    }

    #[test]
    fn test_presence_update_packet() {
        let packet = GatewayPacket::presence_update(Some("rust"), None);
        let d = packet.d.unwrap();
        assert_eq!(d["game"]["name"], "rust");
        assert_eq!(d["idle_since"], Value::Null);

        let packet = GatewayPacket::presence_update(None, Some(12345));
        let d = packet.d.unwrap();
        assert_eq!(d["game"], Value::Null);
        assert_eq!(d["idle_since"], 12345);
    }

    #[test]
    fn test_request_guild_members_packet() {
        let ids = vec![Snowflake::new(1), Snowflake::new(2)];
        let packet = GatewayPacket::request_guild_members(&ids);
        assert_eq!(packet.opcode(), Some(OpCode::RequestGuildMembers));
        let d = packet.d.unwrap();
        assert_eq!(d["guild_id"], serde_json::json!(["1", "2"]));
        assert_eq!(d["query"], "");
        assert_eq!(d["limit"], 0);
    }

    #[test]
    fn test_voice_state_update_packet() {
        let packet = GatewayPacket::voice_state_update(
            Snowflake::new(100),
            Some(Snowflake::new(201)),
            false,
            true,
        );
        let d = packet.d.unwrap();
        assert_eq!(d["guild_id"], "100");
        assert_eq!(d["channel_id"], "201");
        assert_eq!(d["self_deaf"], true);

        let packet = GatewayPacket::voice_state_update(Snowflake::new(100), None, false, false);
        assert_eq!(packet.d.unwrap()["channel_id"], Value::Null);
    }

    #[test]
    fn test_packet_roundtrip() {
        let packet = GatewayPacket {
            op: 0,
            t: Some("MESSAGE_CREATE".to_string()),
            s: Some(5),
            d: Some(serde_json::json!({"id": "1"})),
        };
        let json = serde_json::to_string(&packet).unwrap();
        let parsed: GatewayPacket = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.op, 0);
        assert_eq!(parsed.event_name(), Some("MESSAGE_CREATE"));
        assert_eq!(parsed.s, Some(5));
        assert_eq!(parsed.d, packet.d);
    }

    #[test]
    fn test_unknown_opcode_still_decodes() {
        let packet: GatewayPacket = serde_json::from_str(r#"{"op":42}"#).unwrap();
        assert_eq!(packet.op, 42);
        assert!(packet.opcode().is_none());
    }

    #[test]
    fn test_packet_display() {
        let packet = GatewayPacket {
            op: 0,
            t: Some("READY".to_string()),
            s: Some(1),
            d: None,
        };
        let display = format!("{packet}");
        assert!(display.contains("READY"));
        assert!(display.contains("s=1"));
    }
}
