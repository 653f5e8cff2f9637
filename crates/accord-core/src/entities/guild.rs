//! Guild entity - a Discord server as delivered by GUILD_CREATE

use serde::{Deserialize, Serialize};

use crate::entities::{Channel, GuildMember, VoiceState};
use crate::value_objects::Snowflake;

/// Guild entity
///
/// GUILD_CREATE for an available guild carries the full payload; an
/// unavailable guild is just `{id, unavailable: true}` and every other
/// field takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    /// True when the member list was truncated and needs chunk backfill
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub unavailable: bool,
    /// Total member count, including members not present in `members`
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: Vec<GuildMember>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
}

impl Guild {
    /// Check if a user owns this guild
    #[inline]
    #[must_use]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Look up a channel by id
    #[must_use]
    pub fn channel(&self, channel_id: Snowflake) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == channel_id)
    }

    /// True when the delivered member list is incomplete
    #[must_use]
    pub fn needs_member_backfill(&self) -> bool {
        self.large || (self.members.len() as u32) < self.member_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_guild_deserializes() {
        let json = serde_json::json!({"id": "41771983423143937", "unavailable": true});
        let guild: Guild = serde_json::from_value(json).unwrap();
        assert!(guild.unavailable);
        assert!(guild.name.is_empty());
        assert!(guild.channels.is_empty());
    }

    #[test]
    fn test_full_guild_deserializes() {
        let json = serde_json::json!({
            "id": "100",
            "name": "Test Guild",
            "owner_id": "1",
            "large": false,
            "member_count": 2,
            "channels": [
                {"id": "200", "name": "general", "type": 0},
                {"id": "201", "name": "Voice", "type": 2, "bitrate": 64000}
            ],
            "members": [
                {"user": {"id": "1", "username": "owner", "discriminator": "0001"}},
                {"user": {"id": "2", "username": "member", "discriminator": "0002"}}
            ]
        });
        let guild: Guild = serde_json::from_value(json).unwrap();
        assert_eq!(guild.name, "Test Guild");
        assert!(guild.is_owner(Snowflake::new(1)));
        assert!(!guild.is_owner(Snowflake::new(2)));
        assert!(guild.channel(Snowflake::new(201)).unwrap().is_voice());
        assert!(!guild.needs_member_backfill());
    }

    #[test]
    fn test_large_guild_needs_backfill() {
        let json = serde_json::json!({
            "id": "100",
            "name": "Big",
            "large": true,
            "member_count": 5000,
            "members": []
        });
        let guild: Guild = serde_json::from_value(json).unwrap();
        assert!(guild.needs_member_backfill());
    }

    #[test]
    fn test_truncated_member_list_needs_backfill() {
        let json = serde_json::json!({
            "id": "100",
            "name": "Mid",
            "large": false,
            "member_count": 3,
            "members": [
                {"user": {"id": "1", "username": "a", "discriminator": "0001"}}
            ]
        });
        let guild: Guild = serde_json::from_value(json).unwrap();
        assert!(guild.needs_member_backfill());
    }
}
