//! Channel entities - guild channels and private (DM) channels

use serde::{Deserialize, Serialize};

use crate::entities::User;
use crate::value_objects::Snowflake;

/// Channel type enum
///
/// Numeric identity matches the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ChannelType {
    /// Guild text channel
    #[default]
    GuildText = 0,
    /// Direct message between users
    Dm = 1,
    /// Guild voice channel
    GuildVoice = 2,
    /// Group direct message
    GroupDm = 3,
    /// Guild category for organizing channels
    GuildCategory = 4,
}

impl ChannelType {
    /// Get the numeric value
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this type carries voice
    #[inline]
    #[must_use]
    pub const fn is_voice(self) -> bool {
        matches!(self, Self::GuildVoice)
    }
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            // Default for 0 and unknown values
            _ => Self::GuildText,
        }
    }
}

impl Serialize for ChannelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Ok(Self::from(value))
    }
}

/// Guild channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ChannelType,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub topic: Option<String>,
    /// Voice bitrate in bits per second (voice channels only)
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub user_limit: Option<u32>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
}

impl Channel {
    /// Check if this channel can host a voice session
    #[inline]
    #[must_use]
    pub fn is_voice(&self) -> bool {
        self.kind.is_voice()
    }
}

/// Private (DM) channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateChannel {
    pub id: Snowflake,
    #[serde(rename = "type", default = "private_channel_type")]
    pub kind: ChannelType,
    #[serde(default)]
    pub recipients: Vec<User>,
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
}

fn private_channel_type() -> ChannelType {
    ChannelType::Dm
}

impl PrivateChannel {
    /// The primary recipient of a one-to-one DM, if any
    #[must_use]
    pub fn recipient(&self) -> Option<&User> {
        self.recipients.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_roundtrip() {
        assert_eq!(ChannelType::from(0), ChannelType::GuildText);
        assert_eq!(ChannelType::from(2), ChannelType::GuildVoice);
        assert_eq!(ChannelType::from(4), ChannelType::GuildCategory);
        // Unknown types fall back to text
        assert_eq!(ChannelType::from(99), ChannelType::GuildText);
    }

    #[test]
    fn test_channel_is_voice() {
        let json = serde_json::json!({
            "id": "200",
            "guild_id": "100",
            "name": "General Voice",
            "type": 2,
            "position": 3,
            "bitrate": 64000
        });
        let channel: Channel = serde_json::from_value(json).unwrap();
        assert!(channel.is_voice());
        assert_eq!(channel.bitrate, Some(64000));
    }

    #[test]
    fn test_text_channel_is_not_voice() {
        let json = serde_json::json!({
            "id": "201",
            "name": "general",
            "type": 0
        });
        let channel: Channel = serde_json::from_value(json).unwrap();
        assert!(!channel.is_voice());
        assert_eq!(channel.bitrate, None);
    }

    #[test]
    fn test_private_channel_recipient() {
        let json = serde_json::json!({
            "id": "300",
            "type": 1,
            "recipients": [{"id": "42", "username": "alice", "discriminator": "0001"}]
        });
        let pc: PrivateChannel = serde_json::from_value(json).unwrap();
        assert_eq!(pc.recipient().unwrap().username, "alice");
        assert_eq!(pc.kind, ChannelType::Dm);
    }
}
