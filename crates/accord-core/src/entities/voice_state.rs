//! Voice state - a user's position in a guild's voice channels

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// VOICE_STATE_UPDATE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// None when the user disconnected from voice
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Voice connection identifier, paired with VOICE_SERVER_UPDATE
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub deaf: bool,
}

impl VoiceState {
    /// True when this state represents a connected user
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel_id.is_some()
    }
}
