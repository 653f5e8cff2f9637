//! User entity - a Discord user account as delivered by the gateway

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// User entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Get the full tag: username#discriminator
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{}#{}", self.username, self.discriminator)
    }

    /// Get the avatar URL, or the default avatar URL when none is set
    #[must_use]
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash),
            None => format!(
                "https://cdn.discordapp.com/embed/avatars/{}.png",
                self.default_avatar_index()
            ),
        }
    }

    /// Default avatar index (0-4) based on discriminator
    fn default_avatar_index(&self) -> u8 {
        self.discriminator.parse::<u16>().unwrap_or(0) as u8 % 5
    }

    /// Check if this is a bot account
    #[inline]
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.bot
    }
}
