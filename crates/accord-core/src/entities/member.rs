//! Member entity - a user's membership in a guild

use serde::{Deserialize, Serialize};

use crate::entities::{PresenceStatus, User};
use crate::value_objects::Snowflake;

/// Guild member entity
///
/// Members delivered by GUILD_CREATE or GUILD_MEMBERS_CHUNK carry no
/// presence; `status` and `game` start at their offline defaults and are
/// overwritten by PRESENCE_UPDATE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildMember {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub deaf: bool,
    /// Set during hydration; chunk payloads omit it
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub status: PresenceStatus,
    #[serde(default)]
    pub game: Option<serde_json::Value>,
}

impl GuildMember {
    /// Get display name (nickname if set, otherwise the username)
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.username)
    }

    /// Check if the member has a specific role
    #[inline]
    #[must_use]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }
}
