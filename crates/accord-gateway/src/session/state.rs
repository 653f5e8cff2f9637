//! Session state
//!
//! Everything the session mutates lives here, owned by the single session
//! task. Nothing in this module does I/O, which keeps the state machine
//! testable without a socket.

use std::collections::{HashMap, HashSet, VecDeque};

use accord_core::{Channel, Guild, GuildMember, PrivateChannel, Snowflake, User};
use serde_json::Value;

/// A guild with its hydrated member table
#[derive(Debug, Clone)]
pub struct GuildRecord {
    pub guild: Guild,
    pub members: HashMap<Snowflake, GuildMember>,
    /// Expected total from the GUILD_CREATE payload; the chunker compares
    /// the member table against this
    pub member_count: u32,
}

impl GuildRecord {
    /// Build a record from a hydrated guild, moving its member list into
    /// the keyed table
    #[must_use]
    pub fn from_guild(mut guild: Guild) -> Self {
        let member_count = guild.member_count;
        let members = std::mem::take(&mut guild.members)
            .into_iter()
            .map(|mut m| {
                m.guild_id = Some(guild.id);
                (m.user.id, m)
            })
            .collect();
        Self {
            guild,
            members,
            member_count,
        }
    }

    /// True once the member table covers the expected count
    #[must_use]
    pub fn members_complete(&self) -> bool {
        self.members.len() as u32 >= self.member_count
    }
}

/// A dispatch invocation buffered until `ready` fires
#[derive(Debug, Clone)]
pub struct DeferredDispatch {
    pub name: String,
    pub data: Value,
}

/// Immutable view of the session handed to event subscribers
///
/// Replaces the source design of deep-cloning the whole session per
/// event: subscribers diff against ids and the sequence cursor.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub user_id: Option<Snowflake>,
    pub session_id: Option<String>,
    pub seq: Option<u64>,
    pub guild_ids: Vec<Snowflake>,
}

/// Mutable session state, confined to the session task
#[derive(Debug, Default)]
pub struct SessionState {
    /// Last seen sequence number, monotonic non-decreasing
    pub seq: Option<u64>,
    /// Server-assigned session identifier from READY
    pub session_id: Option<String>,
    /// While true and a session id is present, the next handshake resumes
    pub reconnecting: bool,
    pub reconnect_count: u32,
    /// `ready` fires at most once per session
    pub emitted_ready: bool,

    /// The logged-in user
    pub me: Option<User>,
    pub guilds: HashMap<Snowflake, GuildRecord>,
    pub private_channels: HashMap<Snowflake, PrivateChannel>,

    /// Guild ids withheld from READY, drained by GUILD_CREATE
    pub unavailable: HashSet<Snowflake>,
    /// Guild ids awaiting a member-chunk request
    pub large_guilds: HashSet<Snowflake>,
    /// Guild ids with an in-flight chunk request
    pub large_sent: HashSet<Snowflake>,

    /// Dispatches buffered before `ready`, drained FIFO after it
    pub deferred: VecDeque<DeferredDispatch>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame's sequence number; never moves backwards
    pub fn observe_sequence(&mut self, seq: Option<u64>) {
        if let Some(s) = seq {
            if self.seq.map_or(true, |cur| s >= cur) {
                self.seq = Some(s);
            }
        }
    }

    /// Whether the next handshake should RESUME instead of IDENTIFY
    #[must_use]
    pub fn should_resume(&self) -> bool {
        self.reconnecting && self.session_id.is_some()
    }

    /// Mark the session as reconnecting after a transport failure
    pub fn begin_reconnect(&mut self) {
        self.reconnecting = true;
        self.reconnect_count += 1;
    }

    /// Find a channel across all guild records
    #[must_use]
    pub fn find_channel(&self, channel_id: Snowflake) -> Option<(Snowflake, &Channel)> {
        self.guilds.values().find_map(|record| {
            record
                .guild
                .channel(channel_id)
                .map(|c| (record.guild.id, c))
        })
    }

    /// Take a snapshot for event emission
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut guild_ids: Vec<Snowflake> = self.guilds.keys().copied().collect();
        guild_ids.sort_unstable();
        SessionSnapshot {
            user_id: self.me.as_ref().map(|u| u.id),
            session_id: self.session_id.clone(),
            seq: self.seq,
            guild_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guild_from_json(value: Value) -> Guild {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_observe_sequence_is_monotonic() {
        let mut state = SessionState::new();
        assert_eq!(state.seq, None);

        state.observe_sequence(Some(5));
        assert_eq!(state.seq, Some(5));

        state.observe_sequence(None);
        assert_eq!(state.seq, Some(5));

        // Stale sequence is ignored
        state.observe_sequence(Some(3));
        assert_eq!(state.seq, Some(5));

        state.observe_sequence(Some(6));
        assert_eq!(state.seq, Some(6));
    }

    #[test]
    fn test_should_resume_requires_both() {
        let mut state = SessionState::new();
        assert!(!state.should_resume());

        state.reconnecting = true;
        assert!(!state.should_resume());

        state.session_id = Some("sess".to_string());
        assert!(state.should_resume());

        state.reconnecting = false;
        assert!(!state.should_resume());
    }

    #[test]
    fn test_begin_reconnect_counts() {
        let mut state = SessionState::new();
        state.begin_reconnect();
        state.begin_reconnect();
        assert!(state.reconnecting);
        assert_eq!(state.reconnect_count, 2);
    }

    #[test]
    fn test_guild_record_keys_members() {
        let guild = guild_from_json(json!({
            "id": "100",
            "name": "g",
            "member_count": 2,
            "members": [
                {"user": {"id": "1", "username": "a", "discriminator": "0001"}},
                {"user": {"id": "2", "username": "b", "discriminator": "0002"}}
            ]
        }));
        let record = GuildRecord::from_guild(guild);
        assert_eq!(record.members.len(), 2);
        assert!(record.members_complete());
        // Hydration stamps the owning guild onto each member
        assert_eq!(
            record.members[&Snowflake::new(1)].guild_id,
            Some(Snowflake::new(100))
        );
        // The vec was moved out, not copied
        assert!(record.guild.members.is_empty());
    }

    #[test]
    fn test_guild_record_incomplete_members() {
        let guild = guild_from_json(json!({
            "id": "100",
            "name": "g",
            "member_count": 50,
            "members": [
                {"user": {"id": "1", "username": "a", "discriminator": "0001"}}
            ]
        }));
        let record = GuildRecord::from_guild(guild);
        assert!(!record.members_complete());
    }

    #[test]
    fn test_find_channel() {
        let mut state = SessionState::new();
        let guild = guild_from_json(json!({
            "id": "100",
            "name": "g",
            "channels": [{"id": "201", "name": "Voice", "type": 2}]
        }));
        state.guilds.insert(guild.id, GuildRecord::from_guild(guild));

        let (gid, channel) = state.find_channel(Snowflake::new(201)).unwrap();
        assert_eq!(gid, Snowflake::new(100));
        assert!(channel.is_voice());

        assert!(state.find_channel(Snowflake::new(999)).is_none());
    }

    #[test]
    fn test_snapshot_captures_view() {
        let mut state = SessionState::new();
        state.session_id = Some("sess".to_string());
        state.seq = Some(9);
        let guild = guild_from_json(json!({"id": "100", "name": "g"}));
        state.guilds.insert(guild.id, GuildRecord::from_guild(guild));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.session_id.as_deref(), Some("sess"));
        assert_eq!(snapshot.seq, Some(9));
        assert_eq!(snapshot.guild_ids, vec![Snowflake::new(100)]);
        assert!(snapshot.user_id.is_none());
    }
}
