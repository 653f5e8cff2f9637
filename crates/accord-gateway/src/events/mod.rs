//! Event emission
//!
//! Consumers subscribe to a broadcast channel of [`SessionEvent`]s. Every
//! event is named; dispatch events use the wire names (SCREAMING_SNAKE)
//! and lifecycle events the lowercase names below.

use serde_json::Value;
use tokio::sync::broadcast;

use crate::session::SessionSnapshot;

/// Lifecycle event names emitted by the session itself
pub mod lifecycle {
    /// Every decoded inbound packet, before any handling
    pub const RAW: &str = "raw";
    /// Bootstrap complete; emitted at most once per session
    pub const READY: &str = "ready";
    /// First dispatch received after a reconnect
    pub const RECONNECTED: &str = "reconnected";
    /// Gateway server trace from Hello/READY
    pub const TRACE: &str = "trace";
    /// Terminal failure (invalid token)
    pub const ERROR: &str = "error";
    /// A heartbeat was sent; payload carries the sequence
    pub const HEARTBEAT: &str = "heartbeat";
    /// A heartbeat was acknowledged; payload carries the round-trip ms
    pub const HEARTBEAT_ACK: &str = "heartbeat-ack";
}

/// Dispatch event names (the `t` field of op=0 frames)
pub mod names {
    pub const READY: &str = "READY";
    pub const RESUMED: &str = "RESUMED";

    pub const GUILD_CREATE: &str = "GUILD_CREATE";
    pub const GUILD_UPDATE: &str = "GUILD_UPDATE";
    pub const GUILD_DELETE: &str = "GUILD_DELETE";
    pub const GUILD_MEMBER_ADD: &str = "GUILD_MEMBER_ADD";
    pub const GUILD_MEMBER_UPDATE: &str = "GUILD_MEMBER_UPDATE";
    pub const GUILD_MEMBER_REMOVE: &str = "GUILD_MEMBER_REMOVE";
    pub const GUILD_MEMBERS_CHUNK: &str = "GUILD_MEMBERS_CHUNK";
    pub const GUILD_ROLE_CREATE: &str = "GUILD_ROLE_CREATE";
    pub const GUILD_ROLE_UPDATE: &str = "GUILD_ROLE_UPDATE";
    pub const GUILD_ROLE_DELETE: &str = "GUILD_ROLE_DELETE";

    pub const CHANNEL_CREATE: &str = "CHANNEL_CREATE";
    pub const CHANNEL_UPDATE: &str = "CHANNEL_UPDATE";
    pub const CHANNEL_DELETE: &str = "CHANNEL_DELETE";

    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
    pub const MESSAGE_UPDATE: &str = "MESSAGE_UPDATE";
    pub const MESSAGE_DELETE: &str = "MESSAGE_DELETE";

    pub const PRESENCE_UPDATE: &str = "PRESENCE_UPDATE";
    pub const TYPING_START: &str = "TYPING_START";
    pub const USER_UPDATE: &str = "USER_UPDATE";

    pub const VOICE_STATE_UPDATE: &str = "VOICE_STATE_UPDATE";
    pub const VOICE_SERVER_UPDATE: &str = "VOICE_SERVER_UPDATE";
}

/// A named event emitted to subscribers
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub name: String,
    pub data: Value,
    /// State view at emission time; present on primary dispatch
    /// emissions, absent on alias and lifecycle emissions
    pub snapshot: Option<SessionSnapshot>,
}

/// Broadcast fan-out for session events
///
/// Cloning shares the underlying channel. Slow subscribers lag rather
/// than block the session.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

/// Buffered events per subscriber before lagging
const BUS_CAPACITY: usize = 256;

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event with no snapshot
    pub fn emit(&self, name: impl Into<String>, data: Value) {
        self.emit_inner(name.into(), data, None);
    }

    /// Emit an event carrying a state snapshot
    pub fn emit_with_snapshot(
        &self,
        name: impl Into<String>,
        data: Value,
        snapshot: SessionSnapshot,
    ) {
        self.emit_inner(name.into(), data, Some(snapshot));
    }

    fn emit_inner(&self, name: String, data: Value, snapshot: Option<SessionSnapshot>) {
        // A send error just means nobody is listening
        let _ = self.tx.send(SessionEvent {
            name,
            data,
            snapshot,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
