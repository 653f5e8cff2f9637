//! Voice sessions
//!
//! The gateway's half of voice: negotiating the `{session_id, token,
//! endpoint}` triple for a guild and handing it to the voice data plane.
//! The data plane itself is an external collaborator; [`VoiceClient`] is
//! the handle the join completion resolves with.

mod join;

pub(crate) use join::PendingVoiceJoin;
pub use join::JOIN_TIMEOUT;

use std::sync::Arc;

use accord_core::Snowflake;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::session::Command;

/// Everything the voice data plane needs to connect for one guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSession {
    /// From VOICE_STATE_UPDATE
    pub session_id: String,
    /// From VOICE_SERVER_UPDATE
    pub endpoint: String,
    pub token: String,
}

/// Table of live voice clients, at most one per guild
pub type VoiceClientTable = DashMap<Snowflake, Arc<VoiceClient>>;

/// A negotiated voice connection for one guild
#[derive(Debug)]
pub struct VoiceClient {
    guild_id: Snowflake,
    channel_id: Snowflake,
    session: VoiceSession,
    /// Channel bitrate applied when the session came up
    bitrate: Option<u32>,
    commands: mpsc::Sender<Command>,
}

impl VoiceClient {
    pub(crate) fn new(
        guild_id: Snowflake,
        channel_id: Snowflake,
        session: VoiceSession,
        bitrate: Option<u32>,
        commands: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            guild_id,
            channel_id,
            session,
            bitrate,
            commands,
        }
    }

    #[must_use]
    pub fn guild_id(&self) -> Snowflake {
        self.guild_id
    }

    #[must_use]
    pub fn channel_id(&self) -> Snowflake {
        self.channel_id
    }

    #[must_use]
    pub fn session(&self) -> &VoiceSession {
        &self.session
    }

    #[must_use]
    pub fn bitrate(&self) -> Option<u32> {
        self.bitrate
    }

    /// Leave the voice channel
    ///
    /// Sends the null-channel voice state update and removes this client
    /// from the voice table.
    pub async fn disconnect(&self) {
        let _ = self
            .commands
            .send(Command::LeaveVoice {
                guild_id: self.guild_id,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnect_sends_leave_command() {
        let (tx, mut rx) = mpsc::channel(4);
        let client = VoiceClient::new(
            Snowflake::new(100),
            Snowflake::new(201),
            VoiceSession {
                session_id: "s".to_string(),
                endpoint: "e".to_string(),
                token: "t".to_string(),
            },
            Some(64_000),
            tx,
        );

        client.disconnect().await;

        match rx.try_recv().unwrap() {
            Command::LeaveVoice { guild_id } => assert_eq!(guild_id, Snowflake::new(100)),
            other => panic!("expected LeaveVoice, got {other:?}"),
        }
    }

    #[test]
    fn test_accessors() {
        let (tx, _rx) = mpsc::channel(1);
        let client = VoiceClient::new(
            Snowflake::new(100),
            Snowflake::new(201),
            VoiceSession {
                session_id: "s".to_string(),
                endpoint: "e".to_string(),
                token: "t".to_string(),
            },
            None,
            tx,
        );
        assert_eq!(client.guild_id(), Snowflake::new(100));
        assert_eq!(client.channel_id(), Snowflake::new(201));
        assert_eq!(client.session().endpoint, "e");
        assert!(client.bitrate().is_none());
    }
}
