//! Voice-join state machine
//!
//! A join waits on two inputs that may arrive in either order:
//! VOICE_STATE_UPDATE carrying our session_id, and VOICE_SERVER_UPDATE
//! carrying the endpoint and token. Whichever arrives first is buffered
//! here; when both halves are present the join completes. The completion
//! fires exactly once, as a resolve, a reject, or a timeout.

use std::sync::Arc;

use accord_core::Snowflake;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};

use super::{VoiceClient, VoiceSession};
use crate::error::VoiceJoinError;
use crate::session::Command;

/// How long a join may wait for both updates
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Completion channel for a join attempt
pub(crate) type JoinReply = oneshot::Sender<Result<Arc<VoiceClient>, VoiceJoinError>>;

/// One in-flight voice-join attempt
#[derive(Debug)]
pub(crate) struct PendingVoiceJoin {
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
    pub self_mute: bool,
    pub self_deaf: bool,
    /// Applied to the voice client when the session comes up
    pub bitrate: Option<u32>,
    pub deadline: Instant,

    session_id: Option<String>,
    endpoint: Option<String>,
    token: Option<String>,
    reply: JoinReply,
}

impl PendingVoiceJoin {
    pub fn new(
        guild_id: Snowflake,
        channel_id: Snowflake,
        self_mute: bool,
        self_deaf: bool,
        bitrate: Option<u32>,
        reply: JoinReply,
        now: Instant,
    ) -> Self {
        Self {
            guild_id,
            channel_id,
            self_mute,
            self_deaf,
            bitrate,
            deadline: now + JOIN_TIMEOUT,
            session_id: None,
            endpoint: None,
            token: None,
            reply,
        }
    }

    /// Record the VOICE_STATE_UPDATE half
    pub fn observe_state(&mut self, session_id: String) {
        self.session_id = Some(session_id);
    }

    /// Record the VOICE_SERVER_UPDATE half
    pub fn observe_server(&mut self, endpoint: String, token: String) {
        self.endpoint = Some(endpoint);
        self.token = Some(token);
    }

    /// Both halves present?
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.session_id.is_some() && self.endpoint.is_some() && self.token.is_some()
    }

    /// Build the voice client and resolve the completion
    ///
    /// Returns the client for registration in the voice table. Call only
    /// when [`is_complete`](Self::is_complete) holds.
    pub fn complete(self, commands: mpsc::Sender<Command>) -> Option<Arc<VoiceClient>> {
        let (Some(session_id), Some(endpoint), Some(token)) =
            (self.session_id, self.endpoint, self.token)
        else {
            return None;
        };

        let client = Arc::new(VoiceClient::new(
            self.guild_id,
            self.channel_id,
            VoiceSession {
                session_id,
                endpoint,
                token,
            },
            self.bitrate,
            commands,
        ));
        let _ = self.reply.send(Ok(Arc::clone(&client)));
        Some(client)
    }

    /// Reject the completion
    pub fn reject(self, error: VoiceJoinError) {
        let _ = self.reply.send(Err(error));
    }
}
