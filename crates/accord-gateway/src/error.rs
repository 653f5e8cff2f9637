//! Error types for the gateway client
//!
//! Recoverable errors stay local to the session and are logged; only token
//! invalidity is surfaced as terminal. Per-operation failures (voice join)
//! flow through their own completions.

use accord_core::Snowflake;

/// Errors produced by the gateway session
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed frame, missing required fields, or other protocol violation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The token was rejected (close code 4004). Terminal.
    #[error("token is invalid")]
    InvalidToken,

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    Transport(Box<tokio_tungstenite::tungstenite::Error>),

    /// HTTP error during gateway URL discovery
    #[error("HTTP error fetching gateway URL: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection closed with a code
    #[error("Connection closed with code {0}")]
    Closed(u16),

    /// The gateway did not send Hello in time
    #[error("Timed out waiting for Hello")]
    HelloTimeout,

    /// Invalid client options
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Errors rejecting a voice-join completion
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceJoinError {
    /// The target channel is not a voice channel
    #[error("Channel {0} is not a voice channel")]
    NotVoiceChannel(Snowflake),

    /// The target channel is not in the session's guild index
    #[error("Unknown channel {0}")]
    UnknownChannel(Snowflake),

    /// A voice client already exists for the guild
    #[error("Already connected to voice in guild {0}")]
    AlreadyConnected(Snowflake),

    /// The voice handshake did not complete in time
    #[error("Voice join timed out")]
    Timeout,

    /// The session dropped the join (disconnect or shutdown)
    #[error("Voice join cancelled")]
    Cancelled,
}
