//! Gateway operation codes
//!
//! Numeric identity must match the server; the set is fixed by the
//! protocol and unknown inbound opcodes are ignored at the session layer.

/// Gateway operation codes
///
/// Op codes define the type of message being sent or received over the
/// WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Server dispatches a named event (receive only)
    Dispatch = 0,
    /// Heartbeat - keep connection alive (bidirectional)
    Heartbeat = 1,
    /// Identify - start a fresh session (send only)
    Identify = 2,
    /// Presence Update - update online status (send only)
    PresenceUpdate = 3,
    /// Voice State Update - join/leave/move voice channels (send only)
    VoiceStateUpdate = 4,
    /// Resume - continue an interrupted session (send only)
    Resume = 6,
    /// Reconnect - server requests a reconnect (receive only)
    Reconnect = 7,
    /// Request Guild Members - ask for member chunks (send only)
    RequestGuildMembers = 8,
    /// Invalid Session - the session must re-identify (receive only)
    InvalidSession = 9,
    /// Hello - sent on connect with the heartbeat interval (receive only)
    Hello = 10,
    /// Heartbeat ACK - heartbeat acknowledged (receive only)
    HeartbeatAck = 11,
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::PresenceUpdate),
            4 => Some(Self::VoiceStateUpdate),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            8 => Some(Self::RequestGuildMembers),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this op code can be sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::Identify
                | Self::PresenceUpdate
                | Self::VoiceStateUpdate
                | Self::Resume
                | Self::RequestGuildMembers
        )
    }

    /// Check if this op code can be sent by the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        matches!(
            self,
            Self::Dispatch
                | Self::Heartbeat
                | Self::Reconnect
                | Self::InvalidSession
                | Self::Hello
                | Self::HeartbeatAck
        )
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::PresenceUpdate => "PresenceUpdate",
            Self::VoiceStateUpdate => "VoiceStateUpdate",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::RequestGuildMembers => "RequestGuildMembers",
            Self::InvalidSession => "InvalidSession",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
