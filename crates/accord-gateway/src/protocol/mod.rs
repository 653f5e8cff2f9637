//! Gateway wire protocol
//!
//! Opcodes, close codes, the `op/t/s/d` packet envelope, typed payloads,
//! and the frame codec.

mod close_codes;
pub mod codec;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use codec::{decode, encode};
pub use messages::GatewayPacket;
pub use opcodes::OpCode;
pub use payloads::{
    GuildMembersChunk, HelloPayload, ReadyPayload, VoiceServerUpdatePayload,
};

/// Gateway protocol version sent in the connection query string
pub const GATEWAY_VERSION: u8 = 6;
