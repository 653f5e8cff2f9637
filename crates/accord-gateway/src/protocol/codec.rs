//! Frame codec
//!
//! Text frames are JSON; binary frames are zlib-compressed JSON (the
//! compression the IDENTIFY payload requests). Control frames carry no
//! packet and decode to `None`.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tokio_tungstenite::tungstenite::Message;

use super::GatewayPacket;
use crate::error::GatewayError;

/// Decode a WebSocket message into a gateway packet
///
/// Returns `Ok(None)` for frames that carry no packet (ping/pong).
/// Close frames are handled by the session loop before decoding.
pub fn decode(message: &Message) -> Result<Option<GatewayPacket>, GatewayError> {
    match message {
        Message::Text(text) => Ok(Some(serde_json::from_str(text)?)),
        Message::Binary(bytes) => {
            let mut json = String::new();
            ZlibDecoder::new(&bytes[..])
                .read_to_string(&mut json)
                .map_err(|e| GatewayError::Protocol(format!("zlib inflate failed: {e}")))?;
            Ok(Some(serde_json::from_str(&json)?))
        }
        _ => Ok(None),
    }
}

/// Encode a gateway packet as a JSON text frame
pub fn encode(packet: &GatewayPacket) -> Result<Message, GatewayError> {
    Ok(Message::Text(serde_json::to_string(packet)?.into()))
}
