//! Gateway entities
//!
//! Typed views of the payloads the gateway delivers. Hydration is plain
//! serde deserialization from the dispatch `d` field; unknown fields are
//! ignored so protocol additions never break decoding.

mod channel;
mod guild;
mod member;
mod presence;
mod user;
mod voice_state;

pub use channel::{Channel, ChannelType, PrivateChannel};
pub use guild::Guild;
pub use member::GuildMember;
pub use presence::{Presence, PresenceStatus, PresenceUser};
pub use user::User;
pub use voice_state::VoiceState;
