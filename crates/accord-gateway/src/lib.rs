//! # accord-gateway
//!
//! A Discord gateway client: the long-lived WebSocket session connecting
//! a bot to the real-time event stream. Maintains liveness through the
//! heartbeat protocol, recovers from drops by resuming, bootstraps the
//! in-memory guild view (including large-guild member chunking), and
//! negotiates per-guild voice sessions.

pub mod chunker;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod protocol;
pub mod rest;
pub mod session;
pub mod voice;

// Re-export the surface most consumers need
pub use client::{Client, ClientOptions};
pub use error::{GatewayError, VoiceJoinError};
pub use events::{EventBus, SessionEvent};
pub use rest::Encoding;
pub use session::SessionSnapshot;
pub use voice::{VoiceClient, VoiceSession};
