//! Public client surface
//!
//! [`Client`] owns the configuration and the channels into the session
//! task; [`Client::run`] drives the connection until a terminal error.
//! Everything else is non-blocking: events arrive on the bus, lookups
//! read shared tables, operations go through the command channel.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use accord_cache::{CachePool, MemoryCachePool};
use accord_core::{Snowflake, User};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::dispatch::{DispatchRegistry, Dispatcher};
use crate::error::{GatewayError, VoiceJoinError};
use crate::events::{EventBus, SessionEvent};
use crate::rest::Encoding;
use crate::session::{Command, Session, SessionConfig};
use crate::voice::{VoiceClient, VoiceClientTable};

/// Client configuration
#[derive(Clone)]
pub struct ClientOptions {
    /// Bot authentication token
    pub token: String,
    /// Shard coordinates, transmitted in IDENTIFY when set
    pub shard: Option<(u16, u16)>,
    /// Backfill full member lists for large guilds
    pub load_all_members: bool,
    /// Dispatch event names pruned from the registry
    pub disabled_events: Vec<String>,
    /// Wire encoding; only `json` is implemented
    pub encoding: Encoding,
    /// Entity store; defaults to the in-process cache
    pub cache: Option<Arc<dyn CachePool>>,
}

impl ClientOptions {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            shard: None,
            load_all_members: false,
            disabled_events: Vec::new(),
            encoding: Encoding::Json,
            cache: None,
        }
    }

    /// Set shard coordinates; both are required together
    #[must_use]
    pub fn shard(mut self, shard_id: u16, shard_count: u16) -> Self {
        self.shard = Some((shard_id, shard_count));
        self
    }

    #[must_use]
    pub fn load_all_members(mut self, enabled: bool) -> Self {
        self.load_all_members = enabled;
        self
    }

    #[must_use]
    pub fn disabled_events(mut self, events: Vec<String>) -> Self {
        self.disabled_events = events;
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CachePool>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Check the options for inconsistencies
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.token.trim().is_empty() {
            return Err(GatewayError::Config("token must not be empty".to_string()));
        }
        if self.encoding == Encoding::Etf {
            return Err(GatewayError::Config(
                "etf encoding is declared but not implemented; use json".to_string(),
            ));
        }
        if let Some((shard_id, shard_count)) = self.shard {
            if shard_count == 0 || shard_id >= shard_count {
                return Err(GatewayError::Config(format!(
                    "shard {shard_id} out of range for shard count {shard_count}"
                )));
            }
        }
        Ok(())
    }
}

/// A gateway client
pub struct Client {
    bus: EventBus,
    cache: Arc<dyn CachePool>,
    voice_clients: Arc<VoiceClientTable>,
    commands_tx: mpsc::Sender<Command>,
    me_rx: watch::Receiver<Option<User>>,
    session: Option<Session>,
}

impl Client {
    /// Build a client from validated options
    pub fn new(options: ClientOptions) -> Result<Self, GatewayError> {
        options.validate()?;

        let bus = EventBus::new();
        let cache = options
            .cache
            .clone()
            .unwrap_or_else(|| Arc::new(MemoryCachePool::new()));
        let voice_clients = Arc::new(VoiceClientTable::new());
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (me_tx, me_rx) = watch::channel(None);

        let registry = DispatchRegistry::standard().without(&options.disabled_events);
        let session = Session::new(
            SessionConfig {
                token: options.token,
                shard: options.shard,
                encoding: options.encoding,
                load_all_members: options.load_all_members,
            },
            Dispatcher::new(registry),
            bus.clone(),
            Arc::clone(&cache),
            Arc::clone(&voice_clients),
            commands_tx.clone(),
            commands_rx,
            me_tx,
        );

        Ok(Self {
            bus,
            cache,
            voice_clients,
            commands_tx,
            me_rx,
            session: Some(session),
        })
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// The entity store handlers write into
    #[must_use]
    pub fn cache(&self) -> Arc<dyn CachePool> {
        Arc::clone(&self.cache)
    }

    /// The logged-in user, once READY has arrived
    #[must_use]
    pub fn me(&self) -> Option<User> {
        self.me_rx.borrow().clone()
    }

    /// The voice client for a guild, if one is connected
    #[must_use]
    pub fn voice_client(&self, guild_id: Snowflake) -> Option<Arc<VoiceClient>> {
        self.voice_clients.get(&guild_id).map(|r| r.value().clone())
    }

    /// Run the session until a terminal error
    ///
    /// Reconnects on transient failures; returns only when the token is
    /// rejected. Can be called once.
    pub async fn run(&mut self) -> Result<(), GatewayError> {
        let mut session = self
            .session
            .take()
            .ok_or_else(|| GatewayError::Config("client is already running".to_string()))?;
        session.run().await
    }

    /// Update the bot's presence
    pub async fn update_presence(&self, game: Option<&str>, idle: bool) {
        let idle_since = if idle {
            Some(
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0),
            )
        } else {
            None
        };
        let _ = self
            .commands_tx
            .send(Command::UpdatePresence {
                game: game.map(String::from),
                idle_since,
            })
            .await;
    }

    /// Join a voice channel
    ///
    /// Resolves with the voice client once the gateway has delivered both
    /// halves of the voice handshake; rejects on wrong channel type,
    /// duplicate guild, or timeout.
    pub async fn join_voice_channel(
        &self,
        channel_id: Snowflake,
        self_mute: bool,
        self_deaf: bool,
    ) -> Result<Arc<VoiceClient>, VoiceJoinError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands_tx
            .send(Command::JoinVoice {
                channel_id,
                self_mute,
                self_deaf,
                reply: reply_tx,
            })
            .await
            .map_err(|_| VoiceJoinError::Cancelled)?;
        reply_rx.await.map_err(|_| VoiceJoinError::Cancelled)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = ClientOptions::new("tok");
        assert_eq!(options.token, "tok");
        assert!(options.shard.is_none());
        assert!(!options.load_all_members);
        assert_eq!(options.encoding, Encoding::Json);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(ClientOptions::new("").validate().is_err());
        assert!(ClientOptions::new("   ").validate().is_err());
    }

    #[test]
    fn test_etf_encoding_rejected() {
        let options = ClientOptions::new("tok").encoding(Encoding::Etf);
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("etf"));
    }

    #[test]
    fn test_shard_bounds_checked() {
        assert!(ClientOptions::new("tok").shard(0, 2).validate().is_ok());
        assert!(ClientOptions::new("tok").shard(1, 2).validate().is_ok());
        assert!(ClientOptions::new("tok").shard(2, 2).validate().is_err());
        assert!(ClientOptions::new("tok").shard(0, 0).validate().is_err());
    }

    #[tokio::test]
    async fn test_client_construction() {
        let mut client = Client::new(ClientOptions::new("tok")).unwrap();
        assert!(client.me().is_none());
        assert!(client
            .voice_client(accord_core::Snowflake::new(1))
            .is_none());
        assert!(client.session.is_some());

        // Taking the session twice is an error
        let _ = client.session.take().unwrap();
        let err = client.run().await.unwrap_err();
        assert!(err.to_string().contains("already running"));
    }

    #[tokio::test]
    async fn test_invalid_options_fail_construction() {
        assert!(Client::new(ClientOptions::new("")).is_err());
    }
}
