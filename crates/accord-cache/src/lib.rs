//! # accord-cache
//!
//! The entity store dispatch handlers write into. The gateway treats the
//! cache as a shared collaborator with a fixed contract: string keys,
//! JSON values, last writer wins. The default backend is an in-process
//! concurrent map; a different [`CachePool`] can be injected through the
//! client options.

use accord_core::Snowflake;
use dashmap::DashMap;
use serde_json::Value;

/// Key helpers for the store layout used by the gateway handlers.
///
/// - `user.{uid}`: user entities
/// - `guild.{gid}`: guild entities
/// - `guild.{gid}.members.{uid}`: guild members
/// - `private_channel.{recipient_uid}`: DM channels indexed by recipient
pub mod keys {
    use super::Snowflake;

    #[must_use]
    pub fn user(user_id: Snowflake) -> String {
        format!("user.{user_id}")
    }

    #[must_use]
    pub fn guild(guild_id: Snowflake) -> String {
        format!("guild.{guild_id}")
    }

    #[must_use]
    pub fn guild_member(guild_id: Snowflake, user_id: Snowflake) -> String {
        format!("guild.{guild_id}.members.{user_id}")
    }

    #[must_use]
    pub fn private_channel(recipient_id: Snowflake) -> String {
        format!("private_channel.{recipient_id}")
    }
}

/// A pluggable cache store
///
/// Writes are commutative key-sets: handlers may run in any order within a
/// frame and the last writer wins. Implementations must be safe to share
/// across tasks.
pub trait CachePool: Send + Sync {
    /// Store a value under a key, replacing any previous value
    fn put(&self, key: &str, value: Value);

    /// Fetch a value by key
    fn get(&self, key: &str) -> Option<Value>;

    /// Remove a value, returning it if present
    fn remove(&self, key: &str) -> Option<Value>;

    /// Number of stored entries
    fn len(&self) -> usize;

    /// Whether the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count entries whose key starts with `prefix`
    fn count_prefix(&self, prefix: &str) -> usize;
}

/// In-process cache backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryCachePool {
    entries: DashMap<String, Value>,
}

impl MemoryCachePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CachePool for MemoryCachePool {
    fn put(&self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|r| r.clone())
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn count_prefix(&self, prefix: &str) -> usize {
        self.entries
            .iter()
            .filter(|r| r.key().starts_with(prefix))
            .count()
    }
}
