//! Dispatch registry
//!
//! The immutable mapping from dispatch event names to their alternative
//! emission names. Built once at startup and pruned by the configured
//! disabled-events list; a name absent from the registry is never
//! dispatched to consumers.

use std::collections::HashMap;

use crate::events::names;

/// Standard table: event name → alternative emission names
const STANDARD: &[(&str, &[&str])] = &[
    (names::READY, &[]),
    (names::RESUMED, &[]),
    (names::GUILD_CREATE, &[]),
    (names::GUILD_UPDATE, &[]),
    (names::GUILD_DELETE, &[]),
    (names::GUILD_MEMBER_ADD, &[]),
    (names::GUILD_MEMBER_UPDATE, &[]),
    (names::GUILD_MEMBER_REMOVE, &[]),
    (names::GUILD_MEMBERS_CHUNK, &[]),
    (names::GUILD_ROLE_CREATE, &[]),
    (names::GUILD_ROLE_UPDATE, &[]),
    (names::GUILD_ROLE_DELETE, &[]),
    (names::CHANNEL_CREATE, &[]),
    (names::CHANNEL_UPDATE, &[]),
    (names::CHANNEL_DELETE, &[]),
    (names::MESSAGE_CREATE, &["message"]),
    (names::MESSAGE_UPDATE, &[]),
    (names::MESSAGE_DELETE, &[]),
    (names::PRESENCE_UPDATE, &["presence"]),
    (names::TYPING_START, &["typing"]),
    (names::USER_UPDATE, &[]),
    (names::VOICE_STATE_UPDATE, &[]),
    (names::VOICE_SERVER_UPDATE, &[]),
];

/// Immutable event-name registry
#[derive(Debug, Clone)]
pub struct DispatchRegistry {
    entries: HashMap<&'static str, &'static [&'static str]>,
}

impl DispatchRegistry {
    /// The full standard registry
    #[must_use]
    pub fn standard() -> Self {
        Self {
            entries: STANDARD.iter().copied().collect(),
        }
    }

    /// Remove the named events, consuming and returning the registry
    #[must_use]
    pub fn without(mut self, disabled: &[String]) -> Self {
        for name in disabled {
            self.entries.remove(name.as_str());
        }
        self
    }

    /// Whether the event is dispatched at all
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Alternative emission names for an event
    #[must_use]
    pub fn aliases(&self, name: &str) -> &'static [&'static str] {
        self.entries.get(name).copied().unwrap_or(&[])
    }

    /// Number of registered events
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_contents() {
        let registry = DispatchRegistry::standard();
        assert!(registry.contains("READY"));
        assert!(registry.contains("GUILD_CREATE"));
        assert!(registry.contains("VOICE_SERVER_UPDATE"));
        assert!(!registry.contains("NOT_AN_EVENT"));
        assert_eq!(registry.len(), STANDARD.len());
    }

    #[test]
    fn test_aliases() {
        let registry = DispatchRegistry::standard();
        assert_eq!(registry.aliases("MESSAGE_CREATE"), &["message"]);
        assert_eq!(registry.aliases("TYPING_START"), &["typing"]);
        assert!(registry.aliases("READY").is_empty());
        assert!(registry.aliases("NOT_AN_EVENT").is_empty());
    }

    #[test]
    fn test_pruning_disabled_events() {
        let disabled = vec!["TYPING_START".to_string(), "PRESENCE_UPDATE".to_string()];
        let registry = DispatchRegistry::standard().without(&disabled);

        assert!(!registry.contains("TYPING_START"));
        assert!(!registry.contains("PRESENCE_UPDATE"));
        assert!(registry.contains("MESSAGE_CREATE"));
        assert_eq!(registry.len(), STANDARD.len() - 2);
    }

    #[test]
    fn test_pruning_unknown_name_is_noop() {
        let disabled = vec!["NO_SUCH_EVENT".to_string()];
        let registry = DispatchRegistry::standard().without(&disabled);
        assert_eq!(registry.len(), STANDARD.len());
    }
}
