//! Large-guild member chunker
//!
//! Batches guild ids whose member lists were truncated into paced
//! REQUEST_GUILD_MEMBERS sends, and signals `ready` once every backfill
//! completes. Pure scheduling state; the session loop owns the timers and
//! sends the packets.

use std::collections::VecDeque;

use accord_core::Snowflake;
use tokio::time::{Duration, Instant};

use crate::session::SessionState;

/// Guild ids per chunk request
pub const CHUNK_SIZE: usize = 50;

/// Interval between backfill progress checks
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Spacing between consecutive chunk request sends
pub const SEND_SPACING: Duration = Duration::from_secs(1);

/// What the session should do after a chunker deadline fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkerAction {
    /// Nothing due
    None,
    /// All backfills complete; gate the ready emission through this
    Ready,
    /// Send one chunk request for these guild ids
    Send(Vec<Snowflake>),
}

/// Member-chunk scheduling state
#[derive(Debug)]
pub struct MemberChunker {
    enabled: bool,
    active: bool,
    pending: VecDeque<Vec<Snowflake>>,
    next_check_at: Option<Instant>,
    next_send_at: Option<Instant>,
}

impl MemberChunker {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            active: false,
            pending: VecDeque::new(),
            next_check_at: None,
            next_send_at: None,
        }
    }

    /// Whether member loading is configured at all
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the periodic check is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start the periodic check; the first check runs immediately
    pub fn activate(&mut self, now: Instant) {
        if !self.enabled || self.active {
            return;
        }
        self.active = true;
        self.next_check_at = Some(now);
    }

    /// The next instant the session loop should wake us at
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_check_at, self.next_send_at) {
            (Some(c), Some(s)) => Some(c.min(s)),
            (Some(c), None) => Some(c),
            (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }

    /// Advance the schedule at `now`
    pub fn poll(&mut self, state: &mut SessionState, now: Instant) -> ChunkerAction {
        if !self.active {
            return ChunkerAction::None;
        }

        // Paced sends take priority over checks
        if self.next_send_at.is_some_and(|at| at <= now) {
            if let Some(chunk) = self.pending.pop_front() {
                self.next_send_at = if self.pending.is_empty() {
                    None
                } else {
                    Some(now + SEND_SPACING)
                };
                return ChunkerAction::Send(chunk);
            }
            self.next_send_at = None;
        }

        if self.next_check_at.is_some_and(|at| at <= now) {
            self.next_check_at = Some(now + CHECK_INTERVAL);

            if state.large_guilds.is_empty() && state.large_sent.is_empty() {
                return ChunkerAction::Ready;
            }

            if !state.large_guilds.is_empty() {
                let ids: Vec<Snowflake> = state.large_guilds.drain().collect();
                state.large_sent.extend(ids.iter().copied());
                for chunk in ids.chunks(CHUNK_SIZE) {
                    self.pending.push_back(chunk.to_vec());
                }
                // First send fires immediately; the rest are spaced
                if self.next_send_at.is_none() {
                    self.next_send_at = Some(now);
                }
            }
        }

        ChunkerAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker_with_guilds(count: u64) -> (MemberChunker, SessionState) {
        let mut state = SessionState::new();
        for i in 0..count {
            state.large_guilds.insert(Snowflake::new(i + 1));
        }
        let mut chunker = MemberChunker::new(true);
        chunker.activate(Instant::now());
        (chunker, state)
    }

    #[test]
    fn test_disabled_chunker_never_activates() {
        let mut chunker = MemberChunker::new(false);
        chunker.activate(Instant::now());
        assert!(!chunker.is_active());
        assert!(chunker.next_deadline().is_none());
    }

    #[test]
    fn test_empty_sets_signal_ready() {
        let (mut chunker, mut state) = chunker_with_guilds(0);
        let now = chunker.next_deadline().unwrap();
        assert_eq!(chunker.poll(&mut state, now), ChunkerAction::Ready);
    }

    #[test]
    fn test_partitions_into_chunks_of_fifty() {
        let (mut chunker, mut state) = chunker_with_guilds(120);
        let now = chunker.next_deadline().unwrap();

        // First poll partitions and schedules the first send immediately
        assert_eq!(chunker.poll(&mut state, now), ChunkerAction::None);
        assert!(state.large_guilds.is_empty());
        assert_eq!(state.large_sent.len(), 120);

        let mut sizes = Vec::new();
        for _ in 0..6 {
            let Some(at) = chunker.next_deadline() else {
                break;
            };
            if let ChunkerAction::Send(chunk) = chunker.poll(&mut state, at) {
                sizes.push(chunk.len());
            }
            if sizes.len() == 3 {
                break;
            }
        }

        // 120 ids → 50 + 50 + 20
        assert_eq!(sizes, vec![50, 50, 20]);
    }

    #[test]
    fn test_sends_are_spaced_one_second() {
        let (mut chunker, mut state) = chunker_with_guilds(120);
        let t0 = chunker.next_deadline().unwrap();
        chunker.poll(&mut state, t0);

        // First send due immediately
        let first = chunker.next_deadline().unwrap();
        assert_eq!(first, t0);
        assert!(matches!(
            chunker.poll(&mut state, first),
            ChunkerAction::Send(_)
        ));

        // Second send a full second later
        let second = chunker.next_deadline().unwrap();
        assert_eq!(second, first + SEND_SPACING);
    }

    #[test]
    fn test_ids_in_at_most_one_set() {
        let (mut chunker, mut state) = chunker_with_guilds(10);
        let now = chunker.next_deadline().unwrap();
        chunker.poll(&mut state, now);

        for i in 0..10u64 {
            let id = Snowflake::new(i + 1);
            let in_guilds = state.large_guilds.contains(&id);
            let in_sent = state.large_sent.contains(&id);
            assert!(!(in_guilds && in_sent), "id {id} in both sets");
            assert!(in_sent, "id {id} should be in flight");
        }
    }

    #[test]
    fn test_ready_after_all_chunks_satisfied() {
        let (mut chunker, mut state) = chunker_with_guilds(3);
        let t0 = chunker.next_deadline().unwrap();
        chunker.poll(&mut state, t0);

        // Drain the single pending send
        let send_at = chunker.next_deadline().unwrap();
        assert!(matches!(
            chunker.poll(&mut state, send_at),
            ChunkerAction::Send(_)
        ));

        // Responses satisfy every guild
        state.large_sent.clear();

        // The next periodic check reports ready
        let check_at = chunker.next_deadline().unwrap();
        assert_eq!(chunker.poll(&mut state, check_at), ChunkerAction::Ready);
    }

    #[test]
    fn test_late_large_guild_is_picked_up() {
        let (mut chunker, mut state) = chunker_with_guilds(0);
        let t0 = chunker.next_deadline().unwrap();
        assert_eq!(chunker.poll(&mut state, t0), ChunkerAction::Ready);

        // A large guild shows up after bootstrap
        state.large_guilds.insert(Snowflake::new(99));
        let t1 = chunker.next_deadline().unwrap();
        chunker.poll(&mut state, t1);
        assert!(state.large_sent.contains(&Snowflake::new(99)));

        let send_at = chunker.next_deadline().unwrap();
        match chunker.poll(&mut state, send_at) {
            ChunkerAction::Send(chunk) => assert_eq!(chunk, vec![Snowflake::new(99)]),
            other => panic!("expected Send, got {other:?}"),
        }
    }
}
