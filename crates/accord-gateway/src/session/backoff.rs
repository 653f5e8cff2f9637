//! Reconnect pacing
//!
//! Each failed attempt doubles a delay ceiling up to a fixed cap, and the
//! actual delay is drawn uniformly from zero to that ceiling so a fleet
//! of clients does not stampede a recovering gateway.

use tokio::time::Duration;

/// Delay ceiling before the first retry
pub const BACKOFF_BASE_MS: u64 = 1_000;

/// Upper bound on any retry delay
pub const BACKOFF_CAP_MS: u64 = 30_000;

/// Jittered exponential backoff
#[derive(Debug)]
pub struct Backoff {
    base_ms: u64,
    cap_ms: u64,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self {
            base_ms,
            cap_ms,
            attempt: 0,
        }
    }

    /// Draw the next delay and advance the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling_ms();
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(fastrand::u64(0..=ceiling))
    }

    /// The doubling ceiling for the current attempt, clamped to the cap
    fn ceiling_ms(&self) -> u64 {
        // Widen before shifting; clamping the shift keeps even absurd
        // attempt counts in range
        let shift = self.attempt.min(63);
        let doubled = u128::from(self.base_ms) << shift;
        doubled.min(u128::from(self.cap_ms)) as u64
    }

    /// Reset after a healthy connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_BASE_MS, BACKOFF_CAP_MS)
    }
}
