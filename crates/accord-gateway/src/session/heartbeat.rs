//! Heartbeat schedule and ACK watchdog
//!
//! Pure timing state driven by the session loop; the loop owns the actual
//! timers and calls in when they fire. A missed ACK re-sends the
//! heartbeat; repeated misses escalate to a forced reconnect instead of
//! re-arming forever.

use tokio::time::{Duration, Instant};

/// How long to wait for an ACK after each heartbeat send
pub const ACK_DEADLINE: Duration = Duration::from_secs(5);

/// Consecutive missed ACKs before the connection is declared dead
pub const MAX_MISSED_ACKS: u32 = 3;

/// What the session should do when the watchdog fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// Send another heartbeat and keep waiting
    Resend,
    /// Too many misses; tear down and reconnect
    Reconnect,
}

/// Heartbeat timing state
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    last_send: Option<Instant>,
    ack_deadline: Option<Instant>,
    missed_acks: u32,
}

impl Heartbeat {
    /// Create a schedule from the Hello payload's interval
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            last_send: None,
            ack_deadline: None,
            missed_acks: 0,
        }
    }

    /// The periodic send interval
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a heartbeat send: stamps the send time and arms the
    /// watchdog. At most one watchdog is armed; a re-send replaces the
    /// previous deadline.
    pub fn on_send(&mut self, now: Instant) {
        self.last_send = Some(now);
        self.ack_deadline = Some(now + ACK_DEADLINE);
    }

    /// Record an ACK: disarms the watchdog, resets the miss counter, and
    /// returns the round-trip time when a send is outstanding.
    pub fn on_ack(&mut self, now: Instant) -> Option<Duration> {
        self.ack_deadline = None;
        self.missed_acks = 0;
        self.last_send.map(|sent| now.saturating_duration_since(sent))
    }

    /// The armed watchdog deadline, if any
    #[must_use]
    pub fn watchdog_deadline(&self) -> Option<Instant> {
        self.ack_deadline
    }

    /// The watchdog fired without an ACK
    pub fn on_watchdog_fired(&mut self) -> WatchdogVerdict {
        self.ack_deadline = None;
        self.missed_acks += 1;
        if self.missed_acks >= MAX_MISSED_ACKS {
            WatchdogVerdict::Reconnect
        } else {
            WatchdogVerdict::Resend
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_arms_exactly_one_watchdog() {
        let mut hb = Heartbeat::new(41_250);
        assert!(hb.watchdog_deadline().is_none());

        let now = Instant::now();
        hb.on_send(now);
        assert_eq!(hb.watchdog_deadline(), Some(now + ACK_DEADLINE));

        // A second send replaces the deadline rather than stacking
        let later = now + Duration::from_secs(1);
        hb.on_send(later);
        assert_eq!(hb.watchdog_deadline(), Some(later + ACK_DEADLINE));
    }

    #[test]
    fn test_ack_cancels_watchdog_and_reports_rtt() {
        let mut hb = Heartbeat::new(41_250);
        let now = Instant::now();
        hb.on_send(now);

        let rtt = hb.on_ack(now + Duration::from_millis(120)).unwrap();
        assert_eq!(rtt, Duration::from_millis(120));
        assert!(hb.watchdog_deadline().is_none());

        // A second ACK cancels nothing further and reports against the
        // same send
        let rtt = hb.on_ack(now + Duration::from_millis(200)).unwrap();
        assert_eq!(rtt, Duration::from_millis(200));
    }

    #[test]
    fn test_ack_without_send_has_no_rtt() {
        let mut hb = Heartbeat::new(41_250);
        assert!(hb.on_ack(Instant::now()).is_none());
    }

    #[test]
    fn test_watchdog_escalates_after_max_misses() {
        let mut hb = Heartbeat::new(41_250);
        let now = Instant::now();

        for i in 1..MAX_MISSED_ACKS {
            hb.on_send(now);
            assert_eq!(
                hb.on_watchdog_fired(),
                WatchdogVerdict::Resend,
                "miss #{i} should re-send"
            );
        }

        hb.on_send(now);
        assert_eq!(hb.on_watchdog_fired(), WatchdogVerdict::Reconnect);
    }

    #[test]
    fn test_ack_resets_miss_counter() {
        let mut hb = Heartbeat::new(41_250);
        let now = Instant::now();

        hb.on_send(now);
        assert_eq!(hb.on_watchdog_fired(), WatchdogVerdict::Resend);
        hb.on_send(now);
        assert_eq!(hb.on_watchdog_fired(), WatchdogVerdict::Resend);

        // An ACK arrives; the streak is broken
        hb.on_ack(now);

        hb.on_send(now);
        assert_eq!(hb.on_watchdog_fired(), WatchdogVerdict::Resend);
    }

    #[test]
    fn test_interval_from_hello() {
        let hb = Heartbeat::new(41_250);
        assert_eq!(hb.interval(), Duration::from_millis(41_250));
    }
}
