//! Expiration Module
//!
//! Clocks and the reconciliation of a driver's TTL ceiling with a caller's
//! absolute expiration.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

// == Clock ==
/// Source of the current time for a driver.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

// == Manual Clock ==
/// A settable clock shared between clones, for simulated time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

// == Expiration Policy ==
/// Caps caller expirations at the configured TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    ttl: i64,
}

impl ExpirationPolicy {
    pub fn new(ttl: i64) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    // == Life ==
    /// Seconds the backend should keep an entry: `min(ttl, expiration - now)`.
    ///
    /// The result is zero or negative when `expiration` is not in the future.
    pub fn life(&self, expiration: Timestamp, now: Timestamp) -> i64 {
        let life = expiration.saturating_sub(now);
        if self.ttl < life {
            self.ttl
        } else {
            life
        }
    }

    /// Positive lifetime in seconds, or `None` when the entry is already expired.
    pub fn lifetime(&self, expiration: Timestamp, now: Timestamp) -> Option<u64> {
        let life = self.life(expiration, now);
        (life > 0).then_some(life as u64)
    }

    /// Absolute native deadline for an entry stored at `now`.
    pub fn deadline(&self, expiration: Timestamp, now: Timestamp) -> Option<Timestamp> {
        self.lifetime(expiration, now)
            .map(|life| now.saturating_add(life as i64))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_life_capped_by_ttl() {
        let policy = ExpirationPolicy::new(300);
        assert_eq!(policy.life(1_000 + 10_000, 1_000), 300);
    }

    #[test]
    fn test_life_shorter_than_ttl() {
        let policy = ExpirationPolicy::new(300);
        assert_eq!(policy.life(1_010, 1_000), 10);
        assert_eq!(policy.lifetime(1_010, 1_000), Some(10));
    }

    #[test]
    fn test_past_expiration_is_negative() {
        let policy = ExpirationPolicy::new(300);
        assert_eq!(policy.life(999, 1_000), -1);
        assert_eq!(policy.lifetime(999, 1_000), None);
        assert_eq!(policy.lifetime(1_000, 1_000), None);
    }

    #[test]
    fn test_deadline() {
        let policy = ExpirationPolicy::new(50);
        assert_eq!(policy.deadline(2_000, 1_000), Some(1_050));
        assert_eq!(policy.deadline(1_020, 1_000), Some(1_020));
        assert_eq!(policy.deadline(900, 1_000), None);
    }

    #[test]
    fn test_extreme_expiration_does_not_overflow() {
        let policy = ExpirationPolicy::new(300);
        assert_eq!(policy.life(i64::MAX, -10), 300);
        assert!(policy.life(i64::MIN, 10) < 0);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100);
        let other = clock.clone();

        clock.advance(60);
        assert_eq!(other.now(), 160);

        other.set(5);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
