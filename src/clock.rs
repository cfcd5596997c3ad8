//! Wall-clock source
//!
//! The driver asks the clock which month is current to decide which shard
//! is still open for writes and must stay out of the cache.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock reading the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock returning a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock to another instant
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock() {
        let december = Utc.with_ymd_and_hms(2015, 12, 8, 0, 0, 0).unwrap();
        let clock = FixedClock::new(december);
        assert_eq!(clock.now(), december);

        let january = Utc.with_ymd_and_hms(2016, 1, 2, 0, 0, 0).unwrap();
        clock.set(january);
        assert_eq!(clock.now(), january);
    }

    #[test]
    fn test_system_clock_advances() {
        let before = Utc::now();
        assert!(SystemClock.now() >= before);
    }
}
