//! Time sources used by stores, the scheduler caller and stats.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock shifted by a whole number of days, for simulating days passing.
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock {
    pub offset_days: i64,
}

impl OffsetClock {
    pub fn new(offset_days: i64) -> Self {
        Self { offset_days }
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(self.offset_days)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }

    /// Advances the clock by 24 hours per day
    pub fn advance_days(&self, days: i64) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += Duration::days(days);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances_whole_days() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance_days(6);
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 3, 7, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_offset_clock_is_ahead_of_system_clock() {
        let clock = OffsetClock::new(2);
        let diff = clock.now() - SystemClock.now();
        assert!(diff > Duration::days(1));
        assert!(diff <= Duration::days(2));
    }
}
