use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Local, Utc};

/// Millisecond wall clock. Debounce deadlines and `lastUpdated` stamps are read
/// through this so tests can drive time by hand.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<i64>>);

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn advance(&self, ms: i64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn set(&self, ms: i64) {
        self.0.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.get()
    }
}

fn local(ms: i64) -> DateTime<Local> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// Short local date, e.g. `9/20/2025`.
pub fn local_date(ms: i64) -> String {
    local(ms).format("%-m/%-d/%Y").to_string()
}

/// Local date and time, e.g. `9/20/2025, 2:05:09 PM`.
pub fn local_datetime(ms: i64) -> String {
    local(ms).format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 1_250);
        other.set(5);
        assert_eq!(clock.now_ms(), 5);
    }
}
