use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self { Self { now: Mutex::new(start) } }

    pub fn advance(&self, by: chrono::Duration) { *self.now.lock() += by; }

    pub fn set(&self, to: DateTime<Utc>) { *self.now.lock() = to; }
}

impl Default for ManualClock {
    fn default() -> Self { Self::new(DateTime::<Utc>::UNIX_EPOCH) }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> { *self.now.lock() }
}
