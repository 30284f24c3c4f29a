//! Injectable time source
//!
//! Every `created_at`/`updated_at`/`last_modified` stamp in the crate goes
//! through a [`Clock`] so the queue and the conflict rule stay deterministic
//! under test.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of the current timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The default for production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to an explicit instant, advanced manually.
///
/// Used by tests that need to order timestamps precisely.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Start at the unix epoch.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::at_epoch();
        let start = clock.now();
        clock.advance(Duration::seconds(42));
        assert_eq!(clock.now() - start, Duration::seconds(42));
    }
}
