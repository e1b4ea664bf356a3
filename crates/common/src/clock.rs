//! Clock abstraction for artifact timestamps and retention.
//!
//! Stores stamp every entry with the time it was written, and the reaper
//! compares those stamps against a cutoff. Both read time through [`Clock`]
//! so tests can drive retention without sleeping.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually advanced clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock frozen at the current system time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = to_chrono(by);
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Age of an entry stamped at `created_at`, saturating at zero for
/// entries stamped in the future.
pub fn age_of(clock: &dyn Clock, created_at: DateTime<Utc>) -> Duration {
    (clock.now() - created_at).to_std().unwrap_or(Duration::ZERO)
}

/// Cutoff instant for a retention window: entries created strictly
/// before it have expired.
pub fn retention_cutoff(clock: &dyn Clock, retention: Duration) -> DateTime<Utc> {
    clock
        .now()
        .checked_sub_signed(to_chrono(retention))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000))
}
