//! Wall-clock source for session start/end times.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock (replay and tests)
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Advance by fractional seconds
    pub fn advance_secs(&self, seconds: f64) {
        self.advance(Duration::microseconds((seconds * 1e6).round() as i64));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Session id derived from a prefix and the start time
///
/// `session_id_from_start_time("watch", t)` gives e.g. `watch_20251108_024942`.
pub fn session_id_from_start_time(prefix: &str, start_time: DateTime<Utc>) -> String {
    format!("{}_{}", prefix, start_time.format("%Y%m%d_%H%M%S"))
}
