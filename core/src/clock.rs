// Time sources for EID rotation
//
// All timestamps in this crate are milliseconds since the Unix epoch.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use web_time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in one minute, the granularity of the system clock
pub const MILLIS_PER_MINUTE: i64 = 60 * 1000;

/// Source of the current time used to pick rotation windows
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock, truncated to whole minutes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        // A clock set before 1970 reads as the epoch itself.
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        whole_minutes_millis(since_epoch)
    }
}

/// `elapsed` in milliseconds, saturating at `i64::MAX`, truncated to a minute
fn whole_minutes_millis(elapsed: Duration) -> i64 {
    let millis = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
    millis - millis.rem_euclid(MILLIS_PER_MINUTE)
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `now_millis`
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    /// Move forward (or backward, for negative deltas) by `delta_millis`
    pub fn advance(&self, delta_millis: i64) {
        self.now.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
