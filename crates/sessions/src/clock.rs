//! Time sources.
//!
//! Session age and idle windows are computed from a monotonic nanosecond
//! counter; wall time is only used to label sessions and events.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Supplies monotonic and wall time.
pub trait Clock: Send + Sync {
    /// Monotonic nanoseconds since an arbitrary, fixed origin.
    fn now_nanos(&self) -> i64;

    /// Current wall-clock time.
    fn wall_time(&self) -> DateTime<Utc>;
}

/// Convert a duration to signed nanoseconds, saturating at `i64::MAX`.
pub(crate) fn duration_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SystemClock
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process clock backed by [`Instant`] and [`Utc::now`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        duration_nanos(self.origin.elapsed())
    }

    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ManualClock
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A clock that only moves when told to.
///
/// Starts at zero nanoseconds; wall time is `wall_origin` plus the elapsed
/// monotonic time.  Used by tests and by the CLI timeline simulator.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
    wall_origin: DateTime<Utc>,
}

impl ManualClock {
    /// A clock whose wall time starts at the Unix epoch.
    pub fn new() -> Self {
        Self::starting_at(DateTime::<Utc>::default())
    }

    pub fn starting_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            nanos: AtomicI64::new(0),
            wall_origin,
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = duration_nanos(by);
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(delta))
            });
    }

    /// Jump to an absolute reading.  May move backwards.
    pub fn set_nanos(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::Release);
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.now_nanos().max(0) as u64)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.nanos.load(Ordering::Acquire)
    }

    fn wall_time(&self) -> DateTime<Utc> {
        self.wall_origin + chrono::Duration::nanoseconds(self.now_nanos())
    }
}
