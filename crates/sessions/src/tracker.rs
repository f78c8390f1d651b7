//! Background inactivity tracking.
//!
//! [`BackgroundTimeoutTracker`] turns the foreground/background signal
//! stream into a single predicate: has the application been continuously
//! backgrounded for longer than the configured timeout?
//!
//! ```text
//!              backgrounded                foregrounded
//!  Foreground ─────────────► Background ─────────────► Returning
//!      ▲                         ▲                         │
//!      │                         └──── backgrounded ───────┤
//!      └──────────────────────── bump ─────────────────────┘
//! ```
//!
//! `Returning` keeps the background duration frozen at the moment of the
//! foreground signal, so the first access after a long absence still sees
//! the timeout.  The bump that follows that access settles the tracker in
//! `Foreground`, where no timeout is ever reported.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::{duration_nanos, Clock};
use crate::lifecycle::{AppLifecycle, ApplicationStateListener};

/// Idle-window bookkeeping consulted by the engine on every access.
pub trait TimeoutTracker: Send + Sync {
    /// Record activity: restart the idle window from now.
    fn bump(&self);

    /// Whether the idle window has exceeded the inactivity timeout.
    fn has_timed_out(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppState {
    Foreground,
    Background,
    /// Foregrounded, but no access has happened since.
    Returning { backgrounded_for: i64 },
}

#[derive(Debug)]
struct TrackerState {
    app: AppState,
    /// Start of the current idle window (monotonic nanos).
    idle_since: i64,
}

/// Tracks continuous background time against an inactivity timeout.
pub struct BackgroundTimeoutTracker {
    clock: Arc<dyn Clock>,
    timeout_nanos: i64,
    state: Mutex<TrackerState>,
}

impl BackgroundTimeoutTracker {
    pub fn new(clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        let idle_since = clock.now_nanos();
        Self {
            clock,
            timeout_nanos: duration_nanos(timeout),
            state: Mutex::new(TrackerState {
                app: AppState::Foreground,
                idle_since,
            }),
        }
    }

    /// Create a tracker and subscribe it to `lifecycle`.
    pub fn register(
        lifecycle: &AppLifecycle,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Arc<Self> {
        let tracker = Arc::new(Self::new(clock, timeout));
        lifecycle.register(tracker.clone());
        tracker
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_nanos(self.timeout_nanos.max(0) as u64)
    }
}

impl TimeoutTracker for BackgroundTimeoutTracker {
    fn bump(&self) {
        let now = self.clock.now_nanos();
        let mut state = self.state.lock();
        if let AppState::Returning { .. } = state.app {
            state.app = AppState::Foreground;
        }
        state.idle_since = now;
    }

    fn has_timed_out(&self) -> bool {
        let now = self.clock.now_nanos();
        let state = self.state.lock();
        let idle = match state.app {
            AppState::Foreground => return false,
            AppState::Background => now.saturating_sub(state.idle_since),
            AppState::Returning { backgrounded_for } => backgrounded_for,
        };
        idle > self.timeout_nanos
    }
}

impl ApplicationStateListener for BackgroundTimeoutTracker {
    fn on_application_foregrounded(&self) {
        let now = self.clock.now_nanos();
        let mut state = self.state.lock();
        if state.app == AppState::Background {
            state.app = AppState::Returning {
                backgrounded_for: now.saturating_sub(state.idle_since),
            };
        }
    }

    fn on_application_backgrounded(&self) {
        let now = self.clock.now_nanos();
        let mut state = self.state.lock();
        state.app = AppState::Background;
        state.idle_since = now;
    }
}
