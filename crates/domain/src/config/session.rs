use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session rotation policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session rotation policy.
///
/// A session is rotated on the next access once the application has been
/// continuously backgrounded for longer than
/// `background_inactivity_timeout_secs`, or once the session is older than
/// `max_lifetime_secs` regardless of activity.
///
/// `max_lifetime_secs` is expected to be at least
/// `background_inactivity_timeout_secs`.  This is not enforced: a shorter
/// lifetime simply makes rotations more frequent.  [`super::Config::validate`]
/// reports it as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum continuous backgrounded time before the session is stale.
    #[serde(default = "d_background_inactivity_timeout_secs")]
    pub background_inactivity_timeout_secs: u64,

    /// Absolute cap on a session's duration.
    #[serde(default = "d_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            background_inactivity_timeout_secs: d_background_inactivity_timeout_secs(),
            max_lifetime_secs: d_max_lifetime_secs(),
        }
    }
}

impl SessionConfig {
    /// Build a config from durations. Both are stored as whole seconds,
    /// so any sub-second part is dropped (`1500ms` becomes `1s`).
    pub fn new(background_inactivity_timeout: Duration, max_lifetime: Duration) -> Self {
        Self {
            background_inactivity_timeout_secs: background_inactivity_timeout.as_secs(),
            max_lifetime_secs: max_lifetime.as_secs(),
        }
    }

    pub fn background_inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.background_inactivity_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_background_inactivity_timeout_secs() -> u64 {
    15 * 60
}
fn d_max_lifetime_secs() -> u64 {
    4 * 60 * 60
}
