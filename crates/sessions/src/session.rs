//! The session value type.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

/// An immutable snapshot of one session.
///
/// Two sessions are equal when their ids are equal.  [`Session::NONE`] is
/// the only session with an empty id; it stands for "no session yet".
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    start_nanos: i64,
    started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub const NONE: Session = Session {
        id: String::new(),
        start_nanos: -1,
        started_at: None,
    };

    pub(crate) fn new(id: String, start_nanos: i64, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            start_nanos,
            started_at: Some(started_at),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Monotonic clock reading at which the session started (`-1` for NONE).
    pub fn start_nanos(&self) -> i64 {
        self.start_nanos
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_none(&self) -> bool {
        self.id.is_empty()
    }

    /// Age at monotonic reading `now`.  Negative if the clock went back.
    pub fn age_nanos(&self, now: i64) -> i64 {
        now.saturating_sub(self.start_nanos)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("<none>")
        } else {
            f.write_str(&self.id)
        }
    }
}

/// Why the engine replaced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationReason {
    /// The session outlived the configured maximum lifetime.
    MaxLifetime { age_secs: u64 },
    /// The application stayed backgrounded past the inactivity timeout.
    BackgroundTimeout,
}

impl fmt::Display for RotationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxLifetime { age_secs } => write!(f, "max lifetime exceeded (age={age_secs}s)"),
            Self::BackgroundTimeout => f.write_str("background inactivity timeout"),
        }
    }
}
