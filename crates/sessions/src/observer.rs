//! Session boundary observers.

use std::sync::Arc;

use sk_domain::trace::TraceEvent;

use crate::clock::Clock;
use crate::session::Session;

/// Notified when the engine rotates the session.
///
/// For every rotation each observer first receives `on_session_ended` for
/// the old session, and only after all observers have seen that, receives
/// `on_session_started` for the new one.  Callbacks run synchronously on
/// the thread that triggered the rotation, outside the engine lock, so they
/// may call back into the engine.
pub trait SessionObserver: Send + Sync {
    fn on_session_started(&self, new: &Session, previous: &Session);

    fn on_session_ended(&self, ended: &Session);

    /// Label used when logging a failing observer.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Emits `session.start` / `session.end` trace events.
pub struct SessionEventsObserver {
    clock: Arc<dyn Clock>,
}

impl SessionEventsObserver {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn start_event(new: &Session, previous: &Session) -> TraceEvent {
        TraceEvent::SessionStarted {
            session_id: new.id().to_owned(),
            previous_id: (!previous.is_none()).then(|| previous.id().to_owned()),
        }
    }

    fn end_event(&self, ended: &Session) -> TraceEvent {
        let age = ended.age_nanos(self.clock.now_nanos()).max(0);
        TraceEvent::SessionEnded {
            session_id: ended.id().to_owned(),
            duration_ms: (age / 1_000_000) as u64,
        }
    }
}

impl SessionObserver for SessionEventsObserver {
    fn on_session_started(&self, new: &Session, previous: &Session) {
        Self::start_event(new, previous).emit();
    }

    fn on_session_ended(&self, ended: &Session) {
        self.end_event(ended).emit();
    }

    fn name(&self) -> &str {
        "session-events"
    }
}
