//! The session engine.
//!
//! Every call to [`SessionEngine::get_session_id`] runs the same decision
//! under one lock:
//!
//! ```text
//! get_session_id
//!   │
//!   ├─ no session yet ──────────► mint session₀, bump, return (silent)
//!   │
//!   ├─ age > max lifetime ─┐
//!   ├─ tracker timed out ──┴────► mint next, swap, bump ─┐
//!   │                                                    │ (lock released)
//!   │                                                    ├─► ended(previous) × observers
//!   │                                                    └─► started(next, previous) × observers
//!   │
//!   └─ otherwise ───────────────► bump, return current
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use sk_domain::config::SessionConfig;
use sk_domain::trace::TraceEvent;

use crate::clock::{duration_nanos, Clock, SystemClock};
use crate::id::{RandomSessionIds, SessionIdGenerator};
use crate::lifecycle::AppLifecycle;
use crate::observer::SessionObserver;
use crate::session::{RotationReason, Session};
use crate::tracker::{BackgroundTimeoutTracker, TimeoutTracker};

/// Anything that can stamp telemetry with the current session id.
pub trait SessionProvider: Send + Sync {
    fn session_id(&self) -> String;
}

/// Provider for setups without session tracking; always returns `""`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionProvider;

impl SessionProvider for NoopSessionProvider {
    fn session_id(&self) -> String {
        String::new()
    }
}

struct EngineState {
    current: Session,
}

/// A rotation decided under the lock, reported after it is released.
struct Rotation {
    previous: Session,
    next: Session,
    reason: RotationReason,
}

/// Owns the current session and decides when to rotate it.
pub struct SessionEngine {
    max_lifetime_nanos: i64,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn SessionIdGenerator>,
    tracker: Arc<dyn TimeoutTracker>,
    state: Mutex<EngineState>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}

impl SessionEngine {
    pub fn new(
        config: &SessionConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn SessionIdGenerator>,
        tracker: Arc<dyn TimeoutTracker>,
    ) -> Self {
        Self {
            max_lifetime_nanos: duration_nanos(config.max_lifetime()),
            clock,
            ids,
            tracker,
            state: Mutex::new(EngineState {
                current: Session::NONE,
            }),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Start wiring an engine with production defaults.
    pub fn builder(config: SessionConfig) -> SessionEngineBuilder {
        SessionEngineBuilder::new(config)
    }

    /// Register an observer for all future rotations.  Past rotations,
    /// including the creation of the first session, are not replayed.
    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.write().push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Return the current session id, rotating first if the session expired.
    pub fn get_session_id(&self) -> String {
        let (id, rotation) = {
            let mut state = self.state.lock();
            let now = self.clock.now_nanos();

            if state.current.is_none() {
                state.current = self.mint(now);
                self.tracker.bump();
                let id = state.current.id().to_owned();
                TraceEvent::SessionCreated {
                    session_id: id.clone(),
                }
                .emit();
                return id;
            }

            match self.rotation_reason(&state.current, now) {
                Some(reason) => {
                    let next = self.mint(now);
                    let previous = std::mem::replace(&mut state.current, next.clone());
                    self.tracker.bump();
                    let rotation = Rotation {
                        previous,
                        next,
                        reason,
                    };
                    (rotation.next.id().to_owned(), Some(rotation))
                }
                None => {
                    self.tracker.bump();
                    (state.current.id().to_owned(), None)
                }
            }
        };

        if let Some(rotation) = rotation {
            self.report(&rotation);
        }
        id
    }

    fn rotation_reason(&self, current: &Session, now: i64) -> Option<RotationReason> {
        // A negative age (clock regression) never exceeds the lifetime.
        let age = current.age_nanos(now);
        if age > self.max_lifetime_nanos {
            return Some(RotationReason::MaxLifetime {
                age_secs: (age / 1_000_000_000) as u64,
            });
        }
        if self.tracker.has_timed_out() {
            return Some(RotationReason::BackgroundTimeout);
        }
        None
    }

    fn mint(&self, now: i64) -> Session {
        Session::new(self.ids.generate(), now, self.clock.wall_time())
    }

    fn report(&self, rotation: &Rotation) {
        let Rotation {
            previous,
            next,
            reason,
        } = rotation;

        tracing::debug!(
            old_session_id = %previous,
            new_session_id = %next,
            reason = %reason,
            "session rotated"
        );
        TraceEvent::SessionRotated {
            old_session_id: previous.id().to_owned(),
            new_session_id: next.id().to_owned(),
            reason: reason.to_string(),
        }
        .emit();

        // Copy so observers may register further observers mid-loop.
        let observers = self.observers.read().clone();
        for observer in &observers {
            isolate(observer.as_ref(), "on_session_ended", || {
                observer.on_session_ended(previous)
            });
        }
        for observer in &observers {
            isolate(observer.as_ref(), "on_session_started", || {
                observer.on_session_started(next, previous)
            });
        }
    }
}

impl SessionProvider for SessionEngine {
    fn session_id(&self) -> String {
        self.get_session_id()
    }
}

/// Run one observer callback, logging instead of propagating a panic.
fn isolate(observer: &dyn SessionObserver, callback: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let message = panic_message(payload.as_ref());
        tracing::error!(
            observer = observer.name(),
            callback,
            error = %message,
            "session observer panicked"
        );
        TraceEvent::ObserverFailed {
            observer: observer.name().to_owned(),
            callback: callback.to_owned(),
            message,
        }
        .emit();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Startup wiring for a [`SessionEngine`].
///
/// Defaults to [`SystemClock`] and [`RandomSessionIds`]; the background
/// tracker is created on [`build`](Self::build) and subscribed to the given
/// [`AppLifecycle`].
pub struct SessionEngineBuilder {
    config: SessionConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn SessionIdGenerator>>,
}

impl SessionEngineBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            clock: None,
            ids: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn SessionIdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self, lifecycle: &AppLifecycle) -> SessionEngine {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(RandomSessionIds::new()));
        let tracker = BackgroundTimeoutTracker::register(
            lifecycle,
            clock.clone(),
            self.config.background_inactivity_timeout(),
        );

        tracing::info!(
            background_inactivity_timeout_secs = self.config.background_inactivity_timeout_secs,
            max_lifetime_secs = self.config.max_lifetime_secs,
            "session engine configured"
        );

        SessionEngine::new(&self.config, clock, ids, tracker)
    }
}
