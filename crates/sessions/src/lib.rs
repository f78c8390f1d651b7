//! Session lifecycle for telemetry correlation.
//!
//! A [`SessionEngine`] hands out the id of the current session to every
//! telemetry producer that asks for it, and rotates that id when the
//! application has been backgrounded for too long or the session has
//! outlived its maximum lifetime.  Rotations are reported to registered
//! [`SessionObserver`]s as one `ended` followed by one `started` event.
//!
//! Everything is wired explicitly at startup: the clock, id generator,
//! foreground/background signal source and policy are constructed once and
//! handed to the engine.

pub mod clock;
pub mod engine;
pub mod id;
pub mod lifecycle;
pub mod observer;
pub mod session;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{NoopSessionProvider, SessionEngine, SessionEngineBuilder, SessionProvider};
pub use id::{RandomSessionIds, SessionIdGenerator};
pub use lifecycle::{AppLifecycle, ApplicationStateListener};
pub use observer::{SessionEventsObserver, SessionObserver};
pub use session::{RotationReason, Session};
pub use tracker::{BackgroundTimeoutTracker, TimeoutTracker};
