use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use sk_domain::config::SessionConfig;
use sk_sessions::{
    AppLifecycle, BackgroundTimeoutTracker, ManualClock, RandomSessionIds, Session,
    SessionEngine, SessionObserver, TimeoutTracker,
};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Records every callback from every observer into one shared timeline.
#[derive(Clone)]
struct Recorder {
    name: &'static str,
    timeline: Arc<Mutex<Vec<String>>>,
}

impl SessionObserver for Recorder {
    fn on_session_started(&self, new: &Session, previous: &Session) {
        self.timeline
            .lock()
            .push(format!("{}:start:{}:{}", self.name, new.id(), previous.id()));
    }

    fn on_session_ended(&self, ended: &Session) {
        self.timeline
            .lock()
            .push(format!("{}:end:{}", self.name, ended.id()));
    }
}

/// Wraps the real tracker and counts bumps.
struct CountingTracker {
    inner: Arc<BackgroundTimeoutTracker>,
    bumps: AtomicUsize,
}

impl TimeoutTracker for CountingTracker {
    fn bump(&self) {
        self.bumps.fetch_add(1, Ordering::SeqCst);
        self.inner.bump();
    }

    fn has_timed_out(&self) -> bool {
        self.inner.has_timed_out()
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    lifecycle: AppLifecycle,
    tracker: Arc<CountingTracker>,
    engine: Arc<SessionEngine>,
}

fn harness() -> Harness {
    harness_with(SessionConfig::default())
}

fn harness_with(config: SessionConfig) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let lifecycle = AppLifecycle::new();
    let inner = BackgroundTimeoutTracker::register(
        &lifecycle,
        clock.clone(),
        config.background_inactivity_timeout(),
    );
    let tracker = Arc::new(CountingTracker {
        inner,
        bumps: AtomicUsize::new(0),
    });
    let engine = Arc::new(SessionEngine::new(
        &config,
        clock.clone(),
        Arc::new(RandomSessionIds::new()),
        tracker.clone(),
    ));
    Harness {
        clock,
        lifecycle,
        tracker,
        engine,
    }
}

#[test]
fn id_is_stable_within_windows() {
    let h = harness();
    let first = h.engine.get_session_id();
    for _ in 0..20 {
        h.clock.advance(10 * MINUTE);
        assert_eq!(h.engine.get_session_id(), first);
    }
    assert_eq!(h.engine.get_session_id(), h.engine.get_session_id());
}

#[test]
fn four_hour_scenario() {
    let h = harness();
    let timeline = Arc::new(Mutex::new(Vec::new()));
    h.engine.add_observer(Arc::new(Recorder {
        name: "o",
        timeline: timeline.clone(),
    }));

    let s1 = h.engine.get_session_id();
    h.clock.advance(3 * HOUR + 59 * MINUTE + Duration::from_secs(59));
    assert_eq!(h.engine.get_session_id(), s1);

    h.clock.advance(Duration::from_secs(2));
    let s2 = h.engine.get_session_id();
    assert_ne!(s2, s1);

    assert_eq!(
        *timeline.lock(),
        vec![format!("o:end:{s1}"), format!("o:start:{s2}:{s1}")]
    );
}

#[test]
fn max_lifetime_rotation_ignores_foreground_activity() {
    let h = harness();
    let first = h.engine.get_session_id();
    // Constant foreground activity every minute.
    for _ in 0..(4 * 60) {
        h.clock.advance(MINUTE);
        assert_eq!(h.engine.get_session_id(), first);
    }
    h.clock.advance(Duration::from_millis(1));
    assert_ne!(h.engine.get_session_id(), first);
}

#[test]
fn background_timeout_rotates_on_next_access() {
    let h = harness();
    let first = h.engine.get_session_id();

    h.lifecycle.backgrounded();
    h.clock.advance(16 * MINUTE);
    h.lifecycle.foregrounded();

    let second = h.engine.get_session_id();
    assert_ne!(second, first);

    // Back in the foreground: no further timeout-driven rotation.
    h.clock.advance(30 * MINUTE);
    assert_eq!(h.engine.get_session_id(), second);
}

#[test]
fn short_background_keeps_session() {
    let h = harness();
    let first = h.engine.get_session_id();
    h.lifecycle.backgrounded();
    h.clock.advance(14 * MINUTE);
    h.lifecycle.foregrounded();
    assert_eq!(h.engine.get_session_id(), first);
}

#[test]
fn access_while_backgrounded_extends_idle_window() {
    let h = harness();
    let first = h.engine.get_session_id();
    h.lifecycle.backgrounded();
    for _ in 0..5 {
        h.clock.advance(10 * MINUTE);
        assert_eq!(h.engine.get_session_id(), first);
    }
    h.clock.advance(16 * MINUTE);
    assert_ne!(h.engine.get_session_id(), first);
}

#[test]
fn lifetime_shorter_than_timeout_still_rotates() {
    let h = harness_with(SessionConfig::new(15 * MINUTE, 5 * MINUTE));
    let first = h.engine.get_session_id();

    h.lifecycle.backgrounded();
    h.clock.advance(6 * MINUTE);
    h.lifecycle.foregrounded();
    // Background idle is under the timeout; the lifetime has run out.
    assert!(!h.tracker.has_timed_out());
    let second = h.engine.get_session_id();
    assert_ne!(second, first);

    h.clock.advance(4 * MINUTE);
    assert_eq!(h.engine.get_session_id(), second);
}

#[test]
fn zero_lifetime_gives_each_instant_its_own_session() {
    let h = harness_with(SessionConfig::new(15 * MINUTE, Duration::ZERO));
    let first = h.engine.get_session_id();
    assert_eq!(h.engine.get_session_id(), first);

    h.clock.advance(Duration::from_millis(1));
    let second = h.engine.get_session_id();
    assert_ne!(second, first);
    assert_eq!(h.engine.get_session_id(), second);
}

#[test]
fn every_access_bumps_exactly_once() {
    let h = harness();
    let mut calls = 0;

    h.engine.get_session_id();
    calls += 1;
    h.clock.advance(MINUTE);
    h.engine.get_session_id();
    calls += 1;

    // Rotation by background timeout.
    h.lifecycle.backgrounded();
    h.clock.advance(20 * MINUTE);
    h.engine.get_session_id();
    calls += 1;

    // Rotation by max lifetime.
    h.lifecycle.foregrounded();
    h.clock.advance(5 * HOUR);
    h.engine.get_session_id();
    calls += 1;

    assert_eq!(h.tracker.bumps.load(Ordering::SeqCst), calls);
}

#[test]
fn observers_see_all_ends_before_any_start() {
    let h = harness();
    let timeline = Arc::new(Mutex::new(Vec::new()));
    for name in ["a", "b", "c"] {
        h.engine.add_observer(Arc::new(Recorder {
            name,
            timeline: timeline.clone(),
        }));
    }

    let mut ids = vec![h.engine.get_session_id()];
    for _ in 0..3 {
        h.clock.advance(4 * HOUR + MINUTE);
        ids.push(h.engine.get_session_id());
    }

    let mut expected = Vec::new();
    for pair in ids.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        for name in ["a", "b", "c"] {
            expected.push(format!("{name}:end:{prev}"));
        }
        for name in ["a", "b", "c"] {
            expected.push(format!("{name}:start:{next}:{prev}"));
        }
    }
    assert_eq!(*timeline.lock(), expected);
}

#[test]
fn first_session_is_never_announced() {
    let h = harness();
    let timeline = Arc::new(Mutex::new(Vec::new()));
    let first = h.engine.get_session_id();
    h.engine.add_observer(Arc::new(Recorder {
        name: "late",
        timeline: timeline.clone(),
    }));
    assert_eq!(h.engine.get_session_id(), first);
    assert!(timeline.lock().is_empty());

    h.clock.advance(5 * HOUR);
    let second = h.engine.get_session_id();
    assert_eq!(
        *timeline.lock(),
        vec![
            format!("late:end:{first}"),
            format!("late:start:{second}:{first}")
        ]
    );
}

#[test]
fn concurrent_callers_past_boundary_rotate_once() {
    const THREADS: usize = 16;

    let h = harness();
    let timeline = Arc::new(Mutex::new(Vec::new()));
    h.engine.add_observer(Arc::new(Recorder {
        name: "o",
        timeline: timeline.clone(),
    }));

    let first = h.engine.get_session_id();
    h.clock.advance(4 * HOUR + MINUTE);

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = h.engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.get_session_id()
            })
        })
        .collect();

    let seen: Vec<String> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    let second = seen[0].clone();
    assert_ne!(second, first);
    assert!(seen.iter().all(|id| *id == second));

    assert_eq!(
        *timeline.lock(),
        vec![format!("o:end:{first}"), format!("o:start:{second}:{first}")]
    );
}

#[test]
fn registering_during_notification_is_safe() {
    struct Registrar {
        engine: Mutex<Option<Arc<SessionEngine>>>,
        added: AtomicUsize,
    }

    impl SessionObserver for Registrar {
        fn on_session_started(&self, _: &Session, _: &Session) {}

        fn on_session_ended(&self, _: &Session) {
            let engine = self.engine.lock().clone();
            if let Some(engine) = engine {
                engine.add_observer(Arc::new(Recorder {
                    name: "late",
                    timeline: Arc::new(Mutex::new(Vec::new())),
                }));
                self.added.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let h = harness();
    let registrar = Arc::new(Registrar {
        engine: Mutex::new(Some(h.engine.clone())),
        added: AtomicUsize::new(0),
    });
    h.engine.add_observer(registrar.clone());

    h.engine.get_session_id();
    h.clock.advance(5 * HOUR);
    h.engine.get_session_id();

    assert_eq!(registrar.added.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine.observer_count(), 2);
    registrar.engine.lock().take();
}
