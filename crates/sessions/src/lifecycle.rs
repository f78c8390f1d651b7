//! Foreground/background signal dispatch.
//!
//! The host integration (UI framework hooks, OS notifications, …) reports
//! transitions to an [`AppLifecycle`], which fans them out to registered
//! listeners.  Repeated signals for the state the application is already in
//! are dropped, so listeners see exactly one callback per transition.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use sk_domain::trace::TraceEvent;

/// Receives application state transitions.
///
/// Callbacks run without any lifecycle lock held: a listener may query
/// [`AppLifecycle::is_foreground`] or send a further signal, which is
/// delivered after the current one.
pub trait ApplicationStateListener: Send + Sync {
    fn on_application_foregrounded(&self);
    fn on_application_backgrounded(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Foregrounded,
    Backgrounded,
}

/// Accepted transitions waiting for delivery.
#[derive(Default)]
struct Pending {
    queue: VecDeque<Signal>,
    /// Some thread is currently delivering the queue.
    draining: bool,
}

/// Dispatches application state transitions to listeners, in order.
///
/// Transitions are queued in the order they are accepted and delivered by
/// one thread at a time; a signal raised while another thread is
/// delivering is handed to that thread.
pub struct AppLifecycle {
    listeners: RwLock<Vec<Arc<dyn ApplicationStateListener>>>,
    foreground: AtomicBool,
    pending: Mutex<Pending>,
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl AppLifecycle {
    /// The application is assumed to start in the foreground.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            foreground: AtomicBool::new(true),
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn register(&self, listener: Arc<dyn ApplicationStateListener>) {
        self.listeners.write().push(listener);
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::Acquire)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Report that the application came to the foreground.
    pub fn foregrounded(&self) {
        self.signal(Signal::Foregrounded);
    }

    /// Report that the application went to the background.
    pub fn backgrounded(&self) {
        self.signal(Signal::Backgrounded);
    }

    fn signal(&self, signal: Signal) {
        let to_foreground = signal == Signal::Foregrounded;
        {
            let mut pending = self.pending.lock();
            // State flips under the queue lock so acceptance order and
            // delivery order agree.
            if self.foreground.swap(to_foreground, Ordering::AcqRel) == to_foreground {
                tracing::debug!(?signal, "duplicate lifecycle signal ignored");
                return;
            }
            pending.queue.push_back(signal);
            if pending.draining {
                return;
            }
            pending.draining = true;
        }

        let _reset = DrainReset(&self.pending);
        loop {
            let next = {
                let mut pending = self.pending.lock();
                match pending.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        pending.draining = false;
                        return;
                    }
                }
            };
            self.deliver(next);
        }
    }

    fn deliver(&self, signal: Signal) {
        let listeners = self.listeners.read().clone();
        match signal {
            Signal::Foregrounded => {
                TraceEvent::ApplicationForegrounded.emit();
                for listener in &listeners {
                    listener.on_application_foregrounded();
                }
            }
            Signal::Backgrounded => {
                TraceEvent::ApplicationBackgrounded.emit();
                for listener in &listeners {
                    listener.on_application_backgrounded();
                }
            }
        }
    }
}

/// Releases the delivery role if a listener panics mid-drain.
struct DrainReset<'a>(&'a Mutex<Pending>);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().draining = false;
        }
    }
}
