//! The native brightness source and its single observation slot.
//!
//! A [`BrightnessSource`] drives a platform [`Backend`]. It holds at most one
//! registration together with the callback it feeds. Starting again replaces
//! the pair instead of stacking a second observer, and stopping clears both.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use log::{debug, warn};

use crate::{BrightnessValue, Result};

/// Receives brightness change notifications.
///
/// Implemented for every `Fn(BrightnessValue) + Send + Sync` closure.
pub trait BrightnessCallback: Send + Sync {
    /// Called with a fresh read each time the platform reports a change.
    fn on_brightness_changed(&self, value: BrightnessValue);
}

impl<F> BrightnessCallback for F
where
    F: Fn(BrightnessValue) + Send + Sync,
{
    fn on_brightness_changed(&self, value: BrightnessValue) {
        self(value);
    }
}

/// A live native observer.
pub trait Registration: Send + fmt::Debug {
    /// Detach the observer from the platform. Called exactly once.
    fn unregister(self: Box<Self>);
}

/// Platform hooks behind a [`BrightnessSource`].
pub trait Backend: Send + Sync + fmt::Debug {
    /// Read the current system brightness. Must not fail or block for long.
    fn read(&self) -> BrightnessValue;

    /// Install a native observer that calls [`ChangeHandler::notify`] on every
    /// system change notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the registration.
    fn register(&self, handler: ChangeHandler) -> Result<Box<dyn Registration>>;
}

/// The slot a single registration delivers through.
///
/// Cleared before its registration is removed, so deliveries that race with
/// teardown find it empty.
struct CallbackSlot {
    callback: Mutex<Option<Arc<dyn BrightnessCallback>>>,
}

impl CallbackSlot {
    fn new(callback: Arc<dyn BrightnessCallback>) -> Self {
        Self {
            callback: Mutex::new(Some(callback)),
        }
    }

    fn current(&self) -> Option<Arc<dyn BrightnessCallback>> {
        self.callback
            .lock()
            .expect("callback slot mutex poisoned")
            .clone()
    }

    fn clear(&self) {
        self.callback
            .lock()
            .expect("callback slot mutex poisoned")
            .take();
    }
}

/// Handed to a [`Backend`] when registering; native observers call
/// [`notify`](Self::notify) whenever the platform reports a change.
#[derive(Clone)]
pub struct ChangeHandler {
    slot: Arc<CallbackSlot>,
    backend: Weak<dyn Backend>,
}

impl ChangeHandler {
    /// Deliver a fresh read to the registered callback.
    ///
    /// A no-op once the owning session was stopped or replaced.
    pub fn notify(&self) {
        let Some(callback) = self.slot.current() else {
            debug!("ignoring brightness notification for a stopped session");
            return;
        };
        let Some(backend) = self.backend.upgrade() else {
            return;
        };
        callback.on_brightness_changed(backend.read());
    }

    /// Whether the session this handler belongs to is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.current().is_some()
    }
}

impl fmt::Debug for ChangeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeHandler")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Observation state of a [`BrightnessSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No native observer is registered.
    Idle,
    /// Exactly one observer and its callback are live.
    Observing,
}

/// The registration and the callback it feeds. Both exist or neither does.
struct ActiveSession {
    registration: Box<dyn Registration>,
    slot: Arc<CallbackSlot>,
    // Owned for as long as the registration lives.
    callback: Arc<dyn BrightnessCallback>,
}

impl ActiveSession {
    fn teardown(self) {
        self.slot.clear();
        self.registration.unregister();
        drop(self.callback);
    }
}

/// Reads brightness from a backend and owns at most one observation session.
pub struct BrightnessSource {
    backend: Arc<dyn Backend>,
    session: Mutex<Option<ActiveSession>>,
}

impl BrightnessSource {
    /// Wrap a platform backend. The source starts `Idle`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            session: Mutex::new(None),
        }
    }

    /// Read the current brightness. Never fails; unreadable values are `-1`.
    #[must_use]
    pub fn read(&self) -> BrightnessValue {
        self.backend.read()
    }

    /// Start delivering changes to `callback`.
    ///
    /// An active session is fully torn down first, so the previous observer
    /// is unregistered before the new one is registered.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if registration fails. The source is left
    /// `Idle` in that case.
    pub fn start_observing(&self, callback: Arc<dyn BrightnessCallback>) -> Result<()> {
        let mut session = self.session.lock().expect("session mutex poisoned");
        if let Some(previous) = session.take() {
            debug!("replacing active brightness observer");
            previous.teardown();
        }

        let slot = Arc::new(CallbackSlot::new(callback.clone()));
        let handler = ChangeHandler {
            slot: slot.clone(),
            backend: Arc::downgrade(&self.backend),
        };

        match self.backend.register(handler) {
            Ok(registration) => {
                debug!("registered brightness observer {registration:?}");
                *session = Some(ActiveSession {
                    registration,
                    slot,
                    callback,
                });
                Ok(())
            }
            Err(err) => {
                slot.clear();
                warn!("failed to register brightness observer: {err}");
                Err(err)
            }
        }
    }

    /// Stop delivering changes. Idempotent.
    pub fn stop_observing(&self) {
        let mut session = self.session.lock().expect("session mutex poisoned");
        if let Some(previous) = session.take() {
            debug!("unregistering brightness observer");
            previous.teardown();
        }
    }

    /// Current observation state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.session.lock().expect("session mutex poisoned").is_some() {
            SessionState::Observing
        } else {
            SessionState::Idle
        }
    }

    /// Whether a native observer is registered.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.state() == SessionState::Observing
    }
}

impl fmt::Debug for BrightnessSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrightnessSource")
            .field("backend", &self.backend)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for BrightnessSource {
    fn drop(&mut self) {
        self.stop_observing();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{BrightnessCallback, BrightnessSource, SessionState};
    use crate::BrightnessValue;
    use crate::sim::SimulatedBackend;

    fn counting() -> (Arc<AtomicUsize>, Arc<dyn BrightnessCallback>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let callback = Arc::new(move |_: BrightnessValue| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (hits, callback)
    }

    #[test]
    fn starts_idle_and_reads() {
        let backend = Arc::new(SimulatedBackend::with_value(128));
        let source = BrightnessSource::new(backend.clone());
        assert_eq!(source.state(), SessionState::Idle);
        assert_eq!(source.read().get(), 128);
        assert_eq!(backend.register_calls(), 0);
    }

    #[test]
    fn delivers_fresh_read_at_notification_time() {
        let backend = Arc::new(SimulatedBackend::with_value(10));
        let source = BrightnessSource::new(backend.clone());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        source
            .start_observing(Arc::new(move |value: BrightnessValue| {
                sink.lock().unwrap().push(value.get());
            }))
            .unwrap();

        backend.set(200);
        backend.notify();
        backend.unset();
        backend.notify();

        assert_eq!(*seen.lock().unwrap(), vec![200, -1]);
        assert!(source.is_observing());
    }

    #[test]
    fn restart_replaces_instead_of_stacking() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let source = BrightnessSource::new(backend.clone());
        let (a_hits, a) = counting();
        let (b_hits, b) = counting();

        source.start_observing(a).unwrap();
        source.start_observing(b).unwrap();
        backend.notify();

        assert_eq!(a_hits.load(Ordering::SeqCst), 0);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
        assert_eq!(backend.live_registrations(), 1);
        assert_eq!(backend.register_calls(), 2);
        assert_eq!(backend.unregister_calls(), 1);
    }

    #[test]
    fn old_registration_is_removed_before_new_one_is_added() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let source = BrightnessSource::new(backend.clone());
        let (_, a) = counting();
        let (_, b) = counting();

        source.start_observing(a).unwrap();
        source.start_observing(b).unwrap();

        assert_eq!(backend.max_live_registrations(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let source = BrightnessSource::new(backend.clone());
        let (_, cb) = counting();
        source.start_observing(cb).unwrap();

        for _ in 0..3 {
            source.stop_observing();
        }

        assert_eq!(backend.unregister_calls(), 1);
        assert_eq!(source.state(), SessionState::Idle);
        assert_eq!(backend.live_registrations(), 0);
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let source = BrightnessSource::new(backend.clone());
        source.stop_observing();
        assert_eq!(backend.unregister_calls(), 0);
    }

    #[test]
    fn captured_handler_is_inert_after_stop() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let source = BrightnessSource::new(backend.clone());
        let (hits, cb) = counting();
        source.start_observing(cb).unwrap();
        let handlers = backend.handlers();

        source.stop_observing();
        for handler in &handlers {
            assert!(!handler.is_active());
            handler.notify();
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_registration_leaves_source_idle() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let source = BrightnessSource::new(backend.clone());
        let (hits, cb) = counting();
        source.start_observing(cb).unwrap();
        let stale = backend.handlers();

        backend.fail_next_register();
        let (_, replacement) = counting();
        assert!(source.start_observing(replacement).is_err());

        assert_eq!(source.state(), SessionState::Idle);
        assert_eq!(backend.live_registrations(), 0);
        stale[0].notify();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_releases_registration_and_callback() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let (_, cb) = counting();
        let weak = Arc::downgrade(&cb);
        {
            let source = BrightnessSource::new(backend.clone());
            source.start_observing(cb).unwrap();
            assert_eq!(backend.live_registrations(), 1);
        }
        assert_eq!(backend.live_registrations(), 0);
        assert_eq!(backend.unregister_calls(), 1);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn callback_may_stop_its_own_session() {
        let backend = Arc::new(SimulatedBackend::with_value(1));
        let source = Arc::new(BrightnessSource::new(backend.clone()));
        let weak = Arc::downgrade(&source);
        source
            .start_observing(Arc::new(move |_: BrightnessValue| {
                if let Some(source) = weak.upgrade() {
                    source.stop_observing();
                }
            }))
            .unwrap();

        backend.notify();

        assert_eq!(source.state(), SessionState::Idle);
        assert_eq!(backend.unregister_calls(), 1);
    }
}
