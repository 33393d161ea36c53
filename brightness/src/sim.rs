//! An in-process backend that behaves like the Android settings store.
//!
//! Useful for testing code that consumes [`BrightnessMonitor`](crate::BrightnessMonitor)
//! without a device: set or unset the brightness setting, fire change
//! notifications, and inspect how many native observers were registered.
//!
//! ```
//! use std::sync::Arc;
//! use brightkit_brightness::{BrightnessMonitor, MonitorConfig, sim::SimulatedBackend};
//!
//! let backend = Arc::new(SimulatedBackend::with_value(128));
//! let monitor = BrightnessMonitor::with_backend(backend.clone(), MonitorConfig::default());
//! assert_eq!(monitor.brightness().get(), 128);
//!
//! backend.unset();
//! assert_eq!(monitor.brightness().get(), -1);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use log::debug;

use crate::{Backend, BrightnessValue, ChangeHandler, Error, Registration, Result};

#[derive(Debug, Default)]
struct SimState {
    setting: Option<i32>,
    observers: Vec<(u64, ChangeHandler)>,
    next_id: u64,
    register_calls: usize,
    unregister_calls: usize,
    max_live: usize,
    fail_next_register: bool,
}

/// Simulated brightness backend.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    /// A backend whose setting is absent, so reads are unreadable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose setting holds `value`.
    #[must_use]
    pub fn with_value(value: i32) -> Self {
        let backend = Self::new();
        backend.set(value);
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().expect("simulated backend mutex poisoned")
    }

    /// Store a new setting value. Observers are not notified; call
    /// [`notify`](Self::notify) for that.
    pub fn set(&self, value: i32) {
        self.lock().setting = Some(value);
    }

    /// Remove the setting.
    pub fn unset(&self) {
        self.lock().setting = None;
    }

    /// Fire a change notification at every live observer.
    pub fn notify(&self) {
        let handlers = self.handlers();
        for handler in handlers {
            handler.notify();
        }
    }

    /// Store `value` and notify observers.
    pub fn change(&self, value: i32) {
        self.set(value);
        self.notify();
    }

    /// Handlers of the live observers, as the platform would hold them.
    #[must_use]
    pub fn handlers(&self) -> Vec<ChangeHandler> {
        self.lock()
            .observers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect()
    }

    /// Successful registrations so far.
    #[must_use]
    pub fn register_calls(&self) -> usize {
        self.lock().register_calls
    }

    /// Unregistrations so far.
    #[must_use]
    pub fn unregister_calls(&self) -> usize {
        self.lock().unregister_calls
    }

    /// Observers currently registered.
    #[must_use]
    pub fn live_registrations(&self) -> usize {
        self.lock().observers.len()
    }

    /// The largest number of observers that were ever live at once.
    #[must_use]
    pub fn max_live_registrations(&self) -> usize {
        self.lock().max_live
    }

    /// Make the next registration attempt fail.
    pub fn fail_next_register(&self) {
        self.lock().fail_next_register = true;
    }
}

impl Backend for SimulatedBackend {
    fn read(&self) -> BrightnessValue {
        self.lock()
            .setting
            .map_or(BrightnessValue::UNREADABLE, |raw| {
                BrightnessValue::from_raw(i64::from(raw))
            })
    }

    fn register(&self, handler: ChangeHandler) -> Result<Box<dyn Registration>> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_register) {
            return Err(Error::Platform("simulated registration failure".into()));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.observers.push((id, handler));
        state.register_calls += 1;
        state.max_live = state.max_live.max(state.observers.len());
        debug!("simulated observer {id} registered");

        Ok(Box::new(SimulatedRegistration {
            id,
            state: Arc::downgrade(&self.state),
        }))
    }
}

struct SimulatedRegistration {
    id: u64,
    state: Weak<Mutex<SimState>>,
}

impl fmt::Debug for SimulatedRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedRegistration")
            .field("id", &self.id)
            .finish()
    }
}

impl Registration for SimulatedRegistration {
    fn unregister(self: Box<Self>) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock().expect("simulated backend mutex poisoned");
        state.observers.retain(|(id, _)| *id != self.id);
        state.unregister_calls += 1;
        debug!("simulated observer {} unregistered", self.id);
    }
}
