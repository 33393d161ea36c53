//! iOS brightness backend using swift-bridge.
//!
//! `UIScreen.main.brightness` is a fraction in `0.0...1.0`; changes arrive as
//! `UIScreen.brightnessDidChangeNotification` on the main queue. Swift keeps
//! one `NotificationCenter` token per observer id and calls back into
//! [`on_brightness_changed`] with that id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use log::debug;

use crate::{Backend, BrightnessValue, ChangeHandler, Registration, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn handlers() -> &'static Mutex<HashMap<u64, ChangeHandler>> {
    static LOCK: OnceLock<Mutex<HashMap<u64, ChangeHandler>>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(HashMap::new()))
}

#[swift_bridge::bridge]
mod ffi {
    extern "Swift" {
        fn screen_brightness() -> f32;
        fn start_brightness_observer(observer_id: u64);
        fn stop_brightness_observer(observer_id: u64);
    }

    extern "Rust" {
        fn on_brightness_changed(observer_id: u64);
    }
}

fn on_brightness_changed(observer_id: u64) {
    let handler = handlers()
        .lock()
        .expect("handler map mutex poisoned")
        .get(&observer_id)
        .cloned();

    match handler {
        Some(handler) => handler.notify(),
        None => debug!("brightness change for retired observer {observer_id}"),
    }
}

/// Brightness backend over `UIScreen`.
#[derive(Debug, Default)]
pub struct ScreenBackend;

impl ScreenBackend {
    pub const fn new() -> Self {
        Self
    }
}

impl Backend for ScreenBackend {
    fn read(&self) -> BrightnessValue {
        BrightnessValue::from_fraction(ffi::screen_brightness())
    }

    fn register(&self, handler: ChangeHandler) -> Result<Box<dyn Registration>> {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        handlers()
            .lock()
            .expect("handler map mutex poisoned")
            .insert(id, handler);
        ffi::start_brightness_observer(id);
        debug!("brightness observer {id} registered");
        Ok(Box::new(ObserverRegistration { id }))
    }
}

#[derive(Debug)]
struct ObserverRegistration {
    id: u64,
}

impl Registration for ObserverRegistration {
    fn unregister(self: Box<Self>) {
        handlers()
            .lock()
            .expect("handler map mutex poisoned")
            .remove(&self.id);
        ffi::stop_brightness_observer(self.id);
        debug!("brightness observer {} removed", self.id);
    }
}
