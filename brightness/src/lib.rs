//! # brightkit-brightness
//!
//! Read the system screen brightness and observe changes through the
//! platform's own notification mechanism.
//!
//! Part of the `Brightkit` family, this crate offers one facade,
//! [`BrightnessMonitor`], over a native backend per platform:
//!
//! - **Android**: `Settings.System.SCREEN_BRIGHTNESS`, observed with a
//!   `ContentObserver`.
//! - **iOS**: `UIScreen.main.brightness`, observed through
//!   `UIScreen.brightnessDidChangeNotification`.
//! - **Linux**: the sysfs backlight class, observed with inotify.
//!
//! Values are integers in `0..=255`, or `-1` ([`BrightnessValue::UNREADABLE`])
//! when the platform cannot report one.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use brightkit_brightness::BrightnessMonitor;
//! use futures::StreamExt;
//!
//! # async fn run() -> Result<(), brightkit_brightness::Error> {
//! let monitor = BrightnessMonitor::new()?;
//! println!("brightness: {}", monitor.brightness());
//!
//! let mut changes = monitor.changes()?;
//! if let Some(value) = changes.next().await {
//!     println!("changed to {value}");
//! }
//! monitor.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Specifics
//!
//! ### Android
//! Initialize the library with a `Context` before creating a monitor:
//!
//! ```rust,ignore
//! #[unsafe(no_mangle)]
//! pub extern "system" fn Java_com_example_MainActivity_initBrightness(
//!     mut env: jni::JNIEnv,
//!     _: jni::objects::JClass,
//!     context: jni::objects::JObject,
//! ) {
//!     brightkit_brightness::init(&mut env, &context).unwrap();
//! }
//! ```
//!
//! ### Other targets
//! macOS, Windows and the remaining targets have no backend;
//! [`BrightnessMonitor::new`] returns [`Error::UnsupportedPlatform`].

mod config;
mod error;
mod monitor;
mod source;
mod sys;
mod value;

pub mod sim;

pub use config::{DEFAULT_BACKLIGHT_ROOT, MonitorConfig};
pub use error::{Error, Result};
pub use monitor::{BrightnessChanges, BrightnessMonitor};
pub use source::{
    Backend, BrightnessCallback, BrightnessSource, ChangeHandler, Registration, SessionState,
};
pub use sys::{Platform, default_backend};
pub use value::BrightnessValue;

#[cfg(target_os = "linux")]
pub use sys::linux::SysfsBacklight;

/// Initialize the brightness subsystem for Android.
///
/// This must be called from JNI with a valid `Context` before any monitor is
/// created.
///
/// # Errors
///
/// Returns [`Error::Platform`] if the JVM or context cannot be captured, or
/// if the embedded observer class fails to load.
#[cfg(target_os = "android")]
pub fn init(env: &mut jni::JNIEnv, context: &jni::objects::JObject) -> Result<()> {
    sys::android::init(env, context)
}
