//! # Brightkit
//!
//! Cross-platform access to the system screen brightness: read the current
//! level and observe changes through the platform's own notification APIs.
//!
//! Brightkit is modular in the same way as its sibling kits. Each capability
//! lives in its own crate and is re-exported here behind a Cargo feature.
//!
//! - `brightness` (default): brightness reads and change streams on Android,
//!   iOS and Linux.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! brightkit = { version = "0.1", features = ["brightness"] }
//! ```
//!
//! ```rust,no_run
//! use brightkit::brightness::BrightnessMonitor;
//! use futures::StreamExt;
//!
//! async fn follow() -> Result<(), brightkit::brightness::Error> {
//!     let monitor = BrightnessMonitor::new()?;
//!     println!("now: {}", monitor.brightness());
//!
//!     let mut changes = monitor.changes()?;
//!     while let Some(value) = changes.next().await {
//!         println!("changed: {value}");
//!     }
//!     Ok(())
//! }
//! ```

#[cfg(feature = "brightness")]
pub use brightkit_brightness as brightness;
