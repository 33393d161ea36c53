//! Platform-specific brightness backends.

use std::fmt;
use std::sync::Arc;

use log::info;

use crate::{Backend, MonitorConfig, Result};

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "ios")]
mod apple;

/// Linux platform implementation.
#[cfg(target_os = "linux")]
pub mod linux;

/// Targets with a native brightness backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `Settings.System` with a `ContentObserver`.
    Android,
    /// `UIScreen` with `NotificationCenter`.
    Ios,
    /// sysfs backlight with inotify.
    Linux,
}

impl Platform {
    /// The platform the crate was compiled for, if it has a backend.
    #[must_use]
    pub const fn current() -> Option<Self> {
        if cfg!(target_os = "android") {
            Some(Self::Android)
        } else if cfg!(target_os = "ios") {
            Some(Self::Ios)
        } else if cfg!(target_os = "linux") {
            Some(Self::Linux)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Linux => "linux",
        })
    }
}

/// Build the native backend for the running platform.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`](crate::Error::UnsupportedPlatform)
/// on targets without a backend.
pub fn default_backend(config: &MonitorConfig) -> Result<Arc<dyn Backend>> {
    let backend = platform_backend(config)?;
    if let Some(platform) = Platform::current() {
        info!("using {platform} brightness backend");
    }
    Ok(backend)
}

#[cfg(target_os = "android")]
fn platform_backend(_config: &MonitorConfig) -> Result<Arc<dyn Backend>> {
    Ok(Arc::new(android::SettingsBackend::new()?))
}

#[cfg(target_os = "ios")]
fn platform_backend(_config: &MonitorConfig) -> Result<Arc<dyn Backend>> {
    Ok(Arc::new(apple::ScreenBackend::new()))
}

#[cfg(target_os = "linux")]
fn platform_backend(config: &MonitorConfig) -> Result<Arc<dyn Backend>> {
    Ok(Arc::new(linux::SysfsBacklight::from_config(config)))
}

// Fallback for unsupported platforms
#[cfg(not(any(target_os = "android", target_os = "ios", target_os = "linux")))]
fn platform_backend(_config: &MonitorConfig) -> Result<Arc<dyn Backend>> {
    Err(crate::Error::UnsupportedPlatform(std::env::consts::OS))
}

#[cfg(test)]
mod tests {
    use super::{Platform, default_backend};
    use crate::MonitorConfig;

    #[test]
    fn current_platform_matches_backend_availability() {
        let result = default_backend(&MonitorConfig::default());
        match Platform::current() {
            Some(Platform::Linux) => assert!(result.is_ok()),
            None => assert!(matches!(
                result,
                Err(crate::Error::UnsupportedPlatform(_))
            )),
            // Mobile backends need host glue that unit tests do not provide.
            Some(_) => {}
        }
    }
}
