use std::path::{Path, PathBuf};

/// Default location of Linux backlight devices.
pub const DEFAULT_BACKLIGHT_ROOT: &str = "/sys/class/backlight";

/// Configuration for a [`BrightnessMonitor`](crate::BrightnessMonitor).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Per-subscriber buffer size. `None` is unbounded; with `Some(n)` the
    /// newest values are dropped once a slow subscriber has `n` pending.
    pub channel_capacity: Option<usize>,
    /// Directory holding backlight devices (Linux only).
    pub backlight_root: PathBuf,
    /// Backlight device name under [`backlight_root`](Self::backlight_root).
    /// `None` picks the first device, by name, exposing `brightness`.
    pub backlight_device: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: None,
            backlight_root: PathBuf::from(DEFAULT_BACKLIGHT_ROOT),
            backlight_device: None,
        }
    }
}

impl MonitorConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-subscriber buffer size.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: Option<usize>) -> Self {
        self.channel_capacity = capacity.map(|n| n.max(1));
        self
    }

    /// Set the directory holding backlight devices.
    #[must_use]
    pub fn backlight_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.backlight_root = root.into();
        self
    }

    /// Pin a specific backlight device.
    #[must_use]
    pub fn backlight_device(mut self, name: impl Into<String>) -> Self {
        self.backlight_device = Some(name.into());
        self
    }

    /// The configured backlight root.
    #[must_use]
    pub fn backlight_root_path(&self) -> &Path {
        &self.backlight_root
    }
}
