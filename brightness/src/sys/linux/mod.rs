//! Linux brightness backend using the sysfs backlight class.
//!
//! Reads `brightness` and `max_brightness` from a device under
//! `/sys/class/backlight` and scales them to `0..=255`. Changes are observed
//! with an inotify watch serviced by a dedicated thread: writes to
//! `brightness` and kernel `sysfs_notify` calls on `actual_brightness` both
//! surface as `MODIFY` events.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use log::{debug, warn};

use crate::{Backend, BrightnessValue, ChangeHandler, Error, MonitorConfig, Registration, Result};

const BRIGHTNESS: &str = "brightness";
const ACTUAL_BRIGHTNESS: &str = "actual_brightness";
const MAX_BRIGHTNESS: &str = "max_brightness";

/// Backlight device exposed through sysfs.
///
/// The device is resolved on every call, so a backlight that appears after
/// construction is picked up and a missing one reads as unreadable.
#[derive(Debug, Clone)]
pub struct SysfsBacklight {
    root: PathBuf,
    device: Option<String>,
}

impl SysfsBacklight {
    /// Use `device` under `root`, or the first device by name when `None`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, device: Option<String>) -> Self {
        Self {
            root: root.into(),
            device,
        }
    }

    /// Build from the backlight settings of a [`MonitorConfig`].
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.backlight_root.clone(), config.backlight_device.clone())
    }

    /// The device directory in use, if one exists.
    #[must_use]
    pub fn device_dir(&self) -> Option<PathBuf> {
        if let Some(name) = &self.device {
            let dir = self.root.join(name);
            return dir.join(BRIGHTNESS).exists().then_some(dir);
        }

        let mut devices: Vec<PathBuf> = fs::read_dir(&self.root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.join(BRIGHTNESS).exists())
            .collect();
        devices.sort();
        devices.into_iter().next()
    }
}

fn read_number(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

impl Backend for SysfsBacklight {
    fn read(&self) -> BrightnessValue {
        let Some(dir) = self.device_dir() else {
            return BrightnessValue::UNREADABLE;
        };
        match (
            read_number(&dir.join(BRIGHTNESS)),
            read_number(&dir.join(MAX_BRIGHTNESS)),
        ) {
            (Some(current), Some(max)) => BrightnessValue::from_ratio(current, max),
            _ => BrightnessValue::UNREADABLE,
        }
    }

    fn register(&self, handler: ChangeHandler) -> Result<Box<dyn Registration>> {
        let dir = self.device_dir().ok_or_else(|| {
            Error::Platform(format!("no backlight device under {}", self.root.display()))
        })?;

        let inotify = Inotify::init()?;
        let mut watches = inotify.watches();
        let mut descriptors = vec![watches.add(dir.join(BRIGHTNESS), WatchMask::MODIFY)?];
        let actual = dir.join(ACTUAL_BRIGHTNESS);
        if actual.exists() {
            descriptors.push(watches.add(actual, WatchMask::MODIFY)?);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        thread::Builder::new()
            .name("brightkit-backlight".into())
            .spawn({
                let descriptors = descriptors.clone();
                move || watch_loop(inotify, descriptors, &handler, &thread_stop)
            })?;

        debug!("watching backlight {}", dir.display());
        Ok(Box::new(InotifyRegistration {
            dir,
            watches,
            descriptors,
            stop,
        }))
    }
}

// Runs until the registration is stopped or every watch is gone. A watch
// whose file disappears is dropped by the kernel with IN_IGNORED; the
// remaining ones keep delivering.
fn watch_loop(
    mut inotify: Inotify,
    mut live: Vec<WatchDescriptor>,
    handler: &ChangeHandler,
    stop: &AtomicBool,
) {
    let mut buffer = [0u8; 1024];
    loop {
        let events = match inotify.read_events_blocking(&mut buffer) {
            Ok(events) => events,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("backlight watch failed: {err}");
                return;
            }
        };

        let mut changed = false;
        for event in events {
            changed |= event.mask.contains(EventMask::MODIFY);
            if event.mask.contains(EventMask::IGNORED) {
                live.retain(|wd| *wd != event.wd);
            }
        }

        if stop.load(Ordering::Acquire) {
            debug!("backlight watch thread exiting");
            return;
        }
        if live.is_empty() {
            warn!("every backlight watch was removed, no further changes will arrive");
            return;
        }
        if changed {
            handler.notify();
        }
    }
}

struct InotifyRegistration {
    dir: PathBuf,
    watches: Watches,
    descriptors: Vec<WatchDescriptor>,
    stop: Arc<AtomicBool>,
}

impl fmt::Debug for InotifyRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InotifyRegistration")
            .field("dir", &self.dir)
            .field("watches", &self.descriptors.len())
            .finish()
    }
}

impl Registration for InotifyRegistration {
    fn unregister(self: Box<Self>) {
        let Self {
            mut watches,
            descriptors,
            stop,
            dir,
        } = *self;
        stop.store(true, Ordering::Release);
        // Removing a watch queues IN_IGNORED, which wakes the watch thread.
        for descriptor in descriptors {
            if let Err(err) = watches.remove(descriptor) {
                debug!("backlight watch on {} already gone: {err}", dir.display());
            }
        }
    }
}
