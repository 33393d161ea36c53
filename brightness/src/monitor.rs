//! The platform-independent facade applications hold.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_channel::{Receiver, Sender, TrySendError};
use futures::Stream;
use log::{debug, info, warn};

use crate::{
    Backend, BrightnessCallback, BrightnessSource, BrightnessValue, MonitorConfig, Result, sys,
};

/// Fans one native callback out to every subscriber channel.
#[derive(Default)]
struct Fanout {
    senders: Mutex<Vec<(u64, Sender<BrightnessValue>)>>,
}

impl Fanout {
    fn senders(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Sender<BrightnessValue>)>> {
        self.senders.lock().expect("subscriber list mutex poisoned")
    }
}

impl BrightnessCallback for Fanout {
    fn on_brightness_changed(&self, value: BrightnessValue) {
        for (id, sender) in self.senders().iter() {
            match sender.try_send(value) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("subscriber {id} is full, dropping brightness {value}");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("subscriber {id} already closed");
                }
            }
        }
    }
}

#[derive(Default)]
struct FacadeState {
    next_id: u64,
    // The callback registered with the source. Present exactly while
    // observing and owns every subscriber sender.
    relay: Option<Arc<Fanout>>,
}

struct Shared {
    source: BrightnessSource,
    state: Mutex<FacadeState>,
    disposed: AtomicBool,
    channel_capacity: Option<usize>,
}

impl Shared {
    fn state(&self) -> std::sync::MutexGuard<'_, FacadeState> {
        self.state.lock().expect("facade state mutex poisoned")
    }

    fn subscribe(self: &Arc<Self>) -> Result<BrightnessChanges> {
        let mut state = self.state();
        let (sender, receiver) = match self.channel_capacity {
            Some(capacity) => async_channel::bounded(capacity.max(1)),
            None => async_channel::unbounded(),
        };
        let id = state.next_id;
        state.next_id += 1;

        if let Some(relay) = &state.relay {
            relay.senders().push((id, sender));
        } else {
            let relay = Arc::new(Fanout::default());
            relay.senders().push((id, sender));
            self.source.start_observing(relay.clone())?;
            state.relay = Some(relay);
            info!("brightness observation started");
        }

        debug!("brightness subscriber {id} attached");
        Ok(BrightnessChanges {
            id,
            receiver: Box::pin(receiver),
            shared: self.clone(),
        })
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.state();
        let empty = state.relay.as_ref().is_some_and(|relay| {
            let mut senders = relay.senders();
            senders.retain(|(other, _)| *other != id);
            senders.is_empty()
        });
        debug!("brightness subscriber {id} detached");

        if empty {
            state.relay = None;
            self.source.stop_observing();
            info!("brightness observation stopped");
        }
    }

    fn subscriber_count(&self) -> usize {
        self.state()
            .relay
            .as_ref()
            .map_or(0, |relay| relay.senders().len())
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut state = self.state();
        self.source.stop_observing();
        // Dropping the relay drops its senders, which closes every channel
        // and wakes pending readers.
        state.relay = None;
        info!("brightness monitor disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Cross-platform brightness monitor.
///
/// Reads go straight to the platform. Change observation starts with the
/// first [`changes`](Self::changes) subscriber and stops when the last one is
/// dropped, so an idle monitor holds no native observer.
///
/// Dropping the monitor has the same effect as [`dispose`](Self::dispose).
pub struct BrightnessMonitor {
    shared: Arc<Shared>,
}

impl BrightnessMonitor {
    /// Create a monitor for the current platform with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`](crate::Error::UnsupportedPlatform)
    /// when no backend exists for this target, or [`Error::Platform`](crate::Error::Platform)
    /// when the platform glue is not initialised.
    pub fn new() -> Result<Self> {
        Self::with_config(MonitorConfig::default())
    }

    /// Create a monitor for the current platform.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_config(config: MonitorConfig) -> Result<Self> {
        let backend = sys::default_backend(&config)?;
        Ok(Self::with_backend(backend, config))
    }

    /// Create a monitor over an explicit backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn Backend>, config: MonitorConfig) -> Self {
        debug!("brightness monitor using {backend:?}");
        Self {
            shared: Arc::new(Shared {
                source: BrightnessSource::new(backend),
                state: Mutex::new(FacadeState::default()),
                disposed: AtomicBool::new(false),
                channel_capacity: config.channel_capacity,
            }),
        }
    }

    /// The current system brightness. Not cached.
    #[must_use]
    pub fn brightness(&self) -> BrightnessValue {
        self.shared.source.read()
    }

    /// Subscribe to brightness changes.
    ///
    /// Every subscriber sees every value the platform delivers, unchanged.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if this is the first subscriber and the
    /// native observer could not be registered.
    pub fn changes(&self) -> Result<BrightnessChanges> {
        self.shared.subscribe()
    }

    /// Number of live [`BrightnessChanges`] streams.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscriber_count()
    }

    /// Whether a native observer is currently registered.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.shared.source.is_observing()
    }

    /// Stop observing and end every outstanding [`BrightnessChanges`] stream.
    ///
    /// Streams return `None` from then on, even if values were still queued.
    pub fn dispose(self) {
        self.shared.dispose();
    }
}

impl fmt::Debug for BrightnessMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrightnessMonitor")
            .field("source", &self.shared.source)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Drop for BrightnessMonitor {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

/// A stream of brightness changes from a [`BrightnessMonitor`].
///
/// Dropping the stream unsubscribes it.
pub struct BrightnessChanges {
    id: u64,
    receiver: Pin<Box<Receiver<BrightnessValue>>>,
    shared: Arc<Shared>,
}

impl Stream for BrightnessChanges {
    type Item = BrightnessValue;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.shared.is_disposed() {
            return Poll::Ready(None);
        }
        self.receiver.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for BrightnessChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrightnessChanges")
            .field("id", &self.id)
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl Drop for BrightnessChanges {
    fn drop(&mut self) {
        self.shared.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use futures::executor::block_on;

    use super::BrightnessMonitor;
    use crate::MonitorConfig;
    use crate::sim::SimulatedBackend;

    #[test]
    fn relay_exists_only_while_observing() {
        let backend = Arc::new(SimulatedBackend::with_value(10));
        let monitor = BrightnessMonitor::with_backend(backend.clone(), MonitorConfig::default());
        assert!(monitor.shared.state().relay.is_none());

        let changes = monitor.changes().unwrap();
        assert!(monitor.shared.state().relay.is_some());

        drop(changes);
        assert!(monitor.shared.state().relay.is_none());
    }

    #[test]
    fn dispose_releases_relay_while_streams_are_alive() {
        let backend = Arc::new(SimulatedBackend::with_value(10));
        let monitor = BrightnessMonitor::with_backend(backend.clone(), MonitorConfig::default());
        let mut changes = monitor.changes().unwrap();
        let relay = Arc::downgrade(
            monitor
                .shared
                .state()
                .relay
                .as_ref()
                .expect("observing after first subscriber"),
        );
        let shared = monitor.shared.clone();

        monitor.dispose();
        assert!(relay.upgrade().is_none());
        assert_eq!(shared.subscriber_count(), 0);
        assert_eq!(block_on(changes.next()), None);
    }
}
