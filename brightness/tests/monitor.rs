//! Facade behaviour over the simulated backend.

use std::sync::Arc;
use std::time::Duration;

use brightkit_brightness::sim::SimulatedBackend;
use brightkit_brightness::{BrightnessMonitor, BrightnessValue, MonitorConfig};
use futures::StreamExt;
use tokio::time::timeout;

fn monitor(backend: &Arc<SimulatedBackend>) -> BrightnessMonitor {
    BrightnessMonitor::with_backend(backend.clone(), MonitorConfig::default())
}

async fn next(changes: &mut brightkit_brightness::BrightnessChanges) -> Option<BrightnessValue> {
    timeout(Duration::from_secs(1), changes.next())
        .await
        .expect("timed out waiting for a brightness change")
}

#[tokio::test]
async fn reads_follow_the_setting() {
    let backend = Arc::new(SimulatedBackend::with_value(128));
    let monitor = monitor(&backend);
    assert_eq!(monitor.brightness().get(), 128);

    backend.set(0);
    assert_eq!(monitor.brightness(), BrightnessValue::MIN);

    backend.set(255);
    assert_eq!(monitor.brightness(), BrightnessValue::MAX);

    backend.unset();
    assert_eq!(monitor.brightness(), BrightnessValue::UNREADABLE);
}

#[tokio::test]
async fn change_stream_sees_each_value() {
    let backend = Arc::new(SimulatedBackend::with_value(128));
    let monitor = monitor(&backend);
    let mut changes = monitor.changes().unwrap();

    backend.change(0);
    backend.change(255);
    backend.unset();
    backend.notify();

    assert_eq!(next(&mut changes).await, Some(BrightnessValue::MIN));
    assert_eq!(next(&mut changes).await, Some(BrightnessValue::MAX));
    assert_eq!(next(&mut changes).await, Some(BrightnessValue::UNREADABLE));
}

#[tokio::test]
async fn observation_follows_subscribers() {
    let backend = Arc::new(SimulatedBackend::with_value(10));
    let monitor = monitor(&backend);
    assert_eq!(backend.register_calls(), 0);
    assert!(!monitor.is_observing());

    let first = monitor.changes().unwrap();
    assert_eq!(backend.register_calls(), 1);
    assert!(monitor.is_observing());

    let second = monitor.changes().unwrap();
    assert_eq!(backend.register_calls(), 1);
    assert_eq!(monitor.subscriber_count(), 2);

    drop(first);
    assert_eq!(backend.unregister_calls(), 0);
    assert!(monitor.is_observing());

    drop(second);
    assert_eq!(backend.unregister_calls(), 1);
    assert_eq!(backend.live_registrations(), 0);
    assert!(!monitor.is_observing());

    let _third = monitor.changes().unwrap();
    assert_eq!(backend.register_calls(), 2);
    assert_eq!(backend.max_live_registrations(), 1);
}

#[tokio::test]
async fn every_subscriber_receives_every_value() {
    let backend = Arc::new(SimulatedBackend::with_value(10));
    let monitor = monitor(&backend);
    let mut a = monitor.changes().unwrap();
    let mut b = monitor.changes().unwrap();

    backend.change(42);
    backend.change(43);

    for changes in [&mut a, &mut b] {
        assert_eq!(next(changes).await.map(BrightnessValue::get), Some(42));
        assert_eq!(next(changes).await.map(BrightnessValue::get), Some(43));
    }
}

#[tokio::test]
async fn dispose_ends_streams_and_unregisters() {
    let backend = Arc::new(SimulatedBackend::with_value(10));
    let monitor = monitor(&backend);
    let mut changes = monitor.changes().unwrap();
    backend.change(20);

    monitor.dispose();
    assert_eq!(backend.live_registrations(), 0);
    assert_eq!(backend.unregister_calls(), 1);
    assert_eq!(next(&mut changes).await, None);

    // Later platform notifications reach no one.
    backend.change(30);
    assert_eq!(next(&mut changes).await, None);
    drop(changes);
    assert_eq!(backend.unregister_calls(), 1);
}

#[tokio::test]
async fn dropping_the_monitor_disposes_it() {
    let backend = Arc::new(SimulatedBackend::with_value(10));
    let mut changes = {
        let monitor = monitor(&backend);
        monitor.changes().unwrap()
    };
    assert_eq!(backend.live_registrations(), 0);
    assert_eq!(next(&mut changes).await, None);
}

#[tokio::test]
async fn bounded_subscriber_drops_instead_of_blocking() {
    let backend = Arc::new(SimulatedBackend::with_value(0));
    let monitor = BrightnessMonitor::with_backend(
        backend.clone(),
        MonitorConfig::new().channel_capacity(Some(2)),
    );
    let mut slow = monitor.changes().unwrap();

    for value in 1..=5 {
        backend.change(value);
    }

    assert_eq!(next(&mut slow).await.map(BrightnessValue::get), Some(1));
    assert_eq!(next(&mut slow).await.map(BrightnessValue::get), Some(2));
    assert!(
        timeout(Duration::from_millis(50), slow.next())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn failed_start_is_reported_and_retried() {
    let backend = Arc::new(SimulatedBackend::with_value(10));
    let monitor = monitor(&backend);

    backend.fail_next_register();
    assert!(monitor.changes().is_err());
    assert_eq!(monitor.subscriber_count(), 0);
    assert!(!monitor.is_observing());

    let mut changes = monitor.changes().unwrap();
    assert!(monitor.is_observing());
    backend.change(11);
    assert_eq!(next(&mut changes).await.map(BrightnessValue::get), Some(11));
}

#[tokio::test]
async fn reads_stay_in_range_across_lifecycle() {
    let backend = Arc::new(SimulatedBackend::with_value(900));
    let monitor = monitor(&backend);
    let in_range = |value: BrightnessValue| (-1..=255).contains(&value.get());

    assert!(in_range(monitor.brightness()));
    let changes = monitor.changes().unwrap();
    assert!(in_range(monitor.brightness()));
    drop(changes);
    backend.set(-40);
    assert!(in_range(monitor.brightness()));
}
