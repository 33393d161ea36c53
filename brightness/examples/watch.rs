use std::time::Duration;

use brightkit_brightness::{BrightnessMonitor, MonitorConfig};
use futures::StreamExt;

#[tokio::main]
async fn main() -> Result<(), brightkit_brightness::Error> {
    env_logger::init();

    let monitor = BrightnessMonitor::with_config(MonitorConfig::new().channel_capacity(Some(16)))?;
    println!("Brightness: {}", monitor.brightness());

    println!("Watching for changes for 30s...");
    let mut changes = monitor.changes()?;
    let watch = async {
        while let Some(value) = changes.next().await {
            println!("Brightness changed: {value}");
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(30), watch).await;

    drop(changes);
    monitor.dispose();
    Ok(())
}
