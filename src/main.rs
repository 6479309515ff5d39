//! SensorWatch daemon entry point.

use sensorwatch::config::MonitorConfig;
use sensorwatch::monitor::Monitor;
use sensorwatch::notify::{LogNotifier, NotificationDispatcher, WebhookNotifier};
use sensorwatch::web::Server;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("sensorwatch=info".parse()?))
        .init();

    // Load configuration; invalid limits are the one fatal error class
    let cfg = MonitorConfig::load()?;
    tracing::info!(
        "Starting SensorWatch with {} sensors, API on port {}",
        cfg.sensors.len(),
        cfg.http_port
    );

    // Notification channel: webhook when configured, log-only otherwise
    let dispatcher = match &cfg.webhook_url {
        Some(url) => {
            tracing::info!("Notifications via webhook {}", url);
            NotificationDispatcher::spawn(WebhookNotifier::new(url)?)
        }
        None => {
            tracing::info!("No webhook configured, notifications go to the log");
            NotificationDispatcher::spawn(LogNotifier)
        }
    };

    // Start the ingestion core
    let monitor = Monitor::start(&cfg, dispatcher);

    // Start the status API
    let server = Server::new(cfg.http_port, monitor.registry());
    tokio::select! {
        result = server.start() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    // Cooperative shutdown: wait for every feed reader to acknowledge stop.
    // In-flight notification deliveries are abandoned.
    monitor.shutdown().await;

    Ok(())
}
