//! TCP sensor feed simulator.
//!
//! Stands in for a fleet of real sensors during local testing: one listener
//! per configured sensor emits `TIMESTAMP|VALUE|OK` records at 2 Hz with
//! values drawn from just outside the safety limits, so alarms and warnings
//! actually occur. `SENSORWATCH_FAULT_RATE` (0.0-1.0) injects FAULTY records.

use sensorwatch::config::{MonitorConfig, SensorConfig};
use sensorwatch::feed::TIMESTAMP_FORMAT;

use chrono::Local;
use rand::Rng;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("sensor_sim=info".parse()?))
        .init();

    let cfg = MonitorConfig::load()?;
    let fault_rate: f64 = std::env::var("SENSORWATCH_FAULT_RATE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0);

    for sensor in cfg.sensors {
        tokio::spawn(run_sensor(sensor, fault_rate));
    }

    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Serve one sensor feed: accept a client, stream records until it leaves,
/// then wait for the next client.
async fn run_sensor(sensor: SensorConfig, fault_rate: f64) {
    let listener = match TcpListener::bind(&sensor.address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Sensor {}: cannot bind {}: {}", sensor.name, sensor.address, e);
            return;
        }
    };
    tracing::info!("Sensor {} running on {}", sensor.name, sensor.address);

    loop {
        let (mut conn, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Sensor {}: accept failed: {}", sensor.name, e);
                continue;
            }
        };
        tracing::info!("Sensor {}: client {} connected", sensor.name, peer);

        loop {
            let record = next_record(&sensor, fault_rate);
            if conn.write_all(record.as_bytes()).await.is_err() {
                tracing::info!("Sensor {}: client disconnected", sensor.name);
                break;
            }
            // 2 Hz update rate
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

fn next_record(sensor: &SensorConfig, fault_rate: f64) -> String {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT);
    let mut rng = rand::thread_rng();

    if fault_rate > 0.0 && rng.gen::<f64>() < fault_rate {
        return format!("{}|-|FAULTY\n", timestamp);
    }

    // Just past the limits on both sides, so the full status range shows up
    let value = rng.gen_range(sensor.low - 1.0..=sensor.high + 1.0);
    format!("{}|{:.2}|OK\n", timestamp, value)
}
