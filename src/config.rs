//! Configuration module for SensorWatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Static configuration for a single sensor feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub name: String,
    /// Lower safety limit. Must be strictly below `high`.
    pub low: f64,
    /// Upper safety limit.
    pub high: f64,
    /// TCP address of the sensor feed, `host:port`.
    pub address: String,
}

/// Top-level configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sensors: Vec<SensorConfig>,
    /// HTTP port for the status API (default: 5000)
    pub http_port: u16,
    /// Minimum gap between notifications for the same sensor (default: 300s)
    pub throttle_window: Duration,
    /// Receive timeout on a feed socket before a reading is declared faulty
    /// (default: 3s). Also paces reconnect attempts.
    pub read_timeout: Duration,
    /// Bounded per-sensor recent-value window, presentation only (default: 40)
    pub recent_window: usize,
    /// Webhook URL for notification delivery; log-only when unset.
    pub webhook_url: Option<String>,
    /// Shared secret gating privileged maintenance actions.
    pub maintenance_secret: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sensors: default_sensors(),
            http_port: 5000,
            throttle_window: Duration::from_secs(300),
            read_timeout: Duration::from_secs(3),
            recent_window: 40,
            webhook_url: None,
            maintenance_secret: "admin123".to_string(),
        }
    }
}

fn default_sensors() -> Vec<SensorConfig> {
    [
        ("Temperature", -10.0, 80.0, 5001),
        ("Vibration", 0.0, 50.0, 5002),
        ("Speed", 0.0, 1200.0, 5003),
        ("Pressure", 900.0, 1100.0, 5004),
        ("Current", 0.0, 5.0, 5005),
    ]
    .into_iter()
    .map(|(name, low, high, port)| SensorConfig {
        name: name.to_string(),
        low,
        high,
        address: format!("localhost:{}", port),
    })
    .collect()
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SENSORWATCH_SENSORS`: `name,low,high,host:port` entries separated by `;`
    /// - `SENSORWATCH_HTTP_PORT`: HTTP port (default: 5000)
    /// - `SENSORWATCH_THROTTLE_SECS`: notification throttle window (default: 300)
    /// - `SENSORWATCH_READ_TIMEOUT_SECS`: feed receive timeout (default: 3)
    /// - `SENSORWATCH_RECENT_WINDOW`: recent-value window size (default: 40)
    /// - `SENSORWATCH_WEBHOOK_URL`: notification webhook (default: log only)
    /// - `SENSORWATCH_MAINTENANCE_SECRET`: maintenance unlock secret
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(list) = env::var("SENSORWATCH_SENSORS") {
            cfg.sensors = parse_sensor_list(&list)?;
        }

        if let Ok(port_str) = env::var("SENSORWATCH_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(secs) = env::var("SENSORWATCH_THROTTLE_SECS") {
            if let Ok(secs) = secs.parse() {
                cfg.throttle_window = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = env::var("SENSORWATCH_READ_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                cfg.read_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(size) = env::var("SENSORWATCH_RECENT_WINDOW") {
            if let Ok(size) = size.parse() {
                cfg.recent_window = size;
            }
        }

        if let Ok(url) = env::var("SENSORWATCH_WEBHOOK_URL") {
            if !url.is_empty() {
                cfg.webhook_url = Some(url);
            }
        }

        if let Ok(secret) = env::var("SENSORWATCH_MAINTENANCE_SECRET") {
            cfg.maintenance_secret = secret;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the rest of the system cannot run on. This is the
    /// only fatal error class: everything after startup degrades to FAULTY.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::NoSensors);
        }

        let mut seen = std::collections::HashSet::new();
        for sensor in &self.sensors {
            if sensor.low >= sensor.high {
                return Err(ConfigError::InvalidLimits {
                    sensor: sensor.name.clone(),
                    low: sensor.low,
                    high: sensor.high,
                });
            }
            if !seen.insert(sensor.name.clone()) {
                return Err(ConfigError::DuplicateSensor(sensor.name.clone()));
            }
        }

        Ok(())
    }
}

/// Configuration errors. All fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no sensors configured")]
    NoSensors,
    #[error("sensor {sensor}: low limit {low} must be below high limit {high}")]
    InvalidLimits { sensor: String, low: f64, high: f64 },
    #[error("duplicate sensor name: {0}")]
    DuplicateSensor(String),
    #[error("malformed sensor entry: {0:?}")]
    MalformedEntry(String),
}

/// Parse `name,low,high,host:port` entries separated by `;`.
fn parse_sensor_list(list: &str) -> Result<Vec<SensorConfig>, ConfigError> {
    list.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_sensor_entry)
        .collect()
}

fn parse_sensor_entry(entry: &str) -> Result<SensorConfig, ConfigError> {
    let malformed = || ConfigError::MalformedEntry(entry.to_string());

    let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
    let [name, low, high, address] = parts.as_slice() else {
        return Err(malformed());
    };

    if name.is_empty() || address.is_empty() {
        return Err(malformed());
    }

    Ok(SensorConfig {
        name: name.to_string(),
        low: low.parse().map_err(|_| malformed())?,
        high: high.parse().map_err(|_| malformed())?,
        address: address.to_string(),
    })
}
