//! Monitor module: orchestrates ingestion and classification.
//!
//! One feed reader task per sensor fans into a single mpsc channel; one drain
//! task owns every mutation of the registry and the coordinator, so updates
//! for a sensor apply in the order its reader produced them and alarm
//! bookkeeping is always visible together with the status it belongs to.

mod alarm_log;
mod classify;
mod coordinator;
mod registry;

pub use alarm_log::{AlarmKind, AlarmLog, AlarmLogEntry};
pub use classify::{classify, Classification, SensorStatus};
pub use coordinator::AlarmCoordinator;
pub use registry::{SensorState, StatusRegistry};

use crate::config::{MonitorConfig, SensorConfig};
use crate::feed::{FeedReader, Reading};
use crate::notify::NotificationDispatcher;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Event published after every applied reading, for presentation consumers.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub sensor: String,
    pub value: Option<f64>,
    pub timestamp: String,
    pub status: SensorStatus,
}

/// The running ingestion-and-classification core.
pub struct Monitor {
    registry: Arc<StatusRegistry>,
    coordinator: Arc<AlarmCoordinator>,
    alarm_log: Arc<AlarmLog>,
    events_tx: broadcast::Sender<StatusUpdate>,
    readers: Vec<FeedReader>,
    drain_handle: tokio::task::JoinHandle<()>,
}

impl Monitor {
    const FAN_IN_DEPTH: usize = 1000;
    const EVENT_DEPTH: usize = 256;

    /// Spawn the feed readers and the drain task.
    pub fn start(config: &MonitorConfig, dispatcher: NotificationDispatcher) -> Self {
        let registry = Arc::new(StatusRegistry::new(
            config.sensors.iter().map(|s| s.name.as_str()),
            config.recent_window,
        ));
        let coordinator = Arc::new(AlarmCoordinator::new(config.throttle_window));
        let alarm_log = Arc::new(AlarmLog::new());
        let (events_tx, _) = broadcast::channel(Self::EVENT_DEPTH);

        let (tx, rx) = mpsc::channel(Self::FAN_IN_DEPTH);

        tracing::info!("Starting monitor with {} sensors", config.sensors.len());
        let readers = config
            .sensors
            .iter()
            .map(|sensor| FeedReader::spawn(sensor.clone(), config.read_timeout, tx.clone()))
            .collect();
        drop(tx); // drain ends once every reader is gone

        let limits: HashMap<String, SensorConfig> = config
            .sensors
            .iter()
            .map(|s| (s.name.clone(), s.clone()))
            .collect();

        let drain_handle = tokio::spawn(run_drain_loop(
            rx,
            limits,
            registry.clone(),
            coordinator.clone(),
            alarm_log.clone(),
            dispatcher,
            events_tx.clone(),
        ));

        Self {
            registry,
            coordinator,
            alarm_log,
            events_tx,
            readers,
            drain_handle,
        }
    }

    pub fn registry(&self) -> Arc<StatusRegistry> {
        self.registry.clone()
    }

    pub fn coordinator(&self) -> Arc<AlarmCoordinator> {
        self.coordinator.clone()
    }

    pub fn alarm_log(&self) -> Arc<AlarmLog> {
        self.alarm_log.clone()
    }

    /// Subscribe to per-reading status updates.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.events_tx.subscribe()
    }

    /// Acknowledge every sensor currently in ALARM or FAULTY.
    pub fn acknowledge_all(&self) -> usize {
        let snapshot = self.registry.snapshot();
        let count = self.coordinator.acknowledge_all(
            snapshot
                .iter()
                .map(|(name, state)| (name.as_str(), state.status)),
        );
        tracing::info!("All alarms acknowledged by operator ({} sensors)", count);
        count
    }

    /// Acknowledge one sensor if it is currently in ALARM or FAULTY.
    pub fn acknowledge(&self, sensor: &str) -> bool {
        match self.registry.status_of(sensor) {
            Some(status) => self.coordinator.acknowledge(sensor, status),
            None => false,
        }
    }

    /// Stop every feed reader cooperatively, then wait for the drain task to
    /// finish applying whatever was already in flight. Pending notification
    /// deliveries are not awaited.
    pub async fn shutdown(self) {
        for reader in self.readers {
            reader.stop().await;
        }
        if let Err(e) = self.drain_handle.await {
            tracing::warn!("Drain task ended abnormally: {}", e);
        }
        tracing::info!("Monitor stopped");
    }
}

async fn run_drain_loop(
    mut rx: mpsc::Receiver<Reading>,
    limits: HashMap<String, SensorConfig>,
    registry: Arc<StatusRegistry>,
    coordinator: Arc<AlarmCoordinator>,
    alarm_log: Arc<AlarmLog>,
    dispatcher: NotificationDispatcher,
    events_tx: broadcast::Sender<StatusUpdate>,
) {
    while let Some(reading) = rx.recv().await {
        let Some(sensor_limits) = limits.get(&reading.sensor) else {
            tracing::warn!("Dropping reading for unconfigured sensor {}", reading.sensor);
            continue;
        };

        apply_reading(
            &reading,
            sensor_limits,
            &registry,
            &coordinator,
            &alarm_log,
            &dispatcher,
            &events_tx,
        );
    }
}

/// Apply one reading: classify, run alarm bookkeeping, update the registry,
/// then publish. The coordinator runs before the registry update so no
/// concurrent snapshot can see a status whose acknowledgment or throttle
/// state has not been applied yet.
fn apply_reading(
    reading: &Reading,
    limits: &SensorConfig,
    registry: &StatusRegistry,
    coordinator: &AlarmCoordinator,
    alarm_log: &AlarmLog,
    dispatcher: &NotificationDispatcher,
    events_tx: &broadcast::Sender<StatusUpdate>,
) {
    let classification = classify(reading, limits);

    if classification.status == SensorStatus::Alarm {
        tracing::warn!(
            "{} ALARM: value={}",
            reading.sensor,
            reading.value.unwrap_or_default()
        );
    } else if classification.status == SensorStatus::Faulty {
        tracing::warn!("{} reported FAULTY", reading.sensor);
    }

    let notification = coordinator.observe(&reading.sensor, &classification);

    if let Some(entry) = &classification.alarm_entry {
        alarm_log.append(entry.clone());
    }

    registry.update(
        &reading.sensor,
        reading.value,
        &reading.timestamp,
        classification.status,
    );

    if let Some(notification) = notification {
        dispatcher.dispatch(notification);
    }

    // No subscribers is fine; presentation is optional
    let _ = events_tx.send(StatusUpdate {
        sensor: reading.sensor.clone(),
        value: reading.value,
        timestamp: reading.timestamp.clone(),
        status: classification.status,
    });
}
