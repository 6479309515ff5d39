//! Status registry: the shared table of latest per-sensor state.
//!
//! Exactly one writer (the monitor's drain task) mutates it; the API and any
//! presentation consumers read concurrently through cloned snapshots. Updates
//! replace the whole record for a sensor, never individual fields.

use crate::monitor::classify::SensorStatus;

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

/// Latest known state of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    #[serde(skip)]
    pub name: String,
    pub value: Option<f64>,
    pub timestamp: Option<String>,
    pub status: SensorStatus,
}

impl SensorState {
    fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            timestamp: None,
            status: SensorStatus::Unknown,
        }
    }
}

struct RegistryInner {
    states: HashMap<String, SensorState>,
    /// Bounded recent-value windows for presentation; faulty readings push
    /// `None` so plots show a gap rather than a fake zero.
    recent: HashMap<String, VecDeque<Option<f64>>>,
}

/// Shared status table, seeded with every configured sensor at `UNKNOWN`.
pub struct StatusRegistry {
    inner: RwLock<RegistryInner>,
    recent_capacity: usize,
}

impl StatusRegistry {
    pub fn new<'a>(sensor_names: impl IntoIterator<Item = &'a str>, recent_capacity: usize) -> Self {
        let mut states = HashMap::new();
        let mut recent = HashMap::new();
        for name in sensor_names {
            states.insert(name.to_string(), SensorState::unknown(name));
            recent.insert(name.to_string(), VecDeque::with_capacity(recent_capacity));
        }
        Self {
            inner: RwLock::new(RegistryInner { states, recent }),
            recent_capacity,
        }
    }

    /// Replace the state for `name` as a single record. Readings for sensors
    /// that were never configured are dropped with a warning; feeds cannot
    /// grow the table.
    pub fn update(
        &self,
        name: &str,
        value: Option<f64>,
        timestamp: &str,
        status: SensorStatus,
    ) {
        let mut inner = self.inner.write().unwrap();

        if !inner.states.contains_key(name) {
            tracing::warn!("Dropping reading for unconfigured sensor {}", name);
            return;
        }

        inner.states.insert(
            name.to_string(),
            SensorState {
                name: name.to_string(),
                value,
                timestamp: Some(timestamp.to_string()),
                status,
            },
        );

        // Capacity zero disables the window entirely
        let capacity = self.recent_capacity;
        if capacity > 0 {
            if let Some(window) = inner.recent.get_mut(name) {
                while window.len() >= capacity {
                    window.pop_front();
                }
                window.push_back(value);
            }
        }
    }

    /// Consistent copy of the whole table.
    pub fn snapshot(&self) -> HashMap<String, SensorState> {
        self.inner.read().unwrap().states.clone()
    }

    pub fn status_of(&self, name: &str) -> Option<SensorStatus> {
        self.inner.read().unwrap().states.get(name).map(|s| s.status)
    }

    /// Recent values for one sensor, oldest first. Presentation only.
    pub fn recent(&self, name: &str) -> Vec<Option<f64>> {
        self.inner
            .read()
            .unwrap()
            .recent
            .get(name)
            .map(|window| window.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Aggregate status with FAULTY > ALARM > WARNING > OK priority.
    ///
    /// The first FAULTY or ALARM short-circuits; UNKNOWN sensors do not count
    /// against an otherwise healthy table.
    pub fn overall_status(&self) -> SensorStatus {
        let inner = self.inner.read().unwrap();
        let mut has_alarm = false;
        let mut has_warning = false;

        for state in inner.states.values() {
            match state.status {
                SensorStatus::Faulty => return SensorStatus::Faulty,
                SensorStatus::Alarm => has_alarm = true,
                SensorStatus::Warning => has_warning = true,
                SensorStatus::Ok | SensorStatus::Unknown => {}
            }
        }

        if has_alarm {
            SensorStatus::Alarm
        } else if has_warning {
            SensorStatus::Warning
        } else {
            SensorStatus::Ok
        }
    }
}
