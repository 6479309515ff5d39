//! Alarm coordinator: acknowledgment, mute and notification throttling.
//!
//! All of the mutable alarm bookkeeping lives here behind one lock, mutated
//! through a serialized API; the monitor's drain task applies it before the
//! registry update so no API read can observe a status whose bookkeeping has
//! not landed yet.

use crate::monitor::classify::{Classification, SensorStatus};
use crate::notify::Notification;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-sensor acknowledgment state is a set membership: present means
/// ACKNOWLEDGED (suppressed from re-notifying), absent means CLEAR.
struct CoordinatorInner {
    acknowledged: HashSet<String>,
    last_notified: HashMap<String, Instant>,
    muted: bool,
}

pub struct AlarmCoordinator {
    inner: Mutex<CoordinatorInner>,
    throttle_window: Duration,
}

impl AlarmCoordinator {
    pub fn new(throttle_window: Duration) -> Self {
        Self {
            inner: Mutex::new(CoordinatorInner {
                acknowledged: HashSet::new(),
                last_notified: HashMap::new(),
                muted: false,
            }),
            throttle_window,
        }
    }

    /// Apply one classified reading and decide whether to notify.
    ///
    /// OK readings drop the sensor's acknowledgment so a later fault notifies
    /// again. A notification fires only when the sensor is not acknowledged,
    /// the system is not muted and the throttle window since the last dispatch
    /// for this sensor has elapsed. The throttle timestamp advances only when
    /// a notification actually fires, and it advances before the handoff to
    /// the dispatcher, so suppressed readings cannot stretch the window and
    /// racing readings cannot double-dispatch.
    pub fn observe(&self, sensor: &str, classification: &Classification) -> Option<Notification> {
        self.observe_at(sensor, classification, Instant::now())
    }

    fn observe_at(
        &self,
        sensor: &str,
        classification: &Classification,
        now: Instant,
    ) -> Option<Notification> {
        let mut inner = self.inner.lock().unwrap();

        if classification.clears_acknowledgment && inner.acknowledged.remove(sensor) {
            tracing::info!("{} back in range, acknowledgment cleared", sensor);
        }

        if !classification.should_notify || inner.muted || inner.acknowledged.contains(sensor) {
            return None;
        }

        if let Some(last) = inner.last_notified.get(sensor) {
            if now.duration_since(*last) <= self.throttle_window {
                return None;
            }
        }
        inner.last_notified.insert(sensor.to_string(), now);

        Some(match classification.status {
            SensorStatus::Faulty => Notification {
                subject: "Sensor Fault".to_string(),
                body: format!("{} reported FAULTY", sensor),
            },
            _ => Notification {
                subject: format!("{} Alarm", sensor),
                body: format!("{} value is out of range.", sensor),
            },
        })
    }

    /// Acknowledge one sensor. Only sensors currently in ALARM or FAULTY can
    /// be acknowledged; the rest stay CLEAR.
    pub fn acknowledge(&self, sensor: &str, status: SensorStatus) -> bool {
        if !matches!(status, SensorStatus::Alarm | SensorStatus::Faulty) {
            return false;
        }
        self.inner
            .lock()
            .unwrap()
            .acknowledged
            .insert(sensor.to_string())
    }

    /// Acknowledge every sensor currently in ALARM or FAULTY.
    pub fn acknowledge_all<'a>(
        &self,
        statuses: impl IntoIterator<Item = (&'a str, SensorStatus)>,
    ) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let mut count = 0;
        for (sensor, status) in statuses {
            if matches!(status, SensorStatus::Alarm | SensorStatus::Faulty)
                && inner.acknowledged.insert(sensor.to_string())
            {
                count += 1;
            }
        }
        count
    }

    /// Drop every acknowledgment. Privileged maintenance action.
    pub fn clear_acknowledgments(&self) {
        self.inner.lock().unwrap().acknowledged.clear();
    }

    pub fn is_acknowledged(&self, sensor: &str) -> bool {
        self.inner.lock().unwrap().acknowledged.contains(sensor)
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.lock().unwrap().muted = muted;
        tracing::info!("Notifications {}", if muted { "MUTED" } else { "UNMUTED" });
    }

    pub fn is_muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::alarm_log::{AlarmKind, AlarmLogEntry};

    fn alarm_classification() -> Classification {
        Classification {
            status: SensorStatus::Alarm,
            alarm_entry: Some(AlarmLogEntry {
                timestamp: "ts".to_string(),
                sensor: "A".to_string(),
                value: Some(120.0),
                kind: AlarmKind::AboveLimit,
            }),
            should_notify: true,
            clears_acknowledgment: false,
        }
    }

    fn ok_classification() -> Classification {
        Classification {
            status: SensorStatus::Ok,
            alarm_entry: None,
            should_notify: false,
            clears_acknowledgment: true,
        }
    }

    fn faulty_classification() -> Classification {
        Classification {
            status: SensorStatus::Faulty,
            alarm_entry: None,
            should_notify: true,
            clears_acknowledgment: false,
        }
    }

    #[test]
    fn test_alarm_notifies_when_clear() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        let notification = coord.observe("A", &alarm_classification());
        assert_eq!(notification.unwrap().subject, "A Alarm");
    }

    #[test]
    fn test_faulty_notification_subject() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        let notification = coord.observe("A", &faulty_classification()).unwrap();
        assert_eq!(notification.subject, "Sensor Fault");
        assert_eq!(notification.body, "A reported FAULTY");
    }

    #[test]
    fn test_throttle_window() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        let t0 = Instant::now();

        assert!(coord.observe_at("A", &alarm_classification(), t0).is_some());
        // Within the window: suppressed
        assert!(coord
            .observe_at("A", &alarm_classification(), t0 + Duration::from_secs(100))
            .is_none());
        // Past the window: fires again
        assert!(coord
            .observe_at("A", &alarm_classification(), t0 + Duration::from_secs(301))
            .is_some());
    }

    #[test]
    fn test_throttle_does_not_stack() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        let t0 = Instant::now();

        assert!(coord.observe_at("A", &alarm_classification(), t0).is_some());
        // Suppressed attempts must not push the window forward
        for secs in [60, 120, 180, 240] {
            assert!(coord
                .observe_at("A", &alarm_classification(), t0 + Duration::from_secs(secs))
                .is_none());
        }
        assert!(coord
            .observe_at("A", &alarm_classification(), t0 + Duration::from_secs(301))
            .is_some());
    }

    #[test]
    fn test_throttle_is_per_sensor() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        let t0 = Instant::now();
        assert!(coord.observe_at("A", &alarm_classification(), t0).is_some());
        assert!(coord.observe_at("B", &alarm_classification(), t0).is_some());
    }

    #[test]
    fn test_acknowledged_sensor_does_not_notify() {
        let coord = AlarmCoordinator::new(Duration::from_secs(0));
        assert!(coord.acknowledge("A", SensorStatus::Alarm));
        assert!(coord.observe("A", &alarm_classification()).is_none());
    }

    #[test]
    fn test_cannot_acknowledge_healthy_sensor() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        assert!(!coord.acknowledge("A", SensorStatus::Ok));
        assert!(!coord.acknowledge("A", SensorStatus::Warning));
        assert!(!coord.acknowledge("A", SensorStatus::Unknown));
        assert!(!coord.is_acknowledged("A"));
    }

    #[test]
    fn test_acknowledgment_self_clears_on_ok() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        coord.acknowledge("A", SensorStatus::Alarm);
        assert!(coord.is_acknowledged("A"));

        coord.observe("A", &ok_classification());
        assert!(!coord.is_acknowledged("A"));
    }

    #[test]
    fn test_acknowledgment_survives_warning() {
        // A sensor that alarms, is acknowledged, then settles into WARNING
        // stays acknowledged; only OK clears it.
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        coord.acknowledge("A", SensorStatus::Alarm);

        let warning = Classification {
            status: SensorStatus::Warning,
            alarm_entry: None,
            should_notify: false,
            clears_acknowledgment: false,
        };
        coord.observe("A", &warning);
        assert!(coord.is_acknowledged("A"));
    }

    #[test]
    fn test_acknowledge_all_only_alarming() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        let count = coord.acknowledge_all([
            ("A", SensorStatus::Alarm),
            ("B", SensorStatus::Ok),
            ("C", SensorStatus::Faulty),
        ]);
        assert_eq!(count, 2);
        assert!(coord.is_acknowledged("A"));
        assert!(!coord.is_acknowledged("B"));
        assert!(coord.is_acknowledged("C"));
    }

    #[test]
    fn test_mute_suppresses_notifications() {
        let coord = AlarmCoordinator::new(Duration::from_secs(0));
        coord.set_muted(true);
        assert!(coord.observe("A", &alarm_classification()).is_none());

        coord.set_muted(false);
        assert!(coord.observe("A", &alarm_classification()).is_some());
    }

    #[test]
    fn test_clear_acknowledgments() {
        let coord = AlarmCoordinator::new(Duration::from_secs(300));
        coord.acknowledge("A", SensorStatus::Alarm);
        coord.acknowledge("B", SensorStatus::Faulty);
        coord.clear_acknowledgments();
        assert!(!coord.is_acknowledged("A"));
        assert!(!coord.is_acknowledged("B"));
    }
}
