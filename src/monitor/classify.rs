//! Threshold classification of sensor readings.

use crate::config::SensorConfig;
use crate::feed::Reading;
use crate::monitor::alarm_log::{AlarmKind, AlarmLogEntry};

use serde::Serialize;

/// Classified status of a sensor. `Unknown` exists only for sensors that have
/// not produced a reading yet; the classifier itself never returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SensorStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "ALARM")]
    Alarm,
    #[serde(rename = "FAULTY")]
    Faulty,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl SensorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorStatus::Ok => "OK",
            SensorStatus::Warning => "WARNING",
            SensorStatus::Alarm => "ALARM",
            SensorStatus::Faulty => "FAULTY",
            SensorStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: SensorStatus,
    /// Present for ALARM and FAULTY readings only.
    pub alarm_entry: Option<AlarmLogEntry>,
    /// The coordinator should consider dispatching a notification
    /// (still subject to acknowledgment, mute and throttling).
    pub should_notify: bool,
    /// The reading is back in the clean zone; the sensor's acknowledgment,
    /// if any, must be dropped so a later alarm notifies again.
    pub clears_acknowledgment: bool,
}

/// Classify one reading against the sensor's configured limits.
///
/// The warning margin is 10% of the limit span on each side. A value exactly
/// at `low` or `high` is an ALARM: the strict comparisons delimit the clean
/// zone, not the alarm zone. Pure; acknowledgment and throttling are the
/// coordinator's business.
pub fn classify(reading: &Reading, limits: &SensorConfig) -> Classification {
    if reading.faulty {
        return Classification {
            status: SensorStatus::Faulty,
            alarm_entry: Some(AlarmLogEntry {
                timestamp: reading.timestamp.clone(),
                sensor: reading.sensor.clone(),
                value: None,
                kind: AlarmKind::Faulty,
            }),
            should_notify: true,
            clears_acknowledgment: false,
        };
    }

    // A non-faulty reading always carries a value
    let value = reading.value.unwrap_or_default();
    let span = limits.high - limits.low;
    let margin = 0.1 * span;

    if value < limits.low || value > limits.high {
        let kind = if value < limits.low {
            AlarmKind::BelowLimit
        } else {
            AlarmKind::AboveLimit
        };
        Classification {
            status: SensorStatus::Alarm,
            alarm_entry: Some(AlarmLogEntry {
                timestamp: reading.timestamp.clone(),
                sensor: reading.sensor.clone(),
                value: Some(value),
                kind,
            }),
            should_notify: true,
            clears_acknowledgment: false,
        }
    } else if value < limits.low + margin || value > limits.high - margin {
        Classification {
            status: SensorStatus::Warning,
            alarm_entry: None,
            should_notify: false,
            clears_acknowledgment: false,
        }
    } else {
        Classification {
            status: SensorStatus::Ok,
            alarm_entry: None,
            should_notify: false,
            clears_acknowledgment: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(low: f64, high: f64) -> SensorConfig {
        SensorConfig {
            name: "Test".to_string(),
            low,
            high,
            address: String::new(),
        }
    }

    fn reading(value: f64) -> Reading {
        Reading {
            sensor: "Test".to_string(),
            value: Some(value),
            timestamp: "2025-01-01 10:00:00".to_string(),
            faulty: false,
        }
    }

    fn faulty_reading() -> Reading {
        Reading {
            sensor: "Test".to_string(),
            value: None,
            timestamp: "2025-01-01 10:00:00".to_string(),
            faulty: true,
        }
    }

    #[test]
    fn test_alarm_above_limit() {
        let c = classify(&reading(120.0), &limits(0.0, 100.0));
        assert_eq!(c.status, SensorStatus::Alarm);
        assert_eq!(c.alarm_entry.as_ref().unwrap().kind, AlarmKind::AboveLimit);
        assert!(c.should_notify);
        assert!(!c.clears_acknowledgment);
    }

    #[test]
    fn test_alarm_below_limit() {
        let c = classify(&reading(-5.0), &limits(0.0, 100.0));
        assert_eq!(c.status, SensorStatus::Alarm);
        assert_eq!(c.alarm_entry.as_ref().unwrap().kind, AlarmKind::BelowLimit);
        assert!(c.should_notify);
    }

    #[test]
    fn test_boundary_values_are_alarms() {
        // The clean zone is open at the limits: v == low and v == high alarm
        assert_eq!(
            classify(&reading(0.0), &limits(0.0, 100.0)).status,
            SensorStatus::Alarm
        );
        assert_eq!(
            classify(&reading(100.0), &limits(0.0, 100.0)).status,
            SensorStatus::Alarm
        );
    }

    #[test]
    fn test_warning_zone() {
        let c = classify(&reading(95.0), &limits(0.0, 100.0));
        assert_eq!(c.status, SensorStatus::Warning);
        assert!(c.alarm_entry.is_none());
        assert!(!c.should_notify);

        let c = classify(&reading(5.0), &limits(0.0, 100.0));
        assert_eq!(c.status, SensorStatus::Warning);
    }

    #[test]
    fn test_ok_zone_clears_acknowledgment() {
        let c = classify(&reading(50.0), &limits(0.0, 100.0));
        assert_eq!(c.status, SensorStatus::Ok);
        assert!(c.alarm_entry.is_none());
        assert!(!c.should_notify);
        assert!(c.clears_acknowledgment);
    }

    #[test]
    fn test_ok_zone_inclusive_edges() {
        // Margin for (0, 100) is 10; 10 and 90 are the first clean values
        assert_eq!(
            classify(&reading(10.0), &limits(0.0, 100.0)).status,
            SensorStatus::Ok
        );
        assert_eq!(
            classify(&reading(90.0), &limits(0.0, 100.0)).status,
            SensorStatus::Ok
        );
    }

    #[test]
    fn test_negative_range() {
        // Span 90, margin 9 for (-10, 80)
        assert_eq!(
            classify(&reading(-20.0), &limits(-10.0, 80.0)).status,
            SensorStatus::Alarm
        );
        assert_eq!(
            classify(&reading(-5.0), &limits(-10.0, 80.0)).status,
            SensorStatus::Warning
        );
        assert_eq!(
            classify(&reading(30.0), &limits(-10.0, 80.0)).status,
            SensorStatus::Ok
        );
    }

    #[test]
    fn test_faulty_reading() {
        let c = classify(&faulty_reading(), &limits(0.0, 100.0));
        assert_eq!(c.status, SensorStatus::Faulty);
        let entry = c.alarm_entry.unwrap();
        assert_eq!(entry.kind, AlarmKind::Faulty);
        assert_eq!(entry.value, None);
        assert!(c.should_notify);
        assert!(!c.clears_acknowledgment);
    }
}
