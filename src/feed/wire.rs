//! Wire-record parsing for sensor feeds.
//!
//! Feeds speak newline-delimited text, one record per line:
//! `TIMESTAMP|VALUE|STATUS` with `TIMESTAMP` as `YYYY-MM-DD HH:MM:SS`,
//! `VALUE` a decimal (or a placeholder when the feed is faulty) and `STATUS`
//! either `OK` or `FAULTY`.

use chrono::Local;

/// Timestamp format used on the wire and for synthesized readings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One normalized reading from a sensor feed.
///
/// Produced on every receive, successful or not; immutable once constructed.
/// `value` is `None` exactly when the reading is faulty.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor: String,
    pub value: Option<f64>,
    pub timestamp: String,
    pub faulty: bool,
}

impl Reading {
    /// Synthesize a faulty reading with the local wall-clock timestamp.
    ///
    /// Used for connect failures, receive timeouts and decode errors; the
    /// downstream pipeline never sees those as errors, only as FAULTY data.
    pub fn synthesized_fault(sensor: &str) -> Self {
        Self {
            sensor: sensor.to_string(),
            value: None,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            faulty: true,
        }
    }
}

/// Parse one wire record into a reading for `sensor`.
///
/// Any deviation from the record format is folded into a synthesized FAULTY
/// reading: wrong field count, unparseable value, or a status tag that is not
/// literally `OK` (the placeholder value of a faulty record is never parsed).
/// Parsing never fails.
pub fn parse_record(sensor: &str, line: &str) -> Reading {
    let line = line.trim();
    if line.is_empty() {
        return Reading::synthesized_fault(sensor);
    }

    let mut fields = line.split('|');
    let (Some(timestamp), Some(value_str), Some(status), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Reading::synthesized_fault(sensor);
    };

    if status != "OK" {
        return Reading {
            sensor: sensor.to_string(),
            value: None,
            timestamp: timestamp.to_string(),
            faulty: true,
        };
    }

    match value_str.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Reading {
            sensor: sensor.to_string(),
            // Feeds report with more precision than the limits are defined at
            value: Some((value * 100.0).round() / 100.0),
            timestamp: timestamp.to_string(),
            faulty: false,
        },
        _ => Reading::synthesized_fault(sensor),
    }
}
