//! Append-only alarm log.
//!
//! The monitor appends an entry for every ALARM or FAULTY reading; the
//! presentation layer and the maintenance console consume it. Writing the
//! exported CSV to disk is the caller's job.

use serde::Serialize;
use std::sync::Mutex;

/// Why an alarm entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlarmKind {
    #[serde(rename = "BELOW LIMIT")]
    BelowLimit,
    #[serde(rename = "ABOVE LIMIT")]
    AboveLimit,
    #[serde(rename = "FAULTY")]
    Faulty,
}

impl AlarmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmKind::BelowLimit => "BELOW LIMIT",
            AlarmKind::AboveLimit => "ABOVE LIMIT",
            AlarmKind::Faulty => "FAULTY",
        }
    }
}

/// One row of the alarm log. `value` is `None` for faulty readings and is
/// rendered as `-`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmLogEntry {
    pub timestamp: String,
    pub sensor: String,
    pub value: Option<f64>,
    pub kind: AlarmKind,
}

impl AlarmLogEntry {
    fn value_text(&self) -> String {
        match self.value {
            Some(v) => v.to_string(),
            None => "-".to_string(),
        }
    }
}

/// In-memory ordered alarm log.
#[derive(Default)]
pub struct AlarmLog {
    entries: Mutex<Vec<AlarmLogEntry>>,
}

impl AlarmLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: AlarmLogEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<AlarmLogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries. Privileged; reached only through the maintenance
    /// console.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Render the log as CSV with a `Time,Sensor,Value,Type` header.
    pub fn to_csv(&self) -> String {
        let entries = self.entries.lock().unwrap();
        let mut out = String::from("Time,Sensor,Value,Type\n");
        for entry in entries.iter() {
            out.push_str(&format!(
                "{},{},{},{}\n",
                entry.timestamp,
                entry.sensor,
                entry.value_text(),
                entry.kind.as_str()
            ));
        }
        out
    }
}
