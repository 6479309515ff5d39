//! Maintenance console: privileged actions behind a shared-secret gate.
//!
//! The console is driven by an operator-facing collaborator through plain
//! method calls; nothing here is exposed over the network. Every action other
//! than `unlock` fails until the secret has been presented.

use crate::monitor::Monitor;

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MaintenanceError {
    #[error("maintenance console is locked")]
    Locked,
    #[error("authentication rejected")]
    AuthRejected,
}

pub struct MaintenanceConsole<'a> {
    monitor: &'a Monitor,
    secret: String,
    unlocked: AtomicBool,
}

impl<'a> MaintenanceConsole<'a> {
    pub fn new(monitor: &'a Monitor, secret: &str) -> Self {
        Self {
            monitor,
            secret: secret.to_string(),
            unlocked: AtomicBool::new(false),
        }
    }

    /// Compare the presented secret and unlock the privileged actions.
    /// A failed attempt is logged and changes nothing.
    pub fn unlock(&self, secret: &str) -> Result<(), MaintenanceError> {
        if secret == self.secret {
            self.unlocked.store(true, Ordering::SeqCst);
            tracing::info!("Maintenance console unlocked");
            Ok(())
        } else {
            tracing::warn!("Failed maintenance login attempt");
            Err(MaintenanceError::AuthRejected)
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    fn require_unlocked(&self) -> Result<(), MaintenanceError> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(MaintenanceError::Locked)
        }
    }

    /// Empty the alarm log and drop every acknowledgment.
    pub fn clear_alarms(&self) -> Result<(), MaintenanceError> {
        self.require_unlocked()?;
        self.monitor.alarm_log().clear();
        self.monitor.coordinator().clear_acknowledgments();
        tracing::info!("All alarms cleared by maintenance");
        Ok(())
    }

    /// Render the alarm log as CSV for export. Writing it anywhere is the
    /// caller's job.
    pub fn export_alarms(&self) -> Result<String, MaintenanceError> {
        self.require_unlocked()?;
        tracing::info!("All alarms saved by maintenance");
        Ok(self.monitor.alarm_log().to_csv())
    }

    /// Acknowledge every sensor currently in ALARM or FAULTY.
    pub fn acknowledge_all(&self) -> Result<usize, MaintenanceError> {
        self.require_unlocked()?;
        Ok(self.monitor.acknowledge_all())
    }

    pub fn set_muted(&self, muted: bool) -> Result<(), MaintenanceError> {
        self.require_unlocked()?;
        self.monitor.coordinator().set_muted(muted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::notify::{LogNotifier, NotificationDispatcher};

    fn test_monitor() -> Monitor {
        // No feeds: these tests drive the console, not ingestion
        let config = MonitorConfig {
            sensors: Vec::new(),
            ..MonitorConfig::default()
        };
        Monitor::start(&config, NotificationDispatcher::spawn(LogNotifier))
    }

    #[tokio::test]
    async fn test_actions_locked_until_unlock() {
        let monitor = test_monitor();
        let console = MaintenanceConsole::new(&monitor, "admin123");

        assert_eq!(console.clear_alarms(), Err(MaintenanceError::Locked));
        assert!(matches!(
            console.export_alarms(),
            Err(MaintenanceError::Locked)
        ));
        assert_eq!(console.acknowledge_all(), Err(MaintenanceError::Locked));
        assert_eq!(console.set_muted(true), Err(MaintenanceError::Locked));
    }

    #[tokio::test]
    async fn test_wrong_secret_stays_locked() {
        let monitor = test_monitor();
        let console = MaintenanceConsole::new(&monitor, "admin123");

        assert_eq!(
            console.unlock("letmein"),
            Err(MaintenanceError::AuthRejected)
        );
        assert!(!console.is_unlocked());
        assert_eq!(console.clear_alarms(), Err(MaintenanceError::Locked));
    }

    #[tokio::test]
    async fn test_unlock_enables_actions() {
        let monitor = test_monitor();
        let console = MaintenanceConsole::new(&monitor, "admin123");

        console.unlock("admin123").unwrap();
        assert!(console.is_unlocked());

        monitor.alarm_log().append(crate::monitor::AlarmLogEntry {
            timestamp: "ts".to_string(),
            sensor: "Temperature".to_string(),
            value: Some(120.0),
            kind: crate::monitor::AlarmKind::AboveLimit,
        });

        let csv = console.export_alarms().unwrap();
        assert!(csv.contains("Temperature,120,ABOVE LIMIT"));

        console.clear_alarms().unwrap();
        assert!(monitor.alarm_log().is_empty());

        console.set_muted(true).unwrap();
        assert!(monitor.coordinator().is_muted());

        // Nothing is alarming, so a blanket acknowledge touches no sensors
        assert_eq!(console.acknowledge_all().unwrap(), 0);
    }
}
