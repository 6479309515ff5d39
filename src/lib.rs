//! SensorWatch - Industrial sensor monitoring core.
//!
//! Ingests streaming readings from independent TCP sensor feeds, classifies
//! them against configured safety limits, tracks alarm acknowledgment state,
//! throttles outbound notifications and exposes the aggregate status through
//! a JSON API. Presentation (tables, plots, trays) and notification transports
//! are collaborators: they consume [`monitor::Monitor::subscribe`] events and
//! the alarm log, and drive the core through [`maintenance::MaintenanceConsole`]
//! and the coordinator's acknowledge/mute calls.

pub mod config;
pub mod feed;
pub mod maintenance;
pub mod monitor;
pub mod notify;
pub mod web;
