//! HTTP request handlers.

use super::AppState;
use crate::monitor::SensorState;

use axum::{extract::State, response::Json};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /api/sensors`: latest value, timestamp and status per sensor.
pub async fn handle_get_sensors(
    State(state): State<AppState>,
) -> Json<HashMap<String, SensorState>> {
    Json(state.registry.snapshot())
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub overall_status: String,
}

/// `GET /api/status`: aggregate status with FAULTY > ALARM > WARNING > OK
/// precedence, rendered as the operator-facing label.
pub async fn handle_get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        overall_status: format!("Overall System Status : {}", state.registry.overall_status()),
    })
}
