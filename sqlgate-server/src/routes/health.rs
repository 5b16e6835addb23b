//! GET /health: liveness plus audit-queue depth.
//!
//! Unauthenticated and side-effect free: a pure read of in-process
//! counters, never the database or the sink.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use sqlgate_core::health::HealthStatus;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub status: HealthStatus,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.health().status(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
