//! Liveness probe

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Service identity plus a glance at the quiz session
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub total_steps: usize,
    /// A submission is running or has already finished
    pub submission_locked: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: "quiz-ui",
        version: env!("CARGO_PKG_VERSION"),
        total_steps: state.definition.total_steps(),
        submission_locked: state.pipeline.is_locked(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
