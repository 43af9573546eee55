//! Health check endpoints.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Ledger write mode: `session` or `best_effort`.
    pub atomicity: &'static str,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        atomicity: state.ledger.atomicity().as_str(),
    })
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
