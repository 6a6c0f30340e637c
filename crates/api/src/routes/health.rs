use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Whether pull request comments can be sent.
    pub github_configured: bool,
}

/// GET|HEAD /api/health -- returns service and database health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = benchyard_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        github_configured: state.notifier.is_configured(),
    })
}

/// Mount health check routes at `/api/health`, outside the versioned API.
/// `get` also answers HEAD with the body stripped.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}
