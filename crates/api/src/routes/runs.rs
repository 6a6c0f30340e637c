use axum::routing::{get, post};
use axum::Router;

use crate::handlers::runs;
use crate::state::AppState;

/// Routes mounted at `/api/v1/runs`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(runs::list_runs).post(runs::enqueue_run))
        .route("/{id}", get(runs::get_run))
        .route("/{id}/report", post(runs::report_run))
}
