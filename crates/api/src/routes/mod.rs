pub mod health;
pub mod runs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /runs                 list, enqueue (privileged)
/// /runs/{id}            get (privileged)
/// /runs/{id}/report     benchmark callback (privileged)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/runs", runs::router())
}
