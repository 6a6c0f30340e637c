use std::sync::Arc;

use benchyard_github::{CommentNotifier, GitHubApi};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: benchyard_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Pull request comment notifier, shared with the run lifecycle.
    pub notifier: Arc<CommentNotifier<GitHubApi>>,
}
