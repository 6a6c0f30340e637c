//! Benchmark entity.

use benchyard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `benchmarks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Benchmark {
    pub id: DbId,
    pub owner_id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub slug: String,
    /// Base dashboard URL; run-specific query parameters are appended.
    pub dashboard_url: Option<String>,
    pub default_origin: Option<String>,
    pub extract_metric_path: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a benchmark.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBenchmark {
    pub owner_id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub slug: String,
    pub dashboard_url: Option<String>,
    pub default_origin: Option<String>,
    pub extract_metric_path: Option<String>,
    pub meta: Option<serde_json::Value>,
}
