//! Benchmark run entity and DTOs.

use benchyard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `runs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Run {
    pub id: DbId,
    pub benchmark_id: DbId,
    pub name: String,
    pub origin: Option<String>,
    pub status_id: StatusId,
    /// Decimal epoch milliseconds as reported by the benchmark script.
    pub started_at: Option<String>,
    /// Decimal epoch milliseconds as reported by the benchmark script.
    pub ended_at: Option<String>,
    pub output: Option<String>,
    pub errors: Option<serde_json::Value>,
    pub triggered_at: Timestamp,
    pub meta: Option<serde_json::Value>,
    pub raw: Option<serde_json::Value>,
    pub comment: Option<String>,
    /// Per-run variable overrides (string map, possibly stringified).
    pub vars: Option<serde_json::Value>,
    pub review_link_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a new pending run. Name and origin must already be
/// normalised.
#[derive(Debug, Clone, Default)]
pub struct CreateRun {
    pub benchmark_id: DbId,
    pub name: String,
    pub origin: Option<String>,
    pub comment: Option<String>,
    pub vars: Option<serde_json::Value>,
    pub meta: Option<serde_json::Value>,
}

/// Results written by the benchmark script's callback. Absent fields are
/// left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunReport {
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub output: Option<String>,
    pub errors: Option<serde_json::Value>,
    pub raw: Option<serde_json::Value>,
}

/// Query parameters for `GET /api/v1/runs`.
#[derive(Debug, Deserialize)]
pub struct RunListQuery {
    /// Filter by status name (e.g. `pending`, `fail`).
    pub status: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
