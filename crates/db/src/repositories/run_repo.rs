//! Repository for the `runs` table.
//!
//! Status changes go through [`StatusTransition`] so only legal lifecycle
//! steps reach the database, and every update is conditional on the
//! expected current status.

use benchyard_core::types::DbId;
use sqlx::PgPool;

use crate::models::run::{CreateRun, Run, RunReport};
use crate::models::status::{RunStatus, StatusId, StatusTransition};

/// Column list for `runs` queries.
const COLUMNS: &str = "\
    id, benchmark_id, name, origin, status_id, started_at, ended_at, \
    output, errors, triggered_at, meta, raw, comment, vars, review_link_id, \
    created_at, updated_at";

/// Maximum page size for run listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for run listing.
const DEFAULT_LIMIT: i64 = 50;

fn status_ids(statuses: &[RunStatus]) -> Vec<StatusId> {
    statuses.iter().map(|s| s.id()).collect()
}

/// Provides queries and lifecycle updates for benchmark runs.
pub struct RunRepo;

impl RunRepo {
    /// Insert a new pending run triggered now.
    pub async fn create(pool: &PgPool, input: &CreateRun) -> Result<Run, sqlx::Error> {
        let query = format!(
            "INSERT INTO runs (benchmark_id, name, origin, status_id, comment, vars, meta, triggered_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(input.benchmark_id)
            .bind(&input.name)
            .bind(&input.origin)
            .bind(RunStatus::Pending.id())
            .bind(&input.comment)
            .bind(&input.vars)
            .bind(&input.meta)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Run>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs WHERE id = $1");
        sqlx::query_as::<_, Run>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List runs newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        status: Option<RunStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Run>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM runs \
             WHERE ($1::SMALLINT IS NULL OR status_id = $1) \
             ORDER BY triggered_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(status.map(RunStatus::id))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count runs currently in any of `statuses`.
    pub async fn count_with_status(
        pool: &PgPool,
        statuses: &[RunStatus],
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM runs WHERE status_id = ANY($1)")
                .bind(status_ids(statuses))
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Runs in any of `statuses`, oldest trigger first (ties by id).
    pub async fn list_with_status(
        pool: &PgPool,
        statuses: &[RunStatus],
    ) -> Result<Vec<Run>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM runs \
             WHERE status_id = ANY($1) \
             ORDER BY triggered_at ASC, id ASC"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(status_ids(statuses))
            .fetch_all(pool)
            .await
    }

    /// The oldest pending run by trigger time (ties by id).
    pub async fn oldest_pending(pool: &PgPool) -> Result<Option<Run>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM runs \
             WHERE status_id = $1 \
             ORDER BY triggered_at ASC, id ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(RunStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Apply a validated status change.
    ///
    /// Returns `false` if the run was not in the transition's source status.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        step: StatusTransition,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE runs SET status_id = $3 WHERE id = $1 AND status_id = $2")
            .bind(id)
            .bind(step.from().id())
            .bind(step.to().id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store `output` unless the run already has non-empty output.
    ///
    /// Returns `true` if the value was written.
    pub async fn record_output_if_empty(
        pool: &PgPool,
        id: DbId,
        output: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs SET output = $2 \
             WHERE id = $1 AND (output IS NULL OR output = '')",
        )
        .bind(id)
        .bind(output)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the recorded start and end timestamps.
    pub async fn set_timestamps(
        pool: &PgPool,
        id: DbId,
        started_at: &str,
        ended_at: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE runs SET started_at = $2, ended_at = $3 WHERE id = $1")
            .bind(id)
            .bind(started_at)
            .bind(ended_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_review_link(
        pool: &PgPool,
        id: DbId,
        review_link_id: DbId,
    ) -> Result<Option<Run>, sqlx::Error> {
        let query = format!(
            "UPDATE runs SET review_link_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(id)
            .bind(review_link_id)
            .fetch_optional(pool)
            .await
    }

    /// Merge results from the benchmark callback. Status is never changed.
    pub async fn report(
        pool: &PgPool,
        id: DbId,
        input: &RunReport,
    ) -> Result<Option<Run>, sqlx::Error> {
        let query = format!(
            "UPDATE runs SET \
                started_at = COALESCE($2, started_at), \
                ended_at = COALESCE($3, ended_at), \
                output = COALESCE($4, output), \
                errors = COALESCE($5, errors), \
                raw = COALESCE($6, raw) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(id)
            .bind(&input.started_at)
            .bind(&input.ended_at)
            .bind(&input.output)
            .bind(&input.errors)
            .bind(&input.raw)
            .fetch_optional(pool)
            .await
    }
}
