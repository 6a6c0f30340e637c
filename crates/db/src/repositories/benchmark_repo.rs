//! Repository for the `benchmarks` table.

use benchyard_core::types::DbId;
use sqlx::PgPool;

use crate::models::benchmark::{Benchmark, CreateBenchmark};

/// Column list for `benchmarks` queries.
const COLUMNS: &str = "\
    id, owner_id, project_id, name, slug, dashboard_url, default_origin, \
    extract_metric_path, meta, created_at, updated_at";

/// Provides lookups for benchmark definitions.
pub struct BenchmarkRepo;

impl BenchmarkRepo {
    pub async fn create(pool: &PgPool, input: &CreateBenchmark) -> Result<Benchmark, sqlx::Error> {
        let query = format!(
            "INSERT INTO benchmarks \
                (owner_id, project_id, name, slug, dashboard_url, default_origin, \
                 extract_metric_path, meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Benchmark>(&query)
            .bind(input.owner_id)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.dashboard_url)
            .bind(&input.default_origin)
            .bind(&input.extract_metric_path)
            .bind(&input.meta)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Benchmark>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM benchmarks WHERE id = $1");
        sqlx::query_as::<_, Benchmark>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
