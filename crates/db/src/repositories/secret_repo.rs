//! Repository for the `secrets` table.

use benchyard_core::types::DbId;
use sqlx::PgPool;

use crate::models::secret::{CreateSecret, Secret};

/// Column list for `secrets` queries.
const COLUMNS: &str = "\
    id, benchmark_id, script, script_link, env, vars, created_at, updated_at";

/// Provides lookups for benchmark scripts and their configuration.
pub struct SecretRepo;

impl SecretRepo {
    pub async fn create(pool: &PgPool, input: &CreateSecret) -> Result<Secret, sqlx::Error> {
        let query = format!(
            "INSERT INTO secrets (benchmark_id, script, script_link, env, vars) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Secret>(&query)
            .bind(input.benchmark_id)
            .bind(&input.script)
            .bind(&input.script_link)
            .bind(&input.env)
            .bind(&input.vars)
            .fetch_one(pool)
            .await
    }

    /// The secret belonging to a benchmark, if any.
    pub async fn find_by_benchmark(
        pool: &PgPool,
        benchmark_id: DbId,
    ) -> Result<Option<Secret>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM secrets WHERE benchmark_id = $1");
        sqlx::query_as::<_, Secret>(&query)
            .bind(benchmark_id)
            .fetch_optional(pool)
            .await
    }
}
