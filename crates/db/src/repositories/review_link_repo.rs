//! Repository for the `review_links` table.

use benchyard_core::types::DbId;
use sqlx::PgPool;

use crate::models::review_link::ReviewLink;

/// Column list for `review_links` queries.
const COLUMNS: &str = "id, pr_link, comment_body, comment_link, created_at, updated_at";

/// Provides lookups and upserts for pull request links.
pub struct ReviewLinkRepo;

impl ReviewLinkRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ReviewLink>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM review_links WHERE id = $1");
        sqlx::query_as::<_, ReviewLink>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_link(
        pool: &PgPool,
        pr_link: &str,
    ) -> Result<Option<ReviewLink>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM review_links WHERE pr_link = $1");
        sqlx::query_as::<_, ReviewLink>(&query)
            .bind(pr_link)
            .fetch_optional(pool)
            .await
    }

    /// Insert the link or, if it already exists, replace its stored body.
    ///
    /// An existing `comment_link` is preserved.
    pub async fn upsert_body(
        pool: &PgPool,
        pr_link: &str,
        comment_body: &str,
    ) -> Result<ReviewLink, sqlx::Error> {
        let query = format!(
            "INSERT INTO review_links (pr_link, comment_body) \
             VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_review_links_pr_link \
             DO UPDATE SET comment_body = EXCLUDED.comment_body \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReviewLink>(&query)
            .bind(pr_link)
            .bind(comment_body)
            .fetch_one(pool)
            .await
    }

    /// Record the URL of the comment created for this link.
    pub async fn set_comment_link(
        pool: &PgPool,
        id: DbId,
        comment_link: &str,
    ) -> Result<Option<ReviewLink>, sqlx::Error> {
        let query = format!(
            "UPDATE review_links SET comment_link = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReviewLink>(&query)
            .bind(id)
            .bind(comment_link)
            .fetch_optional(pool)
            .await
    }
}
