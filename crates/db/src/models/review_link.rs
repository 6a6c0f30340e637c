//! Pull request link and its posted comment.

use benchyard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `review_links` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewLink {
    pub id: DbId,
    pub pr_link: String,
    /// Body of the last comment sent.
    pub comment_body: String,
    /// URL of the posted comment. `None` until the first create succeeds.
    pub comment_link: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
