//! Idempotent pull request comments backed by the `review_links` table.
//!
//! Each pull request gets a single comment. The first notification creates
//! it and stores its URL; later notifications edit that same comment.

use std::future::Future;

use benchyard_core::types::DbId;
use benchyard_db::models::review_link::ReviewLink;
use benchyard_db::repositories::ReviewLinkRepo;
use sqlx::PgPool;

use crate::api::{GitHubApi, GitHubApiError};
use crate::links::{parse_comment_id, parse_pr_link, LinkError, PullRequestRef};

/// Transport used by [`CommentNotifier`].
pub trait ReviewCommentApi: Send + Sync {
    /// Whether credentials are available.
    fn is_configured(&self) -> bool;

    /// Create a comment and return its API URL.
    fn create_comment(
        &self,
        pr: &PullRequestRef,
        body: &str,
    ) -> impl Future<Output = Result<String, GitHubApiError>> + Send;

    /// Replace the body of an existing comment.
    fn edit_comment(
        &self,
        pr: &PullRequestRef,
        comment_id: u64,
        body: &str,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;
}

impl ReviewCommentApi for GitHubApi {
    fn is_configured(&self) -> bool {
        GitHubApi::is_configured(self)
    }

    async fn create_comment(&self, pr: &PullRequestRef, body: &str) -> Result<String, GitHubApiError> {
        let comment = GitHubApi::create_comment(self, pr, body).await?;
        Ok(comment.url)
    }

    async fn edit_comment(
        &self,
        pr: &PullRequestRef,
        comment_id: u64,
        body: &str,
    ) -> Result<(), GitHubApiError> {
        GitHubApi::edit_comment(self, pr, comment_id, body).await?;
        Ok(())
    }
}

/// Errors from [`CommentNotifier`].
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("GitHub client is not configured")]
    NotConfigured,

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Api(#[from] GitHubApiError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Creates or edits the single comment kept on each pull request.
pub struct CommentNotifier<A> {
    pool: PgPool,
    api: A,
}

impl<A: ReviewCommentApi> CommentNotifier<A> {
    pub fn new(pool: PgPool, api: A) -> Self {
        Self { pool, api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_configured()
    }

    /// Post `body` on the pull request at `pr_link`, editing the existing
    /// comment if one was created before.
    ///
    /// The latest body is stored on the review link even when the remote
    /// call fails, so the next attempt sends the newest text.
    pub async fn add_or_update_comment(
        &self,
        pr_link: &str,
        body: &str,
    ) -> Result<ReviewLink, NotifyError> {
        if !self.api.is_configured() {
            return Err(NotifyError::NotConfigured);
        }

        let pr = parse_pr_link(pr_link)?;
        let link = ReviewLinkRepo::upsert_body(&self.pool, pr_link, body).await?;

        match link.comment_link.as_deref() {
            None => {
                let comment_url = self.api.create_comment(&pr, body).await?;
                tracing::info!(
                    review_link_id = link.id,
                    pr_link,
                    comment = %comment_url,
                    "Created pull request comment"
                );
                let updated = ReviewLinkRepo::set_comment_link(&self.pool, link.id, &comment_url)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                Ok(updated)
            }
            Some(comment_link) => {
                let comment_id = parse_comment_id(comment_link)?;
                self.api.edit_comment(&pr, comment_id, body).await?;
                tracing::info!(
                    review_link_id = link.id,
                    pr_link,
                    comment_id,
                    "Updated pull request comment"
                );
                Ok(link)
            }
        }
    }

    /// Resolve a review link by id.
    pub async fn find_link_by_id(&self, id: DbId) -> Result<Option<ReviewLink>, sqlx::Error> {
        ReviewLinkRepo::find_by_id(&self.pool, id).await
    }
}
