//! Pull request comment notifications.
//!
//! [`api::GitHubApi`] talks to the GitHub REST API; [`notifier::CommentNotifier`]
//! keeps one comment per pull request up to date, creating it on first use
//! and editing it afterwards.

pub mod api;
pub mod links;
pub mod notifier;

pub use api::{GitHubApi, GitHubApiError, GitHubConfig};
pub use links::{LinkError, PullRequestRef};
pub use notifier::{CommentNotifier, NotifyError, ReviewCommentApi};
