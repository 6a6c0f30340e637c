//! REST client for the GitHub issue comment endpoints.
//!
//! Pull requests share the issue comment API, so the conversation-level
//! comment on a pull request is created through
//! `POST /repos/{owner}/{repo}/issues/{number}/comments`.

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::links::PullRequestRef;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT_VALUE: &str = "benchyard";
const ACCEPT_VALUE: &str = "application/vnd.github+json";

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Personal access or app token. `None` leaves the client unconfigured.
    pub token: Option<String>,
    /// Base URL of the REST API (overridable for GitHub Enterprise).
    pub api_url: String,
}

impl GitHubConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var          | Default                  |
    /// |------------------|--------------------------|
    /// | `GITHUB_TOKEN`   | (unset)                  |
    /// | `GITHUB_API_URL` | `https://api.github.com` |
    pub fn from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            tracing::warn!("GITHUB_TOKEN is not set, pull request comments are disabled");
        }

        let api_url =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Self { token, api_url }
    }
}

/// A comment as returned by the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    /// API URL of the comment, ending in `/comments/{id}`.
    pub url: String,
    pub html_url: Option<String>,
    pub body: Option<String>,
}

/// Errors from the GitHub REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum GitHubApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GitHub returned a non-2xx status code.
    #[error("GitHub API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// No token is configured.
    #[error("GitHub client is not configured")]
    NotConfigured,
}

/// HTTP client for the GitHub REST API.
pub struct GitHubApi {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubApi {
    pub fn new(config: GitHubConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GitHubConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Post a new comment on a pull request.
    pub async fn create_comment(
        &self,
        pr: &PullRequestRef,
        body: &str,
    ) -> Result<IssueComment, GitHubApiError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, pr.owner, pr.repo, pr.number
        );
        let request = self.authorized(self.client.post(url))?;
        let response = request
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Replace the body of an existing comment.
    pub async fn edit_comment(
        &self,
        pr: &PullRequestRef,
        comment_id: u64,
        body: &str,
    ) -> Result<IssueComment, GitHubApiError> {
        let url = format!(
            "{}/repos/{}/{}/issues/comments/{}",
            self.api_url, pr.owner, pr.repo, comment_id
        );
        let request = self.authorized(self.client.patch(url))?;
        let response = request
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, GitHubApiError> {
        let token = self.token.as_deref().ok_or(GitHubApiError::NotConfigured)?;
        Ok(request
            .bearer_auth(token)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, ACCEPT_VALUE))
    }

    /// Ensure the response has a success status code, or return an
    /// [`GitHubApiError::ApiError`] carrying the status and body.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GitHubApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GitHubApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GitHubApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
