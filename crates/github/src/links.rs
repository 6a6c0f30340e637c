//! Parsing of pull request and comment URLs.

/// Errors from link parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Invalid pull request link: {0}")]
    InvalidPrLink(String),

    #[error("Invalid comment link: {0}")]
    InvalidCommentLink(String),
}

/// Owner, repository and number identifying a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// Parse `https://github.com/<owner>/<repo>/pull/<number>`.
///
/// Segments are positional: the fourth segment (normally `pull`) is not
/// checked, and anything after the number is ignored.
pub fn parse_pr_link(link: &str) -> Result<PullRequestRef, LinkError> {
    let trimmed = link.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let parts: Vec<&str> = without_scheme.split('/').collect();
    if parts.len() < 5 {
        return Err(LinkError::InvalidPrLink(link.to_string()));
    }

    let (owner, repo) = (parts[1], parts[2]);
    if owner.is_empty() || repo.is_empty() {
        return Err(LinkError::InvalidPrLink(link.to_string()));
    }

    let number = parts[4]
        .parse::<u64>()
        .map_err(|_| LinkError::InvalidPrLink(link.to_string()))?;

    Ok(PullRequestRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
    })
}

/// Extract the numeric id from a comment API URL ending in `/comments/<id>`.
pub fn parse_comment_id(link: &str) -> Result<u64, LinkError> {
    let (_, id) = link
        .trim()
        .trim_end_matches('/')
        .rsplit_once("/comments/")
        .ok_or_else(|| LinkError::InvalidCommentLink(link.to_string()))?;

    id.parse::<u64>()
        .map_err(|_| LinkError::InvalidCommentLink(link.to_string()))
}
