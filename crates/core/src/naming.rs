//! Run name and origin normalisation.
//!
//! Run names end up in dashboard query strings (`var-testrun=<name>`) and in
//! terraform variables, so they are restricted to a conservative character
//! set after whitespace has been folded into underscores.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Characters allowed in a run name after sanitisation.
const RUN_NAME_PATTERN: &str = r"^[a-zA-Z0-9.:_-]*$";

static RUN_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RUN_NAME_PATTERN).expect("valid regex"));

/// Trim a user-supplied label and replace every inner whitespace character
/// with an underscore.
///
/// # Examples
///
/// ```
/// use benchyard_core::naming::sanitize_label;
///
/// assert_eq!(sanitize_label("  my bench "), "my_bench");
/// assert_eq!(sanitize_label("a\tb"), "a_b");
/// ```
pub fn sanitize_label(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Sanitise a run name and check it against [`RUN_NAME_PATTERN`].
pub fn normalize_run_name(raw: &str) -> Result<String, CoreError> {
    let name = sanitize_label(raw);
    if name.is_empty() {
        return Err(CoreError::Validation("name must not be empty".into()));
    }
    if !RUN_NAME_RE.is_match(&name) {
        return Err(CoreError::Validation(format!(
            "invalid run name '{name}': only letters, digits and '.', ':', '_', '-' are allowed"
        )));
    }
    Ok(name)
}

/// Sanitise an optional origin tag. Blank origins collapse to `None`.
pub fn normalize_origin(raw: Option<&str>) -> Option<String> {
    raw.map(sanitize_label).filter(|o| !o.is_empty())
}
