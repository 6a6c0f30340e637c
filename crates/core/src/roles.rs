//! Role names carried in capability tokens.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PRIVILEGED: &str = "privileged";

/// Whether `role` may enqueue and inspect runs.
pub fn is_privileged(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_PRIVILEGED
}
