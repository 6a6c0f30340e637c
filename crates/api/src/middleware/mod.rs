//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the caller from a JWT Bearer token.
//! - [`rbac::RequirePrivileged`] -- Requires the `admin` or `privileged` role.

pub mod auth;
pub mod rbac;
