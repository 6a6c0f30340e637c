//! Role checks applied at the HTTP boundary.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use benchyard_core::error::CoreError;
use benchyard_core::roles::is_privileged;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` or `privileged` role. Rejects with 403 Forbidden
/// otherwise.
///
/// ```ignore
/// async fn enqueue(RequirePrivileged(user): RequirePrivileged) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequirePrivileged(pub AuthUser);

impl FromRequestParts<AppState> for RequirePrivileged {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_privileged(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Privileged role required".into(),
            )));
        }
        Ok(RequirePrivileged(user))
    }
}
