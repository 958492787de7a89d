use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{error::AppError, models::User, services::AuthService};

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Routes that embed an owner id in the path may only be used by that owner.
    pub fn ensure_owner(&self, path_user_id: Uuid) -> Result<(), AppError> {
        if self.0.id != path_user_id {
            tracing::debug!(caller = %self.0.id, %path_user_id, "path owner mismatch");
            return Err(AppError::Forbidden(
                "Not authorized to access tasks for this user".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthenticated(
                "Missing Authorization header".to_string(),
            ))?
            .to_str()
            .map_err(|_| AppError::Unauthenticated("Invalid Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthenticated("Invalid token format".to_string()))?;

        let auth = AuthService::from_ref(state);
        let user = auth.authenticate(token).await?;

        Ok(CurrentUser(user))
    }
}
