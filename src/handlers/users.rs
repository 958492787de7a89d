use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{SetActiveRequest, UserPublic},
    services::AuthService,
};

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserPublic),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "users"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserPublic> {
    Json(UserPublic::from(&user))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/active",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Activation changed", body = UserPublic),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "users"
)]
pub async fn set_active(
    State(auth): State<AuthService>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<UserPublic>, AppError> {
    let user = auth.set_active(&actor, id, payload.active).await?;
    Ok(Json(UserPublic::from(&user)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/verify",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Email marked verified", body = UserPublic),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "users"
)]
pub async fn verify_email(
    State(auth): State<AuthService>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserPublic>, AppError> {
    let user = auth.verify_email(&actor, id).await?;
    Ok(Json(UserPublic::from(&user)))
}
