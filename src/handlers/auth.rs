use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{LoginRequest, RefreshRequest, RegisterRequest, Token, UserPublic},
    services::{AuthService, TokenPair},
};

impl From<TokenPair> for Token {
    fn from(pair: TokenPair) -> Self {
        Token {
            user: UserPublic::from(&pair.user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserPublic),
        (status = 400, description = "Invalid username, email or password"),
        (status = 409, description = "Email or username already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(auth): State<AuthService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserPublic>), AppError> {
    let user = auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(UserPublic::from(&user))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Token),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(auth): State<AuthService>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Token>, AppError> {
    let tokens = auth.login(&payload.email, &payload.password).await?;
    Ok(Json(tokens.into()))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = Token),
        (status = 401, description = "Invalid refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(auth): State<AuthService>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<Token>, AppError> {
    let tokens = auth.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens.into()))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Refresh token revoked"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    ),
    tag = "auth"
)]
pub async fn logout(
    State(auth): State<AuthService>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    auth.logout(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
