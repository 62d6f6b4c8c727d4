/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Exchange a refresh token for an access token
/// - `GET  /api/auth/profile` - Current user

use crate::{app::AppState, error::ApiResult, extract::Json};
use axum::{extract::State, Extension};
use hrm_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::AuthContext,
    },
    models::user::User,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,

    /// Access token
    pub token: String,

    pub refresh_token: String,

    pub user: User,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,

    /// New access token
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: User,
}

/// Login endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "email": "user@company.com", "password": "SecureP@ss123" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `401 Unauthorized`: wrong credentials or deactivated account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = state
        .services
        .users
        .authenticate(&req.email, &req.password)
        .await?;

    let tokens = jwt::issue_token_pair(
        user.id,
        user.role,
        state.config.access_ttl(),
        state.jwt_secret(),
    )?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user,
    }))
}

/// Token refresh endpoint
///
/// The new access token carries the user's current role, so a role change
/// takes effect at the next refresh.
///
/// # Errors
///
/// - `401 Unauthorized`: invalid or expired refresh token, or the account
///   is gone or deactivated
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    req.validate()?;

    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;
    let user = state.services.users.active_user(claims.sub).await?;

    let access = Claims::with_expiration(
        user.id,
        user.role,
        TokenType::Access,
        state.config.access_ttl(),
    );
    let token = jwt::create_token(&access, state.jwt_secret())?;

    info!(user_id = %user.id, "Access token refreshed");
    Ok(Json(RefreshResponse {
        success: true,
        token,
    }))
}

pub async fn profile(Extension(auth): Extension<AuthContext>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: auth.user,
    })
}
