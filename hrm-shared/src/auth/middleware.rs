/// Bearer-token authentication for Axum
///
/// [`authenticate`] validates the `Authorization: Bearer <token>` header,
/// then loads the user from the store. The token only proves identity: role
/// and active flag always come from the stored record, so a demoted or
/// deactivated user loses access immediately.
///
/// [`auth_middleware`] wraps it for `axum::middleware::from_fn` and inserts an
/// [`AuthContext`] into the request extensions.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use hrm_shared::auth::middleware::{auth_middleware, AuthContext};
/// use hrm_shared::store::{MemoryStore, Store};
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     auth.user.full_name()
/// }
///
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let secret = String::from("a-secret-of-at-least-thirty-two-bytes");
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(move |req, next| {
///         auth_middleware(store.clone(), secret.clone(), req, next)
///     }));
/// ```

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::authorization::Actor;
use super::jwt::{validate_access_token, JwtError};
use crate::models::user::User;
use crate::store::{Store, UserStore};

/// Authenticated caller, available to handlers via `Extension<AuthContext>`
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub actor: Actor,
}

impl AuthContext {
    pub fn new(user: User) -> Self {
        let actor = Actor::from(&user);
        Self { user, actor }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access denied. No token provided.")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but the account is gone or deactivated
    #[error("Invalid token or user account is inactive.")]
    InactiveUser,

    #[error("Authentication lookup failed: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::InvalidFormat(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AuthError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            _ => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        };

        let message = match &self {
            AuthError::DatabaseError(detail) => {
                tracing::error!(error = %detail, "Authentication lookup failed");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "error": code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Pulls the raw token out of `Authorization: Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not valid text".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// Resolves request headers to an active user
pub async fn authenticate<S>(
    store: &S,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError>
where
    S: UserStore + ?Sized,
{
    let token = extract_bearer(headers)?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        JwtError::WrongType { .. } => AuthError::InvalidToken("Invalid token type".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    let user = store
        .user_by_id(claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .filter(|user| user.is_active)
        .ok_or(AuthError::InactiveUser)?;

    Ok(AuthContext::new(user))
}

/// Axum middleware inserting [`AuthContext`] on success
pub async fn auth_middleware(
    store: Arc<dyn Store>,
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = authenticate(store.as_ref(), &secret, req.headers()).await?;

    tracing::debug!(
        user_id = %context.user.id,
        role = %context.user.role,
        "Request authenticated"
    );

    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
