/// User administration endpoints
///
/// - `GET    /api/users/roles` - Role catalogue
/// - `GET    /api/users?role=&search=&isActive=&page=&limit=`
/// - `POST   /api/users`
/// - `GET    /api/users/:id` - Privileged roles, or the caller's own record
/// - `PUT    /api/users/:id`
/// - `DELETE /api/users/:id` - Deactivates; users are never removed

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use hrm_shared::{
    auth::middleware::AuthContext,
    models::{role::Role, user::UserFilter},
    services::users::{CreateUserRequest, UserPatch},
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,

    /// Role display name ("Team Leader")
    pub role: Option<String>,

    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// Create user request
///
/// Shape checks happen here; uniqueness and password strength are
/// enforced by the user service.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: String,

    #[validate(length(max = 20, message = "Employee ID must be at most 20 characters"))]
    pub employee_id: Option<String>,

    pub role: Option<Role>,

    pub department: Option<Uuid>,
}

impl From<CreateUserBody> for CreateUserRequest {
    fn from(body: CreateUserBody) -> Self {
        Self {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            employee_id: body.employee_id,
            role: body.role,
            department_id: body.department,
        }
    }
}

pub async fn list_roles() -> Json<Value> {
    Json(json!({
        "success": true,
        "roles": Role::ALL,
    }))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Value>> {
    let role = match query.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(r) if r.eq_ignore_ascii_case("all") => None,
        Some(r) => Some(
            r.parse::<Role>()
                .map_err(|e| ApiError::Validation(e.to_string()))?,
        ),
    };
    let filter = UserFilter {
        role,
        search: query.search.filter(|s| !s.trim().is_empty()),
        is_active: query.is_active,
    };
    let page = state.config.page(query.page, query.limit);

    let users = state
        .services
        .users
        .list(&auth.actor, &filter, page)
        .await?;

    Ok(Json(json!({
        "success": true,
        "pagination": users.pagination(),
        "users": users.items,
    })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let user = state.services.users.get(&auth.actor, id).await?;

    Ok(Json(json!({
        "success": true,
        "user": user,
    })))
}

/// Create user
///
/// # Errors
///
/// - `400`: malformed fields (with `details`), weak password, duplicate
///   email or employee ID, unknown department
/// - `403`: caller is not privileged
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    body.validate()?;

    let user = state
        .services
        .users
        .create(&auth.actor, body.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "user": user,
        })),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UserPatch>,
) -> ApiResult<Json<Value>> {
    let user = state
        .services
        .users
        .update(&auth.actor, id, patch)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully",
        "user": user,
    })))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let user = state.services.users.deactivate(&auth.actor, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User deactivated successfully",
        "user": user,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> CreateUserBody {
        CreateUserBody {
            email: "new.hire@company.com".to_string(),
            password: "Str0ng!Pass".to_string(),
            first_name: "New".to_string(),
            last_name: "Hire".to_string(),
            employee_id: None,
            role: None,
            department: None,
        }
    }

    #[test]
    fn test_valid_body_passes() {
        assert!(body().validate().is_ok());
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let bad = CreateUserBody {
            email: "not-an-email".to_string(),
            first_name: String::new(),
            ..body()
        };

        let err = ApiError::from(bad.validate().unwrap_err());
        match err {
            ApiError::InvalidFields(details) => {
                let fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "first_name"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
