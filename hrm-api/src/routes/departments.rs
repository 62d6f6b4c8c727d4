/// Department endpoints
///
/// - `GET    /api/departments?search=&isActive=&page=&limit=`
/// - `POST   /api/departments`
/// - `GET    /api/departments/:id`
/// - `PUT    /api/departments/:id`
/// - `DELETE /api/departments/:id` (refused while teams reference it)

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use hrm_shared::{
    auth::middleware::AuthContext,
    models::department::DepartmentFilter,
    services::departments::{CreateDepartmentRequest, DepartmentPatch},
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_departments(
    State(state): State<AppState>,
    Query(query): Query<DepartmentQuery>,
) -> ApiResult<Json<Value>> {
    let filter = DepartmentFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        is_active: query.is_active,
    };
    let page = state.config.page(query.page, query.limit);

    let departments = state.services.departments.list(&filter, page).await?;

    Ok(Json(json!({
        "success": true,
        "pagination": departments.pagination(),
        "departments": departments.items,
    })))
}

pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let department = state.services.departments.get(id).await?;

    Ok(Json(json!({
        "success": true,
        "department": department,
    })))
}

pub async fn create_department(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateDepartmentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let department = state
        .services
        .departments
        .create(&auth.actor, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Department created successfully",
            "department": department,
        })),
    ))
}

pub async fn update_department(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DepartmentPatch>,
) -> ApiResult<Json<Value>> {
    let department = state
        .services
        .departments
        .update(&auth.actor, id, patch)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Department updated successfully",
        "department": department,
    })))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.services.departments.delete(&auth.actor, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Department deleted successfully",
    })))
}
