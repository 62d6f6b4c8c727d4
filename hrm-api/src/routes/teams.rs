/// Team endpoints
///
/// # Endpoints
///
/// - `GET    /api/teams` - Role-scoped, paginated list
/// - `GET    /api/teams/my-teams` - Teams managed by the caller (Team Managers)
/// - `GET    /api/teams/my-team` - Team led by the caller (Team Leaders)
/// - `GET    /api/teams/unassigned-employees` - Active Employees without a team
/// - `POST   /api/teams` - Create team
/// - `GET    /api/teams/:id` - Get team
/// - `PUT    /api/teams/:id` - Update team
/// - `DELETE /api/teams/:id` - Delete an empty team
/// - `POST   /api/teams/:id/members` - Add member
/// - `DELETE /api/teams/:id/members/:user_id` - Remove member
///
/// Every team in a response carries `currentSize`, the member count.

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use hrm_shared::{
    auth::middleware::AuthContext,
    models::team::{Team, TeamFilter, TeamPatch},
    services::roster::{AddMemberRequest, CreateTeamRequest},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Team as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    #[serde(flatten)]
    pub team: Team,

    pub current_size: usize,
}

impl From<Team> for TeamView {
    fn from(team: Team) -> Self {
        let current_size = team.member_count();
        Self { team, current_size }
    }
}

/// `GET /api/teams` query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub department: Option<Uuid>,
    pub is_active: Option<bool>,
}

pub async fn list_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<Json<Value>> {
    let filter = TeamFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        department_id: query.department,
        is_active: query.is_active,
        ..Default::default()
    };
    let page = state.config.page(query.page, query.limit);

    let teams = state
        .services
        .roster
        .list_teams(&auth.actor, filter, page)
        .await?;
    let pagination = teams.pagination();
    let teams: Vec<TeamView> = teams.items.into_iter().map(TeamView::from).collect();

    Ok(Json(json!({
        "success": true,
        "teams": teams,
        "pagination": pagination,
    })))
}

pub async fn my_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let teams = state.services.roster.managed_teams(&auth.actor).await?;
    let teams: Vec<TeamView> = teams.into_iter().map(TeamView::from).collect();

    Ok(Json(json!({
        "success": true,
        "teams": teams,
    })))
}

pub async fn my_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let team = state.services.roster.led_team(&auth.actor).await?;

    Ok(Json(json!({
        "success": true,
        "team": TeamView::from(team),
    })))
}

pub async fn unassigned_employees(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let employees = state
        .services
        .roster
        .unassigned_employees(&auth.actor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": employees.len(),
        "employees": employees,
    })))
}

pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let team = state.services.roster.get_team(&auth.actor, id).await?;

    Ok(Json(json!({
        "success": true,
        "team": TeamView::from(team),
    })))
}

/// Create team
///
/// ```text
/// POST /api/teams
///
/// {
///   "name": "Platform",
///   "code": "plt",
///   "department": "uuid",
///   "teamManager": "uuid",
///   "teamLeader": "uuid",
///   "maxSize": 8
/// }
/// ```
///
/// # Errors
///
/// - `400`: validation failure, duplicate name/code in the department,
///   manager/leader without the matching role
/// - `403`: caller is not privileged
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let team = state.services.roster.create_team(&auth.actor, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Team created successfully",
            "team": TeamView::from(team),
        })),
    ))
}

/// Update team
///
/// Privileged roles may change any field. The team's own manager may only
/// change `description`, `maxSize` and `teamLeader`.
pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TeamPatch>,
) -> ApiResult<Json<Value>> {
    let team = state
        .services
        .roster
        .update_team(&auth.actor, id, patch)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Team updated successfully",
        "team": TeamView::from(team),
    })))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.services.roster.delete_team(&auth.actor, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Team deleted successfully",
    })))
}

/// Add member
///
/// ```text
/// POST /api/teams/:id/members
///
/// { "userId": "uuid", "role": "Developer" }
/// ```
///
/// # Errors
///
/// - `400`: unknown or inactive user, already a member, member of another
///   team, team at capacity
/// - `403`: caller may not manage this team's roster
/// - `404`: team not found
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<Json<Value>> {
    let team = state
        .services
        .roster
        .add_member(&auth.actor, id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Member added to team successfully",
        "team": TeamView::from(team),
    })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    let team = state
        .services
        .roster
        .remove_member(&auth.actor, id, user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Member removed from team successfully",
        "team": TeamView::from(team),
    })))
}
