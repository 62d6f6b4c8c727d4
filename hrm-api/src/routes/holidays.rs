/// Holiday endpoints
///
/// Reads are open to every authenticated user; writes need Admin or HR.
///
/// - `GET    /api/holidays?year=&month=&type=&page=&limit=`
/// - `GET    /api/holidays/upcoming?limit=`
/// - `GET    /api/holidays/stats?year=`
/// - `GET    /api/holidays/:id`
/// - `POST   /api/holidays`
/// - `POST   /api/holidays/bulk`
/// - `PUT    /api/holidays/:id`
/// - `DELETE /api/holidays/:id` (soft delete)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::{Datelike, Utc};
use hrm_shared::{
    auth::middleware::AuthContext,
    models::holiday::{HolidayFilter, HolidayType},
    services::holidays::{
        BulkOutcome, HolidayInput, HolidayPatch, HolidayStats, DEFAULT_UPCOMING_LIMIT,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct HolidayQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub year: Option<i32>,
    pub month: Option<u32>,

    /// Holiday type, or `all`
    #[serde(rename = "type")]
    pub holiday_type: Option<String>,
}

impl HolidayQuery {
    fn filter(&self) -> ApiResult<HolidayFilter> {
        if self.month.is_some_and(|m| !(1..=12).contains(&m)) {
            return Err(ApiError::Validation("Month must be between 1 and 12".to_string()));
        }

        let holiday_type = match self.holiday_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(t) if t.eq_ignore_ascii_case("all") => None,
            Some(t) => Some(
                t.parse::<HolidayType>()
                    .map_err(|e| ApiError::Validation(e.to_string()))?,
            ),
        };

        Ok(HolidayFilter {
            year: self.year,
            month: self.month,
            holiday_type,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub holidays: Vec<HolidayInput>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,

    #[serde(flatten)]
    pub stats: HolidayStats,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,
    pub message: String,

    #[serde(flatten)]
    pub outcome: BulkOutcome,
}

pub async fn list_holidays(
    State(state): State<AppState>,
    Query(query): Query<HolidayQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.filter()?;
    let page = state
        .config
        .page_with_default(query.page, query.limit, DEFAULT_LIST_LIMIT);

    let holidays = state.services.holidays.list(&filter, page).await?;

    Ok(Json(json!({
        "success": true,
        "pagination": holidays.pagination(),
        "holidays": holidays.items,
    })))
}

pub async fn upcoming_holidays(
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_UPCOMING_LIMIT)
        .clamp(1, state.config.pagination.max_limit.max(1));
    let holidays = state.services.holidays.upcoming(limit).await?;

    Ok(Json(json!({
        "success": true,
        "count": holidays.len(),
        "holidays": holidays,
    })))
}

/// Per-year statistics, defaulting to the current year
pub async fn holiday_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<StatsResponse>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let stats = state.services.holidays.stats(year).await?;

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

pub async fn get_holiday(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let holiday = state.services.holidays.get(id).await?;

    Ok(Json(json!({
        "success": true,
        "holiday": holiday,
    })))
}

/// Create holiday
///
/// ```text
/// POST /api/holidays
///
/// {
///   "holidayName": "Christmas",
///   "date": "2024-12-25",
///   "holidayType": "National",
///   "description": "..."
/// }
/// ```
///
/// # Errors
///
/// - `400`: missing fields, unknown type, bad date, an active holiday
///   already on that date
/// - `403`: caller is not Admin or HR
pub async fn create_holiday(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(input): Json<HolidayInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let holiday = state.services.holidays.create(&auth.actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Holiday created successfully",
            "holiday": holiday,
        })),
    ))
}

/// Creates each entry independently and reports per-index failures
pub async fn bulk_create_holidays(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BulkRequest>,
) -> ApiResult<(StatusCode, Json<BulkResponse>)> {
    let outcome = state
        .services
        .holidays
        .bulk_create(&auth.actor, request.holidays)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BulkResponse {
            success: true,
            message: format!("Successfully created {} holidays", outcome.created_count),
            outcome,
        }),
    ))
}

pub async fn update_holiday(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<HolidayPatch>,
) -> ApiResult<Json<Value>> {
    let holiday = state
        .services
        .holidays
        .update(&auth.actor, id, patch)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Holiday updated successfully",
        "holiday": holiday,
    })))
}

pub async fn delete_holiday(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.services.holidays.delete(&auth.actor, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Holiday deleted successfully",
    })))
}
