//! Holiday calendar
//!
//! At most one active holiday exists per calendar date. Dates are compared
//! as `NaiveDate`, so a timestamp input collides with a plain date on the
//! same day. Deleting only clears `is_active`, which frees the date again.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{authorize, Actor, Operation, Resource, ResourceKind};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    holiday::{parse_holiday_date, Holiday, HolidayFilter, HolidayType},
    page::{Page, PageRequest},
    team::double_option,
};
use crate::store::{Store, StoreError};

pub const DEFAULT_UPCOMING_LIMIT: u32 = 5;
const STATS_UPCOMING_LIMIT: u32 = 3;
const REQUIRED_FIELDS: &str = "Holiday name, date, and type are required";

/// Fields of a new holiday as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayInput {
    pub holiday_name: Option<String>,
    pub date: Option<String>,
    pub holiday_type: Option<String>,
    pub description: Option<String>,
}

/// Partial update; `description: null` clears the description
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayPatch {
    pub holiday_name: Option<String>,
    pub date: Option<String>,
    pub holiday_type: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkError {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub created_count: usize,
    pub error_count: usize,
    pub created_holidays: Vec<Holiday>,
    pub errors: Vec<BulkError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidaySummary {
    pub holiday_name: String,
    pub date: NaiveDate,
    pub day: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeBreakdown {
    #[serde(rename = "type")]
    pub holiday_type: HolidayType,
    pub count: usize,
    pub holidays: Vec<HolidaySummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayStats {
    pub year: i32,
    pub total_holidays: usize,
    pub holidays_by_type: Vec<TypeBreakdown>,
    pub upcoming_holidays: Vec<Holiday>,
}

pub struct HolidayService {
    store: Arc<dyn Store>,
}

impl HolidayService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &HolidayFilter, page: PageRequest) -> ServiceResult<Page<Holiday>> {
        Ok(self.store.list_holidays(filter, page).await?)
    }

    /// Active holidays from today on, soonest first
    pub async fn upcoming(&self, limit: u32) -> ServiceResult<Vec<Holiday>> {
        let today = Utc::now().date_naive();
        Ok(self.store.upcoming_holidays(today, limit.max(1)).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Holiday> {
        self.store
            .holiday_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Holiday not found"))
    }

    pub async fn create(&self, actor: &Actor, input: HolidayInput) -> ServiceResult<Holiday> {
        authorize(actor, &Resource::Collection(ResourceKind::Holiday), Operation::Create)?;

        let holiday = self.insert_new(actor, input, "A holiday already exists on this date").await?;

        info!(
            holiday_id = %holiday.id,
            actor_id = %actor.id,
            date = %holiday.date,
            "Holiday created"
        );
        Ok(holiday)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, patch: HolidayPatch) -> ServiceResult<Holiday> {
        let mut holiday = self.get(id).await?;
        authorize(actor, &Resource::Holiday, Operation::Update)?;

        if let Some(date) = patch.date.as_deref() {
            let date = parse_date(date)?;
            if holiday.is_active
                && date != holiday.date
                && self.store.active_holiday_on(date, Some(id)).await?.is_some()
            {
                return Err(ServiceError::conflict("Another holiday already exists on this date"));
            }
            holiday.set_date(date);
        }
        if let Some(name) = patch.holiday_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            holiday.holiday_name = name.to_string();
        }
        if let Some(holiday_type) = patch.holiday_type.as_deref() {
            holiday.holiday_type = parse_type(holiday_type)?;
        }
        if let Some(description) = patch.description {
            holiday.description = description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());
        }
        holiday.updated_by = Some(actor.id);
        holiday.updated_at = Utc::now();

        let holiday = self
            .store
            .update_holiday(&holiday)
            .await
            .map_err(|e| date_taken(e, "Another holiday already exists on this date"))?
            .ok_or_else(|| ServiceError::not_found("Holiday not found"))?;

        info!(holiday_id = %id, actor_id = %actor.id, "Holiday updated");
        Ok(holiday)
    }

    /// Soft delete
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let mut holiday = self.get(id).await?;
        authorize(actor, &Resource::Holiday, Operation::Delete)?;

        holiday.is_active = false;
        holiday.updated_by = Some(actor.id);
        holiday.updated_at = Utc::now();

        self.store
            .update_holiday(&holiday)
            .await?
            .ok_or_else(|| ServiceError::not_found("Holiday not found"))?;

        info!(holiday_id = %id, actor_id = %actor.id, "Holiday deactivated");
        Ok(())
    }

    /// Creates each item independently, collecting per-index failures
    pub async fn bulk_create(&self, actor: &Actor, items: Vec<HolidayInput>) -> ServiceResult<BulkOutcome> {
        authorize(actor, &Resource::Collection(ResourceKind::Holiday), Operation::Create)?;

        if items.is_empty() {
            return Err(ServiceError::validation(
                "Holidays array is required and cannot be empty",
            ));
        }

        let mut created_holidays = Vec::new();
        let mut errors = Vec::new();

        for (index, input) in items.into_iter().enumerate() {
            let taken = format!(
                "Holiday already exists on {}",
                input.date.as_deref().unwrap_or_default().trim()
            );
            match self.insert_new(actor, input, &taken).await {
                Ok(holiday) => created_holidays.push(holiday),
                Err(ServiceError::Store(err)) => return Err(err.into()),
                Err(err) => errors.push(BulkError {
                    index,
                    error: err.to_string(),
                }),
            }
        }

        info!(
            actor_id = %actor.id,
            created = created_holidays.len(),
            failed = errors.len(),
            "Bulk holiday import finished"
        );

        Ok(BulkOutcome {
            created_count: created_holidays.len(),
            error_count: errors.len(),
            created_holidays,
            errors,
        })
    }

    pub async fn stats(&self, year: i32) -> ServiceResult<HolidayStats> {
        let holidays = self.store.holidays_in_year(year).await?;

        let mut by_type: BTreeMap<HolidayType, Vec<HolidaySummary>> = BTreeMap::new();
        for holiday in &holidays {
            by_type
                .entry(holiday.holiday_type)
                .or_default()
                .push(HolidaySummary {
                    holiday_name: holiday.holiday_name.clone(),
                    date: holiday.date,
                    day: holiday.day.clone(),
                });
        }

        let holidays_by_type = by_type
            .into_iter()
            .map(|(holiday_type, holidays)| TypeBreakdown {
                holiday_type,
                count: holidays.len(),
                holidays,
            })
            .collect();

        let upcoming_holidays = self.upcoming(STATS_UPCOMING_LIMIT).await?;

        debug!(year, total = holidays.len(), "Holiday stats computed");

        Ok(HolidayStats {
            year,
            total_holidays: holidays.len(),
            holidays_by_type,
            upcoming_holidays,
        })
    }

    async fn insert_new(&self, actor: &Actor, input: HolidayInput, taken: &str) -> ServiceResult<Holiday> {
        let name = input
            .holiday_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let (Some(name), Some(date), Some(holiday_type)) =
            (name, input.date.as_deref(), input.holiday_type.as_deref())
        else {
            return Err(ServiceError::validation(REQUIRED_FIELDS));
        };

        let date = parse_date(date)?;
        let holiday_type = parse_type(holiday_type)?;

        if self.store.active_holiday_on(date, None).await?.is_some() {
            return Err(ServiceError::conflict(taken));
        }

        let description = input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let holiday = Holiday::new(name.to_string(), date, holiday_type, description, Some(actor.id));

        self.store
            .insert_holiday(holiday)
            .await
            .map_err(|e| date_taken(e, taken))
    }
}

fn parse_date(input: &str) -> ServiceResult<NaiveDate> {
    parse_holiday_date(input)
        .ok_or_else(|| ServiceError::validation(format!("Invalid holiday date: {}", input.trim())))
}

fn parse_type(input: &str) -> ServiceResult<HolidayType> {
    input.parse().map_err(|_| {
        let allowed: Vec<&str> = HolidayType::ALL.iter().map(HolidayType::as_str).collect();
        ServiceError::validation(format!(
            "Invalid holiday type. Must be one of: {}",
            allowed.join(", ")
        ))
    })
}

/// The partial unique index fired: another request took the date first
fn date_taken(err: StoreError, message: &str) -> ServiceError {
    match err {
        StoreError::UniqueViolation(_) => ServiceError::conflict(message),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_lists_choices() {
        assert_eq!(parse_type("company").unwrap(), HolidayType::Company);

        let err = parse_type("Bank").unwrap_err().to_string();
        assert!(err.contains("National, Religious, Regional, Company, Optional"));
    }

    #[test]
    fn test_patch_distinguishes_null_description() {
        let cleared: HolidayPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let untouched: HolidayPatch = serde_json::from_str(r#"{"holidayName": "Diwali"}"#).unwrap();
        assert!(untouched.description.is_none());
    }

    #[test]
    fn test_type_breakdown_shape() {
        let breakdown = TypeBreakdown {
            holiday_type: HolidayType::National,
            count: 1,
            holidays: vec![HolidaySummary {
                holiday_name: "Republic Day".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 26).unwrap(),
                day: "Friday".to_string(),
            }],
        };
        let json = serde_json::to_value(breakdown).unwrap();
        assert_eq!(json["type"], "National");
        assert_eq!(json["holidays"][0]["holidayName"], "Republic Day");
        assert_eq!(json["holidays"][0]["date"], "2024-01-26");
    }
}
