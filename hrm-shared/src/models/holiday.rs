/// Holiday model and database operations
///
/// Holidays are calendar dates, not instants. At most one *active* holiday
/// may exist per date; deleting a holiday only clears `is_active`, after
/// which the date is free again.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE holiday_type AS ENUM ('National', 'Religious', 'Regional', 'Company', 'Optional');
///
/// CREATE TABLE holidays (
///     id UUID PRIMARY KEY,
///     holiday_name TEXT NOT NULL,
///     date DATE NOT NULL,
///     holiday_type holiday_type NOT NULL,
///     description TEXT,
///     day TEXT NOT NULL,
///     year INTEGER NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_by UUID,
///     updated_by UUID,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
/// CREATE UNIQUE INDEX holidays_active_date_key ON holidays (date) WHERE is_active;
/// ```

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Holiday classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "holiday_type")]
pub enum HolidayType {
    National,
    Religious,
    Regional,
    Company,
    Optional,
}

impl HolidayType {
    pub const ALL: [HolidayType; 5] = [
        HolidayType::National,
        HolidayType::Religious,
        HolidayType::Regional,
        HolidayType::Company,
        HolidayType::Optional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HolidayType::National => "National",
            HolidayType::Religious => "Religious",
            HolidayType::Regional => "Regional",
            HolidayType::Company => "Company",
            HolidayType::Optional => "Optional",
        }
    }
}

impl fmt::Display for HolidayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown holiday type: {0}")]
pub struct UnknownHolidayType(pub String);

impl FromStr for HolidayType {
    type Err = UnknownHolidayType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HolidayType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownHolidayType(s.to_string()))
    }
}

/// Parses a holiday date from user input
///
/// Accepts a plain `YYYY-MM-DD` date, an RFC 3339 timestamp, or an ISO
/// datetime without offset. A timestamp with an offset is reduced to its UTC
/// calendar date and one without keeps its own date, so two inputs on the
/// same day always compare equal.
pub fn parse_holiday_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .or_else(|| input.parse::<NaiveDateTime>().ok().map(|dt| dt.date()))
}

/// Holiday model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: Uuid,

    pub holiday_name: String,

    pub date: NaiveDate,

    pub holiday_type: HolidayType,

    pub description: Option<String>,

    /// Weekday name derived from `date` ("Wednesday")
    pub day: String,

    /// Calendar year derived from `date`
    pub year: i32,

    /// Soft-delete marker
    pub is_active: bool,

    pub created_by: Option<Uuid>,

    pub updated_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Holiday {
    /// Builds a new active holiday, deriving `day` and `year`
    pub fn new(
        holiday_name: String,
        date: NaiveDate,
        holiday_type: HolidayType,
        description: Option<String>,
        created_by: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let mut holiday = Self {
            id: Uuid::new_v4(),
            holiday_name,
            date,
            holiday_type,
            description,
            day: String::new(),
            year: 0,
            is_active: true,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        holiday.set_date(date);
        holiday
    }

    /// Moves the holiday and recomputes the derived fields
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.day = date.format("%A").to_string();
        self.year = date.year();
    }
}

/// Filters for listing holidays
///
/// Listing always excludes inactive holidays.
#[derive(Debug, Clone, Default)]
pub struct HolidayFilter {
    pub year: Option<i32>,

    /// 1..=12, only honoured together with `year`
    pub month: Option<u32>,

    pub holiday_type: Option<HolidayType>,
}

impl HolidayFilter {
    /// Inclusive date range implied by `year` + `month`, if both are set
    pub fn month_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let year = self.year?;
        let month = self.month?;
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some((start, next.pred_opt()?))
    }

    pub fn matches(&self, holiday: &Holiday) -> bool {
        if !holiday.is_active {
            return false;
        }
        if self.year.is_some_and(|y| holiday.year != y) {
            return false;
        }
        if let Some((start, end)) = self.month_range() {
            if holiday.date < start || holiday.date > end {
                return false;
            }
        }
        if self.holiday_type.is_some_and(|t| holiday.holiday_type != t) {
            return false;
        }
        true
    }
}

const HOLIDAY_COLUMNS: &str = "id, holiday_name, date, holiday_type, description, day, year, \
     is_active, created_by, updated_by, created_at, updated_at";

impl Holiday {
    /// Inserts a holiday
    ///
    /// # Errors
    ///
    /// Returns a unique violation if another active holiday has the same date.
    pub async fn insert(pool: &PgPool, holiday: &Holiday) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO holidays ({HOLIDAY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {HOLIDAY_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Holiday>(&query)
            .bind(holiday.id)
            .bind(&holiday.holiday_name)
            .bind(holiday.date)
            .bind(holiday.holiday_type)
            .bind(&holiday.description)
            .bind(&holiday.day)
            .bind(holiday.year)
            .bind(holiday.is_active)
            .bind(holiday.created_by)
            .bind(holiday.updated_by)
            .bind(holiday.created_at)
            .bind(holiday.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {HOLIDAY_COLUMNS} FROM holidays WHERE id = $1");

        sqlx::query_as::<_, Holiday>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the active holiday on a date, ignoring `exclude`
    pub async fn find_active_on(
        pool: &PgPool,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {HOLIDAY_COLUMNS} FROM holidays
            WHERE date = $1 AND is_active = TRUE AND ($2::uuid IS NULL OR id <> $2)
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, Holiday>(&query)
            .bind(date)
            .bind(exclude)
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable column, including the soft-delete flag
    pub async fn update(pool: &PgPool, holiday: &Holiday) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE holidays
            SET holiday_name = $2, date = $3, holiday_type = $4, description = $5,
                day = $6, year = $7, is_active = $8, updated_by = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {HOLIDAY_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Holiday>(&query)
            .bind(holiday.id)
            .bind(&holiday.holiday_name)
            .bind(holiday.date)
            .bind(holiday.holiday_type)
            .bind(&holiday.description)
            .bind(&holiday.day)
            .bind(holiday.year)
            .bind(holiday.is_active)
            .bind(holiday.updated_by)
            .fetch_optional(pool)
            .await
    }

    /// Lists active holidays by ascending date with the total match count
    pub async fn list(
        pool: &PgPool,
        filter: &HolidayFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        const WHERE: &str = r#"
            is_active = TRUE
            AND ($1::integer IS NULL OR year = $1)
            AND ($2::date IS NULL OR date >= $2)
            AND ($3::date IS NULL OR date <= $3)
            AND ($4::holiday_type IS NULL OR holiday_type = $4)
        "#;

        let (start, end) = filter.month_range().unzip();

        let query = format!(
            "SELECT {HOLIDAY_COLUMNS} FROM holidays WHERE {WHERE} ORDER BY date ASC LIMIT $5 OFFSET $6"
        );
        let holidays = sqlx::query_as::<_, Holiday>(&query)
            .bind(filter.year)
            .bind(start)
            .bind(end)
            .bind(filter.holiday_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM holidays WHERE {WHERE}");
        let (total,): (i64,) = sqlx::query_as(&count_query)
            .bind(filter.year)
            .bind(start)
            .bind(end)
            .bind(filter.holiday_type)
            .fetch_one(pool)
            .await?;

        Ok((holidays, total))
    }

    /// Active holidays on or after `from`, soonest first
    pub async fn upcoming(pool: &PgPool, from: NaiveDate, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {HOLIDAY_COLUMNS} FROM holidays
            WHERE is_active = TRUE AND date >= $1
            ORDER BY date ASC
            LIMIT $2
            "#
        );

        sqlx::query_as::<_, Holiday>(&query)
            .bind(from)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// All active holidays in a year, by date
    pub async fn list_active_in_year(pool: &PgPool, year: i32) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {HOLIDAY_COLUMNS} FROM holidays WHERE is_active = TRUE AND year = $1 ORDER BY date ASC"
        );

        sqlx::query_as::<_, Holiday>(&query)
            .bind(year)
            .fetch_all(pool)
            .await
    }
}
