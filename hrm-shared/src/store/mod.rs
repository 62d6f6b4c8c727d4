/// Persistence abstraction
///
/// Services talk to storage only through the traits in this module, one per
/// aggregate, bundled into [`Store`]. Two implementations exist:
///
/// - [`postgres::PgStore`]: production, backed by the models' SQL
/// - [`memory::MemoryStore`]: in-process tables behind one lock, used by
///   tests and local demos
///
/// Both enforce the same uniqueness rules and the same team-version
/// semantics, so service behaviour does not depend on the backend.
///
/// # Roster writes
///
/// A team's roster and the members' `User.team_id` back-references change
/// together. [`TeamStore::save_team`] takes an optional [`MemberLink`] and
/// applies the team write and the user write as one atomic unit, or neither.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    department::{Department, DepartmentFilter},
    holiday::{Holiday, HolidayFilter},
    page::{Page, PageRequest},
    team::{Team, TeamFilter},
    user::{User, UserFilter},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write; carries the constraint name
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User-side effect of a roster write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberLink {
    /// Point the user's `team_id` at the saved team
    ///
    /// Fails the whole write if the user is inactive or already assigned
    /// elsewhere.
    Assign(Uuid),

    /// Clear the user's `team_id` if it points at the saved team
    Unassign(Uuid),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Writes everything except `team_id`
    async fn update_user(&self, user: &User) -> StoreResult<Option<User>>;

    async fn record_login(&self, id: Uuid) -> StoreResult<()>;

    /// Newest first
    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<Page<User>>;

    /// Active Employees with no team, by name
    async fn unassigned_employees(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait DepartmentStore: Send + Sync {
    async fn insert_department(&self, department: Department) -> StoreResult<Department>;

    async fn department_by_id(&self, id: Uuid) -> StoreResult<Option<Department>>;

    /// A department other than `exclude` with the same name (any case) or code
    async fn department_conflict(
        &self,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Department>>;

    async fn update_department(&self, department: &Department) -> StoreResult<Option<Department>>;

    async fn delete_department(&self, id: Uuid) -> StoreResult<bool>;

    /// Alphabetical
    async fn list_departments(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Department>>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn insert_team(&self, team: Team) -> StoreResult<Team>;

    async fn team_by_id(&self, id: Uuid) -> StoreResult<Option<Team>>;

    /// A team in `department_id`, other than `exclude`, whose name (any case)
    /// or code matches
    async fn team_conflict(
        &self,
        department_id: Uuid,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Team>>;

    /// Compare-and-swap write of the whole aggregate
    ///
    /// Succeeds only if the stored version still equals `expected_version`
    /// and, for [`MemberLink::Assign`], the user is free to join. Returns the
    /// stored team with version `expected_version + 1`, or `None` if the
    /// write lost a race; nothing is written in that case.
    async fn save_team(
        &self,
        team: &Team,
        expected_version: i64,
        link: Option<MemberLink>,
    ) -> StoreResult<Option<Team>>;

    /// Hard delete guarded by version
    async fn delete_team(&self, id: Uuid, expected_version: i64) -> StoreResult<bool>;

    /// Newest first
    async fn list_teams(&self, filter: &TeamFilter, page: PageRequest) -> StoreResult<Page<Team>>;

    async fn teams_managed_by(&self, user_id: Uuid) -> StoreResult<Vec<Team>>;

    async fn team_led_by(&self, user_id: Uuid) -> StoreResult<Option<Team>>;

    async fn count_teams_in_department(&self, department_id: Uuid) -> StoreResult<u64>;

    /// Whether any team names the user as manager, leader or member
    async fn user_referenced_by_team(&self, user_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait HolidayStore: Send + Sync {
    async fn insert_holiday(&self, holiday: Holiday) -> StoreResult<Holiday>;

    async fn holiday_by_id(&self, id: Uuid) -> StoreResult<Option<Holiday>>;

    /// The active holiday on `date`, other than `exclude`
    async fn active_holiday_on(
        &self,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Holiday>>;

    async fn update_holiday(&self, holiday: &Holiday) -> StoreResult<Option<Holiday>>;

    /// Active holidays only, by ascending date
    async fn list_holidays(
        &self,
        filter: &HolidayFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Holiday>>;

    async fn upcoming_holidays(&self, from: NaiveDate, limit: u32) -> StoreResult<Vec<Holiday>>;

    async fn holidays_in_year(&self, year: i32) -> StoreResult<Vec<Holiday>>;
}

/// Every aggregate store plus a liveness probe
#[async_trait]
pub trait Store: UserStore + DepartmentStore + TeamStore + HolidayStore {
    async fn ping(&self) -> StoreResult<()>;
}
