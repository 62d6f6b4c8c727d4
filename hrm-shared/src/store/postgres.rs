/// PostgreSQL store
///
/// Thin adapter from the store traits onto the models' SQL. The only logic
/// that lives here is the roster transaction in [`TeamStore::save_team`].

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    DepartmentStore, HolidayStore, MemberLink, Store, StoreResult, TeamStore, UserStore,
};
use crate::db::pool::health_check;
use crate::models::{
    department::{Department, DepartmentFilter},
    holiday::{Holiday, HolidayFilter},
    page::{Page, PageRequest},
    team::{Team, TeamFilter},
    user::{User, UserFilter},
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn limit_offset(page: PageRequest) -> (i64, i64) {
    (i64::from(page.limit), page.offset() as i64)
}

fn to_page<T>(items: Vec<T>, total: i64, page: PageRequest) -> Page<T> {
    Page::new(items, total.max(0) as u64, page)
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        Ok(User::insert(&self.pool, &user).await?)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(&self, user: &User) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, user).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<Page<User>> {
        let (limit, offset) = limit_offset(page);
        let (users, total) = User::list(&self.pool, filter, limit, offset).await?;
        Ok(to_page(users, total, page))
    }

    async fn unassigned_employees(&self) -> StoreResult<Vec<User>> {
        Ok(User::list_unassigned_employees(&self.pool).await?)
    }
}

#[async_trait]
impl DepartmentStore for PgStore {
    async fn insert_department(&self, department: Department) -> StoreResult<Department> {
        Ok(Department::insert(&self.pool, &department).await?)
    }

    async fn department_by_id(&self, id: Uuid) -> StoreResult<Option<Department>> {
        Ok(Department::find_by_id(&self.pool, id).await?)
    }

    async fn department_conflict(
        &self,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Department>> {
        Ok(Department::find_conflicting(&self.pool, name, code, exclude).await?)
    }

    async fn update_department(&self, department: &Department) -> StoreResult<Option<Department>> {
        Ok(Department::update(&self.pool, department).await?)
    }

    async fn delete_department(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Department::delete(&self.pool, id).await?)
    }

    async fn list_departments(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Department>> {
        let (limit, offset) = limit_offset(page);
        let (departments, total) = Department::list(&self.pool, filter, limit, offset).await?;
        Ok(to_page(departments, total, page))
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn insert_team(&self, team: Team) -> StoreResult<Team> {
        Ok(Team::insert(&self.pool, &team).await?)
    }

    async fn team_by_id(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(Team::find_by_id(&self.pool, id).await?)
    }

    async fn team_conflict(
        &self,
        department_id: Uuid,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Team>> {
        Ok(Team::find_conflicting(&self.pool, department_id, name, code, exclude).await?)
    }

    async fn save_team(
        &self,
        team: &Team,
        expected_version: i64,
        link: Option<MemberLink>,
    ) -> StoreResult<Option<Team>> {
        let mut tx = self.pool.begin().await?;

        let Some(saved) = Team::save(&mut *tx, team, expected_version).await? else {
            debug!(team_id = %team.id, expected_version, "Team version moved, rolling back");
            tx.rollback().await?;
            return Ok(None);
        };

        let linked = match link {
            Some(MemberLink::Assign(user_id)) => User::assign_team(&mut *tx, user_id, team.id).await?,
            Some(MemberLink::Unassign(user_id)) => {
                User::unassign_team(&mut *tx, user_id, team.id).await?;
                true
            }
            None => true,
        };

        if !linked {
            debug!(team_id = %team.id, "User already assigned elsewhere, rolling back");
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(saved))
    }

    async fn delete_team(&self, id: Uuid, expected_version: i64) -> StoreResult<bool> {
        Ok(Team::delete(&self.pool, id, expected_version).await?)
    }

    async fn list_teams(&self, filter: &TeamFilter, page: PageRequest) -> StoreResult<Page<Team>> {
        let (limit, offset) = limit_offset(page);
        let (teams, total) = Team::list(&self.pool, filter, limit, offset).await?;
        Ok(to_page(teams, total, page))
    }

    async fn teams_managed_by(&self, user_id: Uuid) -> StoreResult<Vec<Team>> {
        Ok(Team::list_by_manager(&self.pool, user_id).await?)
    }

    async fn team_led_by(&self, user_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(Team::find_by_leader(&self.pool, user_id).await?)
    }

    async fn count_teams_in_department(&self, department_id: Uuid) -> StoreResult<u64> {
        let count = Team::count_by_department(&self.pool, department_id).await?;
        Ok(count.max(0) as u64)
    }

    async fn user_referenced_by_team(&self, user_id: Uuid) -> StoreResult<bool> {
        Ok(Team::any_references_user(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl HolidayStore for PgStore {
    async fn insert_holiday(&self, holiday: Holiday) -> StoreResult<Holiday> {
        Ok(Holiday::insert(&self.pool, &holiday).await?)
    }

    async fn holiday_by_id(&self, id: Uuid) -> StoreResult<Option<Holiday>> {
        Ok(Holiday::find_by_id(&self.pool, id).await?)
    }

    async fn active_holiday_on(
        &self,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Holiday>> {
        Ok(Holiday::find_active_on(&self.pool, date, exclude).await?)
    }

    async fn update_holiday(&self, holiday: &Holiday) -> StoreResult<Option<Holiday>> {
        Ok(Holiday::update(&self.pool, holiday).await?)
    }

    async fn list_holidays(
        &self,
        filter: &HolidayFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Holiday>> {
        let (limit, offset) = limit_offset(page);
        let (holidays, total) = Holiday::list(&self.pool, filter, limit, offset).await?;
        Ok(to_page(holidays, total, page))
    }

    async fn upcoming_holidays(&self, from: NaiveDate, limit: u32) -> StoreResult<Vec<Holiday>> {
        Ok(Holiday::upcoming(&self.pool, from, i64::from(limit)).await?)
    }

    async fn holidays_in_year(&self, year: i32) -> StoreResult<Vec<Holiday>> {
        Ok(Holiday::list_active_in_year(&self.pool, year).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
