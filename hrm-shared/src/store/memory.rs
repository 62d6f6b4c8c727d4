/// In-memory store
///
/// All tables live behind a single `tokio::sync::RwLock`, so every write,
/// including the two-sided roster write, is atomic with respect to every
/// other operation. Unique indexes are re-checked by hand with the same
/// constraint names the migrations use.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::cmp::Reverse;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    DepartmentStore, HolidayStore, MemberLink, Store, StoreError, StoreResult, TeamStore,
    UserStore,
};
use crate::models::{
    department::{Department, DepartmentFilter},
    holiday::{Holiday, HolidayFilter},
    page::{Page, PageRequest},
    role::Role,
    team::{Team, TeamFilter},
    user::{User, UserFilter},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    departments: Vec<Department>,
    teams: Vec<Team>,
    holidays: Vec<Holiday>,
}

impl Tables {
    fn user_unique(&self, user: &User) -> StoreResult<()> {
        for other in self.users.iter().filter(|u| u.id != user.id) {
            if other.email.eq_ignore_ascii_case(&user.email) {
                return Err(StoreError::UniqueViolation("users_email_key".to_string()));
            }
            if user.employee_id.is_some() && other.employee_id == user.employee_id {
                return Err(StoreError::UniqueViolation("users_employee_id_key".to_string()));
            }
        }
        Ok(())
    }

    fn department_unique(&self, department: &Department) -> StoreResult<()> {
        for other in self.departments.iter().filter(|d| d.id != department.id) {
            if other.name.to_lowercase() == department.name.to_lowercase() {
                return Err(StoreError::UniqueViolation("departments_name_key".to_string()));
            }
            if other.code == department.code {
                return Err(StoreError::UniqueViolation("departments_code_key".to_string()));
            }
        }
        Ok(())
    }

    fn team_unique(&self, team: &Team) -> StoreResult<()> {
        let same_department = self
            .teams
            .iter()
            .filter(|t| t.id != team.id && t.department_id == team.department_id);
        for other in same_department {
            if other.name.to_lowercase() == team.name.to_lowercase() {
                return Err(StoreError::UniqueViolation("teams_department_name_key".to_string()));
            }
            if other.code == team.code {
                return Err(StoreError::UniqueViolation("teams_department_code_key".to_string()));
            }
        }
        Ok(())
    }

    fn holiday_unique(&self, holiday: &Holiday) -> StoreResult<()> {
        if !holiday.is_active {
            return Ok(());
        }
        let taken = self
            .holidays
            .iter()
            .any(|h| h.id != holiday.id && h.is_active && h.date == holiday.date);
        if taken {
            return Err(StoreError::UniqueViolation("holidays_active_date_key".to_string()));
        }
        Ok(())
    }
}

/// Store keeping every table in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, insertion order breaking ties
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.iter().rev().cloned().collect();
    rows.sort_by_key(|row| Reverse(created_at(row)));
    rows
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        tables.user_unique(&user)?;
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        tables.user_unique(user)?;

        let Some(stored) = tables.users.iter_mut().find(|u| u.id == user.id) else {
            return Ok(None);
        };

        let team_id = stored.team_id;
        *stored = user.clone();
        stored.team_id = team_id;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<Page<User>> {
        let tables = self.tables.read().await;
        let matching: Vec<User> = newest_first(&tables.users, |u| u.created_at)
            .into_iter()
            .filter(|u| filter.matches(u))
            .collect();
        Ok(Page::from_sorted(matching, page))
    }

    async fn unassigned_employees(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.role == Role::Employee && u.team_id.is_none() && u.is_active)
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            (a.first_name.as_str(), a.last_name.as_str())
                .cmp(&(b.first_name.as_str(), b.last_name.as_str()))
        });
        Ok(users)
    }
}

#[async_trait]
impl DepartmentStore for MemoryStore {
    async fn insert_department(&self, department: Department) -> StoreResult<Department> {
        let mut tables = self.tables.write().await;
        tables.department_unique(&department)?;
        tables.departments.push(department.clone());
        Ok(department)
    }

    async fn department_by_id(&self, id: Uuid) -> StoreResult<Option<Department>> {
        let tables = self.tables.read().await;
        Ok(tables.departments.iter().find(|d| d.id == id).cloned())
    }

    async fn department_conflict(
        &self,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Department>> {
        let tables = self.tables.read().await;
        let name = name.to_lowercase();
        Ok(tables
            .departments
            .iter()
            .filter(|d| Some(d.id) != exclude)
            .find(|d| d.name.to_lowercase() == name || d.code == code)
            .cloned())
    }

    async fn update_department(&self, department: &Department) -> StoreResult<Option<Department>> {
        let mut tables = self.tables.write().await;
        tables.department_unique(department)?;

        let Some(stored) = tables.departments.iter_mut().find(|d| d.id == department.id) else {
            return Ok(None);
        };
        *stored = department.clone();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete_department(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.departments.len();
        tables.departments.retain(|d| d.id != id);
        if tables.departments.len() == before {
            return Ok(false);
        }
        for user in tables.users.iter_mut().filter(|u| u.department_id == Some(id)) {
            user.department_id = None;
        }
        Ok(true)
    }

    async fn list_departments(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Department>> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Department> = tables
            .departments
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Page::from_sorted(matching, page))
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn insert_team(&self, team: Team) -> StoreResult<Team> {
        let mut tables = self.tables.write().await;
        tables.team_unique(&team)?;
        tables.teams.push(team.clone());
        Ok(team)
    }

    async fn team_by_id(&self, id: Uuid) -> StoreResult<Option<Team>> {
        let tables = self.tables.read().await;
        Ok(tables.teams.iter().find(|t| t.id == id).cloned())
    }

    async fn team_conflict(
        &self,
        department_id: Uuid,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Team>> {
        let tables = self.tables.read().await;
        let name = name.to_lowercase();
        Ok(tables
            .teams
            .iter()
            .filter(|t| t.department_id == department_id && Some(t.id) != exclude)
            .find(|t| t.name.to_lowercase() == name || t.code == code)
            .cloned())
    }

    async fn save_team(
        &self,
        team: &Team,
        expected_version: i64,
        link: Option<MemberLink>,
    ) -> StoreResult<Option<Team>> {
        let mut tables = self.tables.write().await;
        tables.team_unique(team)?;

        let current = tables.teams.iter().position(|t| t.id == team.id);
        let Some(index) = current.filter(|&i| tables.teams[i].version == expected_version) else {
            return Ok(None);
        };

        if let Some(MemberLink::Assign(user_id)) = link {
            let free = tables
                .users
                .iter()
                .find(|u| u.id == user_id)
                .is_some_and(|u| u.is_active && (u.team_id.is_none() || u.team_id == Some(team.id)));
            if !free {
                return Ok(None);
            }
        }

        let now = Utc::now();
        match link {
            Some(MemberLink::Assign(user_id)) => {
                if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
                    user.team_id = Some(team.id);
                    user.updated_at = now;
                }
            }
            Some(MemberLink::Unassign(user_id)) => {
                if let Some(user) = tables
                    .users
                    .iter_mut()
                    .find(|u| u.id == user_id && u.team_id == Some(team.id))
                {
                    user.team_id = None;
                    user.updated_at = now;
                }
            }
            None => {}
        }

        let stored = &mut tables.teams[index];
        let mut saved = team.clone();
        saved.code = stored.code.clone();
        saved.department_id = stored.department_id;
        saved.created_by = stored.created_by;
        saved.created_at = stored.created_at;
        saved.version = expected_version + 1;
        saved.updated_at = now;
        *stored = saved.clone();

        Ok(Some(saved))
    }

    async fn delete_team(&self, id: Uuid, expected_version: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.teams.len();
        tables
            .teams
            .retain(|t| !(t.id == id && t.version == expected_version));
        let deleted = tables.teams.len() < before;

        if deleted {
            for user in tables.users.iter_mut().filter(|u| u.team_id == Some(id)) {
                user.team_id = None;
            }
        }
        Ok(deleted)
    }

    async fn list_teams(&self, filter: &TeamFilter, page: PageRequest) -> StoreResult<Page<Team>> {
        let tables = self.tables.read().await;
        let matching: Vec<Team> = newest_first(&tables.teams, |t| t.created_at)
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        Ok(Page::from_sorted(matching, page))
    }

    async fn teams_managed_by(&self, user_id: Uuid) -> StoreResult<Vec<Team>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.teams, |t| t.created_at)
            .into_iter()
            .filter(|t| t.team_manager_id == Some(user_id))
            .collect())
    }

    async fn team_led_by(&self, user_id: Uuid) -> StoreResult<Option<Team>> {
        let tables = self.tables.read().await;
        Ok(tables
            .teams
            .iter()
            .filter(|t| t.team_leader_id == Some(user_id))
            .min_by_key(|t| t.created_at)
            .cloned())
    }

    async fn count_teams_in_department(&self, department_id: Uuid) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .teams
            .iter()
            .filter(|t| t.department_id == department_id)
            .count() as u64)
    }

    async fn user_referenced_by_team(&self, user_id: Uuid) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.teams.iter().any(|t| t.references_user(user_id)))
    }
}

#[async_trait]
impl HolidayStore for MemoryStore {
    async fn insert_holiday(&self, holiday: Holiday) -> StoreResult<Holiday> {
        let mut tables = self.tables.write().await;
        tables.holiday_unique(&holiday)?;
        tables.holidays.push(holiday.clone());
        Ok(holiday)
    }

    async fn holiday_by_id(&self, id: Uuid) -> StoreResult<Option<Holiday>> {
        let tables = self.tables.read().await;
        Ok(tables.holidays.iter().find(|h| h.id == id).cloned())
    }

    async fn active_holiday_on(
        &self,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Holiday>> {
        let tables = self.tables.read().await;
        Ok(tables
            .holidays
            .iter()
            .find(|h| h.is_active && h.date == date && Some(h.id) != exclude)
            .cloned())
    }

    async fn update_holiday(&self, holiday: &Holiday) -> StoreResult<Option<Holiday>> {
        let mut tables = self.tables.write().await;
        tables.holiday_unique(holiday)?;

        let Some(stored) = tables.holidays.iter_mut().find(|h| h.id == holiday.id) else {
            return Ok(None);
        };
        *stored = holiday.clone();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn list_holidays(
        &self,
        filter: &HolidayFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Holiday>> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Holiday> = tables
            .holidays
            .iter()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect();
        matching.sort_by_key(|h| h.date);
        Ok(Page::from_sorted(matching, page))
    }

    async fn upcoming_holidays(&self, from: NaiveDate, limit: u32) -> StoreResult<Vec<Holiday>> {
        let tables = self.tables.read().await;
        let mut upcoming: Vec<Holiday> = tables
            .holidays
            .iter()
            .filter(|h| h.is_active && h.date >= from)
            .cloned()
            .collect();
        upcoming.sort_by_key(|h| h.date);
        upcoming.truncate(limit as usize);
        Ok(upcoming)
    }

    async fn holidays_in_year(&self, year: i32) -> StoreResult<Vec<Holiday>> {
        let tables = self.tables.read().await;
        let mut holidays: Vec<Holiday> = tables
            .holidays
            .iter()
            .filter(|h| h.is_active && h.year == year)
            .cloned()
            .collect();
        holidays.sort_by_key(|h| h.date);
        Ok(holidays)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
