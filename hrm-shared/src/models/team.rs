/// Team model and database operations
///
/// A team is an aggregate: the row owns its membership collection, stored
/// inline as a JSONB array, and every write to the row is guarded by the
/// `version` column. Callers read a team, decide, then call [`Team::save`]
/// with the version they read; a concurrent writer makes the save return
/// `None` instead of silently overwriting.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY,
///     name TEXT NOT NULL,
///     code TEXT NOT NULL,
///     description TEXT,
///     department_id UUID NOT NULL REFERENCES departments(id),
///     team_manager_id UUID REFERENCES users(id),
///     team_leader_id UUID REFERENCES users(id),
///     members JSONB NOT NULL DEFAULT '[]',
///     max_size INTEGER NOT NULL DEFAULT 10,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     version BIGINT NOT NULL DEFAULT 0,
///     created_by UUID,
///     updated_by UUID,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     CHECK (jsonb_array_length(members) <= max_size)
/// );
/// CREATE UNIQUE INDEX teams_department_name_key ON teams (department_id, LOWER(name));
/// CREATE UNIQUE INDEX teams_department_code_key ON teams (department_id, code);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{types::Json, PgConnection, PgPool};
use uuid::Uuid;

use super::page::contains_pattern;

/// Default membership label
pub const DEFAULT_MEMBER_ROLE: &str = "Member";

/// Default capacity for new teams
pub const DEFAULT_MAX_SIZE: i32 = 10;

/// One entry of a team's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: Uuid,

    /// Free-form label within the team ("Member", "Developer", ...)
    pub role: String,

    pub joined_date: DateTime<Utc>,
}

/// Team aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,

    /// Unique per department, compared case-insensitively
    pub name: String,

    /// Uppercase, unique per department
    pub code: String,

    pub description: Option<String>,

    pub department_id: Uuid,

    /// Must reference a user with the Team Manager role
    pub team_manager_id: Option<Uuid>,

    /// Must reference a user with the Team Leader role
    pub team_leader_id: Option<Uuid>,

    /// Ordered roster; a user appears at most once
    pub members: Vec<TeamMember>,

    /// Capacity bound, `members.len() <= max_size` always holds
    pub max_size: i32,

    pub is_active: bool,

    /// Incremented by every successful write
    pub version: i64,

    pub created_by: Option<Uuid>,

    pub updated_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= usize::try_from(self.max_size).unwrap_or(0)
    }

    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// Whether a user is on the roster or named as manager or leader
    pub fn references_user(&self, user_id: Uuid) -> bool {
        self.has_member(user_id)
            || self.team_manager_id == Some(user_id)
            || self.team_leader_id == Some(user_id)
    }
}

/// Row shape as stored; `members` travels as JSONB
#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    code: String,
    description: Option<String>,
    department_id: Uuid,
    team_manager_id: Option<Uuid>,
    team_leader_id: Option<Uuid>,
    members: Json<Vec<TeamMember>>,
    max_size: i32,
    is_active: bool,
    version: i64,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            code: row.code,
            description: row.description,
            department_id: row.department_id,
            team_manager_id: row.team_manager_id,
            team_leader_id: row.team_leader_id,
            members: row.members.0,
            max_size: row.max_size,
            is_active: row.is_active,
            version: row.version,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Partial update of a team
///
/// Absent fields are left alone. For the nullable references an explicit
/// `null` clears the field, so they are double options: `None` is absent,
/// `Some(None)` clears, `Some(Some(id))` sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub team_manager: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub team_leader: Option<Option<Uuid>>,

    #[serde(default)]
    pub max_size: Option<i32>,

    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TeamPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.team_manager.is_none()
            && self.team_leader.is_none()
            && self.max_size.is_none()
            && self.is_active.is_none()
    }
}

pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Filters for listing teams
#[derive(Debug, Clone, Default)]
pub struct TeamFilter {
    /// Case-insensitive substring over name, code and description
    pub search: Option<String>,

    pub department_id: Option<Uuid>,

    pub is_active: Option<bool>,

    /// Restricts to teams managed by this user
    pub team_manager_id: Option<Uuid>,

    /// Restricts to teams led by this user
    pub team_leader_id: Option<Uuid>,
}

impl TeamFilter {
    /// In-memory evaluation of the filter, mirroring the SQL in [`Team::list`]
    pub fn matches(&self, team: &Team) -> bool {
        if self.department_id.is_some_and(|d| team.department_id != d) {
            return false;
        }
        if self.is_active.is_some_and(|a| team.is_active != a) {
            return false;
        }
        if self
            .team_manager_id
            .is_some_and(|m| team.team_manager_id != Some(m))
        {
            return false;
        }
        if self
            .team_leader_id
            .is_some_and(|l| team.team_leader_id != Some(l))
        {
            return false;
        }

        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            return team.name.to_lowercase().contains(&needle)
                || team.code.to_lowercase().contains(&needle)
                || team
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
        }

        true
    }
}

const TEAM_COLUMNS: &str = "id, name, code, description, department_id, team_manager_id, \
     team_leader_id, members, max_size, is_active, version, created_by, updated_by, \
     created_at, updated_at";

impl Team {
    /// Inserts a new team row
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the name or code is already used in the
    /// department.
    pub async fn insert(pool: &PgPool, team: &Team) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO teams ({TEAM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {TEAM_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TeamRow>(&query)
            .bind(team.id)
            .bind(&team.name)
            .bind(&team.code)
            .bind(&team.description)
            .bind(team.department_id)
            .bind(team.team_manager_id)
            .bind(team.team_leader_id)
            .bind(Json(&team.members))
            .bind(team.max_size)
            .bind(team.is_active)
            .bind(team.version)
            .bind(team.created_by)
            .bind(team.updated_by)
            .bind(team.created_at)
            .bind(team.updated_at)
            .fetch_one(pool)
            .await?;

        Ok(row.into())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");

        let row = sqlx::query_as::<_, TeamRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Finds a team in `department_id` whose name or code collides
    ///
    /// `code` must already be normalized to uppercase.
    pub async fn find_conflicting(
        pool: &PgPool,
        department_id: Uuid,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TEAM_COLUMNS} FROM teams
            WHERE department_id = $1
              AND (LOWER(name) = LOWER($2) OR code = $3)
              AND ($4::uuid IS NULL OR id <> $4)
            LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, TeamRow>(&query)
            .bind(department_id)
            .bind(name)
            .bind(code)
            .bind(exclude)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Writes the whole aggregate if nobody else has written since `expected_version`
    ///
    /// Returns the stored team with its bumped version, or `None` when the
    /// version no longer matches (or the team is gone).
    pub async fn save(
        conn: &mut PgConnection,
        team: &Team,
        expected_version: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE teams
            SET name = $3, description = $4, team_manager_id = $5, team_leader_id = $6,
                members = $7, max_size = $8, is_active = $9, updated_by = $10,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {TEAM_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TeamRow>(&query)
            .bind(team.id)
            .bind(expected_version)
            .bind(&team.name)
            .bind(&team.description)
            .bind(team.team_manager_id)
            .bind(team.team_leader_id)
            .bind(Json(&team.members))
            .bind(team.max_size)
            .bind(team.is_active)
            .bind(team.updated_by)
            .fetch_optional(conn)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Hard-deletes a team if its version still matches
    pub async fn delete(pool: &PgPool, id: Uuid, expected_version: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists teams newest first with the total match count
    pub async fn list(
        pool: &PgPool,
        filter: &TeamFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        const WHERE: &str = r#"
            ($1::uuid IS NULL OR department_id = $1)
            AND ($2::boolean IS NULL OR is_active = $2)
            AND ($3::uuid IS NULL OR team_manager_id = $3)
            AND ($4::uuid IS NULL OR team_leader_id = $4)
            AND ($5::text IS NULL
                 OR name ILIKE $5
                 OR code ILIKE $5
                 OR description ILIKE $5)
        "#;

        let search = filter.search.as_deref().map(contains_pattern);

        let query = format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE {WHERE} ORDER BY created_at DESC LIMIT $6 OFFSET $7"
        );
        let rows = sqlx::query_as::<_, TeamRow>(&query)
            .bind(filter.department_id)
            .bind(filter.is_active)
            .bind(filter.team_manager_id)
            .bind(filter.team_leader_id)
            .bind(&search)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM teams WHERE {WHERE}");
        let (total,): (i64,) = sqlx::query_as(&count_query)
            .bind(filter.department_id)
            .bind(filter.is_active)
            .bind(filter.team_manager_id)
            .bind(filter.team_leader_id)
            .bind(&search)
            .fetch_one(pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Teams managed by a user, newest first
    pub async fn list_by_manager(pool: &PgPool, manager_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE team_manager_id = $1 ORDER BY created_at DESC"
        );

        let rows = sqlx::query_as::<_, TeamRow>(&query)
            .bind(manager_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The team a user leads, oldest first if several
    pub async fn find_by_leader(pool: &PgPool, leader_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE team_leader_id = $1 ORDER BY created_at ASC LIMIT 1"
        );

        let row = sqlx::query_as::<_, TeamRow>(&query)
            .bind(leader_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn count_by_department(pool: &PgPool, department_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teams WHERE department_id = $1")
            .bind(department_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Whether any team names the user as manager, leader or member
    pub async fn any_references_user(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM teams
                WHERE team_manager_id = $1
                   OR team_leader_id = $1
                   OR members @> jsonb_build_array(jsonb_build_object('userId', $1::text))
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_team() -> Team {
        let now = Utc::now();
        Team {
            id: Uuid::new_v4(),
            name: "Alpha".to_string(),
            code: "A1".to_string(),
            description: Some("Platform squad".to_string()),
            department_id: Uuid::new_v4(),
            team_manager_id: None,
            team_leader_id: None,
            members: Vec::new(),
            max_size: 2,
            is_active: true,
            version: 0,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_capacity_helpers() {
        let mut team = sample_team();
        assert!(!team.is_full());

        for _ in 0..2 {
            team.members.push(TeamMember {
                user_id: Uuid::new_v4(),
                role: DEFAULT_MEMBER_ROLE.to_string(),
                joined_date: Utc::now(),
            });
        }

        assert!(team.is_full());
        assert_eq!(team.member_count(), 2);
        assert!(team.has_member(team.members[0].user_id));
        assert!(!team.has_member(Uuid::new_v4()));
    }

    #[test]
    fn test_member_json_shape() {
        let member = TeamMember {
            user_id: Uuid::new_v4(),
            role: "Member".to_string(),
            joined_date: Utc::now(),
        };

        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["userId"], member.user_id.to_string());
        assert!(json.get("joinedDate").is_some());
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let leader = Uuid::new_v4();

        let patch: TeamPatch = serde_json::from_value(serde_json::json!({
            "teamManager": null,
            "teamLeader": leader,
            "maxSize": 5
        }))
        .unwrap();

        assert_eq!(patch.team_manager, Some(None));
        assert_eq!(patch.team_leader, Some(Some(leader)));
        assert_eq!(patch.max_size, Some(5));
        assert!(patch.name.is_none());
        assert!(patch.description.is_none());
        assert!(!patch.is_empty());

        let empty: TeamPatch = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_filter_matches() {
        let mut team = sample_team();
        let manager = Uuid::new_v4();
        team.team_manager_id = Some(manager);

        assert!(TeamFilter::default().matches(&team));
        assert!(TeamFilter {
            search: Some("platform".to_string()),
            ..Default::default()
        }
        .matches(&team));
        assert!(TeamFilter {
            team_manager_id: Some(manager),
            ..Default::default()
        }
        .matches(&team));
        assert!(!TeamFilter {
            team_leader_id: Some(manager),
            ..Default::default()
        }
        .matches(&team));
        assert!(!TeamFilter {
            department_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
        .matches(&team));
    }

    #[test]
    fn test_references_user() {
        let mut team = sample_team();
        let leader = Uuid::new_v4();
        team.team_leader_id = Some(leader);

        assert!(team.references_user(leader));
        assert!(!team.references_user(Uuid::new_v4()));
    }
}
