/// User model and database operations
///
/// Users are created at onboarding, edited administratively and never
/// deleted: removal is a deactivation (`is_active = false`).
///
/// `team_id` is a denormalized back-reference to the team whose roster lists
/// the user. It is written only together with the roster itself, see
/// [`crate::store::MemberLink`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     employee_id TEXT UNIQUE,
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     role user_role NOT NULL DEFAULT 'Employee',
///     department_id UUID REFERENCES departments(id),
///     team_id UUID REFERENCES teams(id) ON DELETE SET NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     last_login_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::page::contains_pattern;
use super::role::Role;

/// User model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Human-facing employee number (e.g. "EMP0042")
    pub employee_id: Option<String>,

    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub role: Role,

    pub department_id: Option<Uuid>,

    /// Team whose roster currently lists this user
    pub team_id: Option<Uuid>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// A new active user with no department or team
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            employee_id: None,
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            department_id: None,
            team_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Filters for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,

    /// Case-insensitive substring over names, email and employee id
    pub search: Option<String>,

    pub is_active: Option<bool>,
}

impl UserFilter {
    /// In-memory evaluation of the filter, mirroring the SQL in [`User::list`]
    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }

        if let Some(active) = self.is_active {
            if user.is_active != active {
                return false;
            }
        }

        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let hit = user.first_name.to_lowercase().contains(&needle)
                || user.last_name.to_lowercase().contains(&needle)
                || user.email.to_lowercase().contains(&needle)
                || user
                    .employee_id
                    .as_deref()
                    .is_some_and(|id| id.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        true
    }
}

const USER_COLUMNS: &str = "id, employee_id, email, password_hash, first_name, last_name, role, \
     department_id, team_id, is_active, created_at, updated_at, last_login_at";

impl User {
    /// Inserts a fully built user row
    ///
    /// # Errors
    ///
    /// Returns an error if the email or employee id is already taken
    /// (unique constraint violation) or the database is unreachable.
    pub async fn insert(pool: &PgPool, user: &User) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.employee_id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role)
            .bind(user.department_id)
            .bind(user.team_id)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.last_login_at)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable column of an existing user
    ///
    /// `team_id` is deliberately not written here; it belongs to the roster
    /// write path.
    pub async fn update(pool: &PgPool, user: &User) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET employee_id = $2, email = $3, password_hash = $4, first_name = $5,
                last_name = $6, role = $7, department_id = $8, is_active = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.employee_id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role)
            .bind(user.department_id)
            .bind(user.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Points a user's back-reference at a team
    ///
    /// Runs on the roster transaction's connection. Returns `false` when the
    /// user is missing, inactive or already assigned to a different team.
    pub async fn assign_team(
        conn: &mut PgConnection,
        user_id: Uuid,
        team_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users SET team_id = $2, updated_at = NOW()
            WHERE id = $1 AND is_active AND (team_id IS NULL OR team_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(team_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears a user's back-reference if it still points at `team_id`
    pub async fn unassign_team(
        conn: &mut PgConnection,
        user_id: Uuid,
        team_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET team_id = NULL, updated_at = NOW() WHERE id = $1 AND team_id = $2",
        )
        .bind(user_id)
        .bind(team_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users matching a filter, newest first
    ///
    /// Returns the requested page and the total match count.
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        const WHERE: &str = r#"
            ($1::user_role IS NULL OR role = $1)
            AND ($2::boolean IS NULL OR is_active = $2)
            AND ($3::text IS NULL
                 OR first_name ILIKE $3
                 OR last_name ILIKE $3
                 OR email ILIKE $3
                 OR employee_id ILIKE $3)
        "#;

        let search = filter.search.as_deref().map(contains_pattern);

        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {WHERE} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(filter.role)
            .bind(filter.is_active)
            .bind(&search)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM users WHERE {WHERE}");
        let (total,): (i64,) = sqlx::query_as(&count_query)
            .bind(filter.role)
            .bind(filter.is_active)
            .bind(&search)
            .fetch_one(pool)
            .await?;

        Ok((users, total))
    }

    /// Active employees that no team roster lists yet
    pub async fn list_unassigned_employees(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = 'Employee' AND team_id IS NULL AND is_active = TRUE
            ORDER BY first_name ASC, last_name ASC
            "#
        );

        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            employee_id: Some("EMP0042".to_string()),
            email: "jane.doe@company.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: Role::Employee,
            department_id: None,
            team_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["role"], "Employee");
    }

    #[test]
    fn test_filter_matches() {
        let user = sample_user();

        assert!(UserFilter::default().matches(&user));
        assert!(UserFilter {
            search: Some("emp00".to_string()),
            ..Default::default()
        }
        .matches(&user));
        assert!(!UserFilter {
            role: Some(Role::Admin),
            ..Default::default()
        }
        .matches(&user));
        assert!(!UserFilter {
            is_active: Some(false),
            ..Default::default()
        }
        .matches(&user));
    }

    #[test]
    fn test_full_name() {
        assert_eq!(sample_user().full_name(), "Jane Doe");
    }
}
