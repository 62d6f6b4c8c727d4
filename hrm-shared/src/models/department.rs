/// Department model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE departments (
///     id UUID PRIMARY KEY,
///     name TEXT NOT NULL,
///     code TEXT NOT NULL,
///     description TEXT,
///     head_id UUID REFERENCES users(id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_by UUID,
///     updated_by UUID,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
/// CREATE UNIQUE INDEX departments_name_key ON departments (LOWER(name));
/// CREATE UNIQUE INDEX departments_code_key ON departments (code);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::page::contains_pattern;

/// Department model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,

    pub name: String,

    /// Uppercase short code, unique
    pub code: String,

    pub description: Option<String>,

    /// Department head (any user)
    pub head_id: Option<Uuid>,

    pub is_active: bool,

    pub created_by: Option<Uuid>,

    pub updated_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Filters for listing departments
#[derive(Debug, Clone, Default)]
pub struct DepartmentFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

impl DepartmentFilter {
    pub fn matches(&self, department: &Department) -> bool {
        if let Some(active) = self.is_active {
            if department.is_active != active {
                return false;
            }
        }

        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            return department.name.to_lowercase().contains(&needle)
                || department.code.to_lowercase().contains(&needle);
        }

        true
    }
}

const DEPARTMENT_COLUMNS: &str =
    "id, name, code, description, head_id, is_active, created_by, updated_by, created_at, updated_at";

impl Department {
    pub async fn insert(pool: &PgPool, department: &Department) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO departments ({DEPARTMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {DEPARTMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Department>(&query)
            .bind(department.id)
            .bind(&department.name)
            .bind(&department.code)
            .bind(&department.description)
            .bind(department.head_id)
            .bind(department.is_active)
            .bind(department.created_by)
            .bind(department.updated_by)
            .bind(department.created_at)
            .bind(department.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1");

        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a department whose name or code collides with the given ones
    ///
    /// Name comparison is case-insensitive; `code` must already be uppercase.
    pub async fn find_conflicting(
        pool: &PgPool,
        name: &str,
        code: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {DEPARTMENT_COLUMNS} FROM departments
            WHERE (LOWER(name) = LOWER($1) OR code = $2)
              AND ($3::uuid IS NULL OR id <> $3)
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, Department>(&query)
            .bind(name)
            .bind(code)
            .bind(exclude)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(pool: &PgPool, department: &Department) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE departments
            SET name = $2, code = $3, description = $4, head_id = $5, is_active = $6,
                updated_by = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {DEPARTMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Department>(&query)
            .bind(department.id)
            .bind(&department.name)
            .bind(&department.code)
            .bind(&department.description)
            .bind(department.head_id)
            .bind(department.is_active)
            .bind(department.updated_by)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists departments alphabetically with the total match count
    pub async fn list(
        pool: &PgPool,
        filter: &DepartmentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        const WHERE: &str = r#"
            ($1::boolean IS NULL OR is_active = $1)
            AND ($2::text IS NULL OR name ILIKE $2 OR code ILIKE $2)
        "#;

        let search = filter.search.as_deref().map(contains_pattern);

        let query = format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE {WHERE} ORDER BY name ASC LIMIT $3 OFFSET $4"
        );
        let departments = sqlx::query_as::<_, Department>(&query)
            .bind(filter.is_active)
            .bind(&search)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM departments WHERE {WHERE}");
        let (total,): (i64,) = sqlx::query_as(&count_query)
            .bind(filter.is_active)
            .bind(&search)
            .fetch_one(pool)
            .await?;

        Ok((departments, total))
    }
}
