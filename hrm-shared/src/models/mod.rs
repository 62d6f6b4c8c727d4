/// Database models for the HRM platform
///
/// Each model carries its own row type and SQL operations against a
/// `PgPool`. Higher layers reach them through [`crate::store`], never
/// directly.
///
/// # Models
///
/// - `role`: Closed set of organisational roles
/// - `user`: Employees and administrators
/// - `department`: Organisational units owning teams
/// - `team`: Team aggregate with its embedded roster
/// - `holiday`: Company holiday calendar with soft delete
/// - `page`: Offset pagination shared by list operations
///
/// # Example
///
/// ```no_run
/// use hrm_shared::models::user::User;
/// use hrm_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let user = User::find_by_email(&pool, "admin@company.com").await?;
/// # Ok(())
/// # }
/// ```

pub mod department;
pub mod holiday;
pub mod page;
pub mod role;
pub mod team;
pub mod user;
