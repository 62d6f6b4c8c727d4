/// PostgreSQL plumbing
///
/// - `pool`: connection pool construction, health check, shutdown
/// - `migrations`: embedded schema migrations and their status
///
/// # Example
///
/// ```no_run
/// use hrm_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::new(std::env::var("DATABASE_URL")?);
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
