/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 5001)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any
///   (default: http://localhost:3000)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, >= 32 chars)
/// - `JWT_ACCESS_TTL_HOURS`: Access token lifetime (default: 24)
/// - `TEAM_DEFAULT_MAX_SIZE`: Capacity of teams created without one (default: 10)
/// - `ROSTER_WRITE_RETRIES`: Attempts per roster write (default: 3)
/// - `PAGE_DEFAULT_LIMIT` / `PAGE_MAX_LIMIT`: Pagination (default: 10 / 100)
/// - `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_PASSWORD`: Admin created at
///   startup when both are set
///
/// # Example
///
/// ```no_run
/// use hrm_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use hrm_shared::models::page::PageRequest;
use hrm_shared::services::RosterConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub teams: TeamConfig,
    pub pagination: PaginationConfig,

    /// Admin account ensured at startup
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Access token lifetime in hours
    pub access_ttl_hours: i64,
}

/// Team roster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub default_max_size: i32,
    pub write_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,

    #[serde(skip_serializing)]
    pub password: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("API_PORT", 5001u16)?;
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        let production = parse_var("PRODUCTION", false)?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        let access_ttl_hours = parse_var("JWT_ACCESS_TTL_HOURS", 24i64)?;
        if access_ttl_hours <= 0 {
            anyhow::bail!("JWT_ACCESS_TTL_HOURS must be positive");
        }

        let default_max_size = parse_var("TEAM_DEFAULT_MAX_SIZE", 10i32)?;
        if !(1..=hrm_shared::services::roster::MAX_TEAM_SIZE).contains(&default_max_size) {
            anyhow::bail!(
                "TEAM_DEFAULT_MAX_SIZE must be between 1 and {}",
                hrm_shared::services::roster::MAX_TEAM_SIZE
            );
        }
        let write_retries = parse_var("ROSTER_WRITE_RETRIES", 3u32)?;

        let default_limit = parse_var("PAGE_DEFAULT_LIMIT", 10u32)?;
        let max_limit = parse_var("PAGE_MAX_LIMIT", 100u32)?;

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_EMAIL"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() => {
                Some(BootstrapAdmin { email, password })
            }
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_hours,
            },
            teams: TeamConfig {
                default_max_size,
                write_retries,
            },
            pagination: PaginationConfig {
                default_limit,
                max_limit,
            },
            bootstrap_admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn roster(&self) -> RosterConfig {
        RosterConfig {
            default_max_size: self.teams.default_max_size,
            write_retries: self.teams.write_retries,
        }
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt.access_ttl_hours)
    }

    /// Page request with the configured default limit
    pub fn page(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        self.page_with_default(page, limit, self.pagination.default_limit)
    }

    /// Page request with an endpoint-specific default limit
    pub fn page_with_default(&self, page: Option<u32>, limit: Option<u32>, default: u32) -> PageRequest {
        PageRequest::new(page, limit, default, self.pagination.max_limit)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 5001,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/hrm_test".to_string(),
            max_connections: 10,
        },
        jwt: JwtConfig {
            secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            access_ttl_hours: 24,
        },
        teams: TeamConfig {
            default_max_size: 10,
            write_retries: 3,
        },
        pagination: PaginationConfig {
            default_limit: 10,
            max_limit: 100,
        },
        bootstrap_admin: None,
    }
}
