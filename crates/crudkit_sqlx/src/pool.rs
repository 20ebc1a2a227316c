//! Database connection pool management
//!
//! Connection pool configuration and creation for PostgreSQL, with optional
//! loading from the environment (`CRUDKIT_DB_*` variables, `.env` files
//! honored).

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crudkit_core::RepositoryError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Configuration options for the database connection pool
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use crudkit_sqlx::DatabaseConfig;
///
/// let config = DatabaseConfig::new("postgres://localhost/app")
///     .max_connections(20)
///     .connect_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
    /// Idle timeout before closing a connection
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    /// Creates a new configuration with the given connection URL and
    /// sensible defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }

    /// Loads configuration from the environment
    ///
    /// Reads `CRUDKIT_DB_URL` (required) plus optional
    /// `CRUDKIT_DB_MAX_CONNECTIONS` / `CRUDKIT_DB_MIN_CONNECTIONS`.
    /// A `.env` file in the working directory is honored when present.
    pub fn from_env() -> Result<Self, RepositoryError> {
        dotenvy::dotenv().ok();
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("CRUDKIT_DB"))
            .build()
            .map_err(|error| {
                RepositoryError::query_caused_by("failed to read database environment", error)
            })?;
        let url = settings.get_string("url").map_err(|error| {
            RepositoryError::query_caused_by("CRUDKIT_DB_URL is not set", error)
        })?;
        let mut database_config = DatabaseConfig::new(url);
        if let Ok(max) = settings.get_int("max_connections") {
            database_config.max_connections = max as u32;
        }
        if let Ok(min) = settings.get_int("min_connections") {
            database_config.min_connections = min as u32;
        }
        Ok(database_config)
    }

    /// Sets the maximum number of connections in the pool
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections to maintain
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout duration
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the maximum lifetime of a connection
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Sets the idle timeout before closing a connection
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// Creates a database connection pool with the given configuration
///
/// # Errors
///
/// A generic repository error chained to the SQLx connection failure.
pub async fn create_pool(database_config: &DatabaseConfig) -> Result<DatabasePool, RepositoryError> {
    let pool = PgPoolOptions::new()
        .max_connections(database_config.max_connections)
        .min_connections(database_config.min_connections)
        .acquire_timeout(database_config.connect_timeout)
        .max_lifetime(database_config.max_lifetime)
        .idle_timeout(database_config.idle_timeout)
        .connect(&database_config.url)
        .await
        .map_err(|error| {
            RepositoryError::query_caused_by("failed to connect to database", error)
        })?;
    info!(
        max_connections = database_config.max_connections,
        "database connection pool created"
    );
    Ok(pool)
}
