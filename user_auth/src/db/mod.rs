//! Database module providing PostgreSQL connection pooling, schema setup and
//! the repositories behind the durable store.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::auth::RoleType;

pub mod config;
pub mod memory;
pub mod repository;
pub mod seed;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::{MemoryRefreshTokenRepository, MemoryUserRepository};
pub use repository::{
    PgRefreshTokenRepository, PgUserRepository, RefreshTokenRepository, UserRepository,
};

use timeouts::{STARTUP_TIMEOUT, TimeoutResult, with_default_timeout, with_timeout};

const SCHEMA_SQL: &str = include_str!("../../migrations/schema.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use user_auth::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env(None);
    ///     let db = Database::new(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> TimeoutResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    /// Create enums and tables if they do not exist yet
    pub async fn ensure_schema(&self) -> TimeoutResult<()> {
        with_timeout(STARTUP_TIMEOUT, sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool)).await?;
        log::info!("Database schema is up to date");
        Ok(())
    }

    /// Insert the fixed role set; existing roles are left untouched
    pub async fn seed_roles(&self) -> TimeoutResult<()> {
        for role in RoleType::ALL {
            let (name, description) = role.seed_details();
            with_default_timeout(
                sqlx::query(
                    r#"
                    INSERT INTO roles (type, name, description)
                    VALUES ($1::role_type_enum, $2, $3)
                    ON CONFLICT (type) DO NOTHING
                    "#,
                )
                .bind(role.as_str())
                .bind(name)
                .bind(description)
                .execute(&self.pool),
            )
            .await?;
        }
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
