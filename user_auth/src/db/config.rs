//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;

use crate::auth::config::positive_env_or;

/// Development fallback used when `DATABASE_URL` is absent
pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost/user_auth";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (default: [`DEFAULT_DATABASE_URL`])
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT_SECS`: Connection timeout in seconds (default: 5)
    /// - `DB_IDLE_TIMEOUT_SECS`: Idle timeout in seconds (default: 300)
    /// - `DB_MAX_LIFETIME_SECS`: Max lifetime in seconds (default: 1800)
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Takes precedence over `DATABASE_URL` (CLI flag)
    pub fn from_env(database_url_override: Option<String>) -> Self {
        let defaults = Self::development();
        Self {
            database_url: database_url_override
                .or_else(|| env::var("DATABASE_URL").ok())
                .unwrap_or(defaults.database_url),
            max_connections: positive_env_or(
                "DB_MAX_CONNECTIONS",
                u64::from(defaults.max_connections),
            )
            .try_into()
            .unwrap_or(defaults.max_connections),
            min_connections: positive_env_or(
                "DB_MIN_CONNECTIONS",
                u64::from(defaults.min_connections),
            )
            .try_into()
            .unwrap_or(defaults.min_connections),
            connection_timeout_secs: positive_env_or(
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: positive_env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            max_lifetime_secs: positive_env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
        }
    }

    /// Create a default configuration for development
    pub fn development() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
