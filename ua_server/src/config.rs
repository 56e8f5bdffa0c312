//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;

use user_auth::auth::{SessionConfig, config::positive_env_or};
use user_auth::db::DatabaseConfig;
use user_auth::mail::MailConfig;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default Redis connection string
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis connection string
    pub redis_url: String,
    /// Security configuration
    pub security: SecurityConfig,
    /// Token and cache lifetimes
    pub sessions: SessionConfig,
    /// Verification email delivery
    pub mail: MailConfig,
    /// Cookie and response settings
    pub http: HttpConfig,
    /// Prometheus listener; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Administrator created by `--seed`
    pub admin: Option<AdminSeed>,
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing key (required)
    pub password_hash_key: String,
    /// Lifetime of email verification tokens
    pub jwt_default_ttl_secs: u64,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("password_hash_key", &"<redacted>")
            .field("jwt_default_ttl_secs", &self.jwt_default_ttl_secs)
            .finish()
    }
}

/// HTTP response settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Mark cookies `Secure` (HTTPS deployments)
    pub cookie_secure: bool,
    /// Name reported by the liveness endpoint
    pub app_name: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cookie_secure: false,
            app_name: "user_auth".to_string(),
        }
    }
}

/// Administrator account seeded at startup
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `redis_url_override` - Optional Redis URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or unparsable
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        redis_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = resolve_bind(bind_override, non_empty_var("SERVER_BIND").as_deref())?;

        let database = DatabaseConfig::from_env(database_url_override);

        let redis_url = redis_url_override
            .or_else(|| non_empty_var("REDIS_URL"))
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        // Security configuration (REQUIRED)
        let jwt_secret = non_empty_var("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_hash_key =
            non_empty_var("PASSWORD_HASH_KEY").ok_or_else(|| ConfigError::MissingRequired {
                var: "PASSWORD_HASH_KEY".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let security = SecurityConfig {
            jwt_secret,
            password_hash_key,
            jwt_default_ttl_secs: positive_env_or("JWT_DEFAULT_TTL", 3600),
        };

        let defaults = HttpConfig::default();
        let http = HttpConfig {
            cookie_secure: parse_env_or("COOKIE_SECURE", defaults.cookie_secure),
            app_name: non_empty_var("APP_NAME").unwrap_or(defaults.app_name),
        };

        let admin = match (non_empty_var("ADMIN_EMAIL"), non_empty_var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            redis_url,
            security,
            sessions: SessionConfig::from_env(),
            mail: MailConfig::from_env(),
            http,
            metrics_bind: parse_addr_var("METRICS_BIND")?,
            admin,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.security.password_hash_key.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_HASH_KEY".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(ConfigError::Invalid {
                var: "REDIS_URL".to_string(),
                reason: "Must use the redis:// or rediss:// scheme".to_string(),
            });
        }

        if !self.mail.frontend_url.starts_with("http://")
            && !self.mail.frontend_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                var: "FRONTEND_URL".to_string(),
                reason: "Must be an absolute http(s) URL".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.admin.as_ref().is_some_and(|a| a.password.len() < 6) {
            return Err(ConfigError::Invalid {
                var: "ADMIN_PASSWORD".to_string(),
                reason: "Must be at least 6 characters".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_addr_var(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    non_empty_var(key)
        .map(|raw| parse_addr(key, &raw))
        .transpose()
}

/// `--bind` wins over `SERVER_BIND`, which wins over [`DEFAULT_BIND`]
fn resolve_bind(
    bind_override: Option<SocketAddr>,
    from_env: Option<&str>,
) -> Result<SocketAddr, ConfigError> {
    match bind_override {
        Some(addr) => Ok(addr),
        None => parse_addr("SERVER_BIND", from_env.unwrap_or(DEFAULT_BIND)),
    }
}

fn parse_addr(key: &str, raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("'{raw}' is not an IP:PORT address"),
    })
}
