//! Authentication data models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// Role categories. Seeded once; never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    Admin,
    User,
    Moderator,
}

impl RoleType {
    pub const ALL: [RoleType; 3] = [RoleType::Admin, RoleType::User, RoleType::Moderator];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::Admin => "admin",
            RoleType::User => "user",
            RoleType::Moderator => "moderator",
        }
    }

    /// Human readable name and description used when seeding the `roles` table.
    pub fn seed_details(&self) -> (&'static str, &'static str) {
        match self {
            RoleType::Admin => ("Administrator", "System administrator with full access"),
            RoleType::User => ("User", "Regular user with basic access"),
            RoleType::Moderator => (
                "Moderator",
                "Moderator with limited administrative access",
            ),
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(RoleType::Admin),
            "user" => Ok(RoleType::User),
            "moderator" => Ok(RoleType::Moderator),
            other => Err(format!("unknown role type: {other}")),
        }
    }
}

/// Identity provider that created the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Local,
    Google,
    Facebook,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
            AuthProvider::Facebook => "facebook",
        }
    }
}

impl FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            "facebook" => Ok(AuthProvider::Facebook),
            other => Err(format!("unknown auth provider: {other}")),
        }
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role_id: Option<i64>,
    pub role: Option<RoleType>,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: RoleType,
}

/// Durable long-tier session. At most one row per user.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// A record authorizes `presented` only if it is live, unrevoked and holds
    /// exactly that token.
    pub fn authorizes(&self, presented: &str, now: DateTime<Utc>) -> bool {
        !self.is_revoked
            && self.deleted_at.is_none()
            && self.expires_at > now
            && super::hasher::constant_time_eq(&self.token, presented)
    }
}

/// Signup data staged in the ephemeral store until the email is verified
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRegistration {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub stay_login: bool,
}

/// Result of a successful `register` call
#[derive(Clone)]
pub struct RegistrationReceipt {
    pub email: String,
    pub verification_token: String,
}

impl fmt::Debug for RegistrationReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationReceipt")
            .field("email", &self.email)
            .field("verification_token", &"<redacted>")
            .finish()
    }
}

/// Result of a successful login. Only the refresh token is issued here.
#[derive(Clone)]
pub struct LoginOutcome {
    pub user_id: UserId,
    pub refresh_token: String,
    /// Lifetime of the refresh token in seconds
    pub refresh_ttl_secs: u64,
    pub stay_login: bool,
}

impl fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("user_id", &self.user_id)
            .field("refresh_token", &"<redacted>")
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("stay_login", &self.stay_login)
            .finish()
    }
}

/// Tokens produced by a rotation
#[derive(Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    /// Long tier only: lifetime of the cached copy, shorter than the token itself
    pub refresh_cache_ttl_secs: Option<u64>,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("refresh_cache_ttl_secs", &self.refresh_cache_ttl_secs)
            .finish()
    }
}
