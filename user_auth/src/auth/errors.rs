//! Authentication error types.

use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::db::timeouts::TimeoutError;
use crate::mail::MailError;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// A verified user already owns this email
    #[error("Email already in use")]
    EmailInUse,

    /// Unknown email or wrong password. The two cases are deliberately merged.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Token failed signature, structure, type or store cross-checks
    #[error("Invalid token")]
    InvalidToken,

    /// Token signature is valid but its expiry has passed
    #[error("Token expired")]
    TokenExpired,

    /// Protected resource requested without an access token
    #[error("Unauthorized")]
    Unauthorized,

    /// No pending registration for the verification link
    #[error("Verification link has expired")]
    VerifyLinkExpired,

    /// Staged registration could not be committed
    #[error("Invalid or expired verification token")]
    VerificationFailed,

    /// Notifier did not accept the verification email
    #[error("Failed to send verification email")]
    EmailDeliveryFailed,

    /// Missing or unusable configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    DatabaseTimeout(Duration),

    /// Ephemeral store error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Notifier transport error
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    /// JWT encoding error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Staged data could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TimeoutError> for AuthError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => AuthError::DatabaseTimeout(duration),
            TimeoutError::Database(e) => AuthError::Database(e),
        }
    }
}

impl AuthError {
    /// Stable error code surfaced to clients alongside [`client_message`](Self::client_message).
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::EmailInUse => "AUTH_001",
            AuthError::InvalidCredentials => "AUTH_002",
            AuthError::TokenExpired => "AUTH_003",
            AuthError::InvalidToken => "AUTH_004",
            AuthError::Unauthorized => "AUTH_005",
            AuthError::VerifyLinkExpired => "AUTH_006",
            AuthError::VerificationFailed => "AUTH_007",
            AuthError::EmailDeliveryFailed => "AUTH_008",
            _ => "ERR_001",
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Infrastructure errors (database, cache, mail, JWT encoding, configuration)
    /// are collapsed into a generic message so clients learn nothing about the
    /// internal system structure.
    pub fn client_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    /// Whether this error stems from infrastructure rather than the caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Configuration(_)
                | AuthError::Database(_)
                | AuthError::DatabaseTimeout(_)
                | AuthError::Cache(_)
                | AuthError::Mail(_)
                | AuthError::JwtError(_)
                | AuthError::Serialization(_)
        )
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
