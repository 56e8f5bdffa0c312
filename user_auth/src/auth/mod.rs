//! Authentication module providing registration, login and session management.
//!
//! This module implements:
//! - Two-phase registration with email verification
//! - Keyed HMAC-SHA256 password digests
//! - Short (cache only) and long (cache plus durable record) refresh sessions
//! - Single-use refresh-token rotation that issues short-lived access tokens
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use user_auth::auth::{CredentialHasher, LoginRequest, SessionConfig, SessionManager};
//! use user_auth::cache::MemoryStore;
//! use user_auth::db::{MemoryRefreshTokenRepository, MemoryUserRepository};
//! use user_auth::token::TokenCodec;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sessions = SessionManager::new(
//!         Arc::new(MemoryUserRepository::new()),
//!         Arc::new(MemoryRefreshTokenRepository::new()),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(TokenCodec::new("jwt_secret_with_at_least_32_chars!", 3600)?),
//!         Arc::new(CredentialHasher::new("hash_key")?),
//!         SessionConfig::default(),
//!     );
//!
//!     let outcome = sessions
//!         .login(LoginRequest {
//!             email: "alice@example.com".to_string(),
//!             password: "secret123".to_string(),
//!             stay_login: true,
//!         })
//!         .await?;
//!     let tokens = sessions.issue_access_token(&outcome.refresh_token).await?;
//!     println!("access token valid for {}s", tokens.access_ttl_secs);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod hasher;
pub mod models;
pub mod registration;
pub mod session;

pub use config::SessionConfig;
pub use errors::{AuthError, AuthResult};
pub use hasher::CredentialHasher;
pub use models::{
    AuthProvider, LoginOutcome, LoginRequest, NewUser, PendingRegistration, RefreshTokenRecord,
    RegisterRequest, RegistrationReceipt, RoleType, SessionTokens, User, UserId,
};
pub use registration::RegistrationManager;
pub use session::SessionManager;
