//! Ephemeral key/value store with per-key time-to-live.
//!
//! Two kinds of entries live here:
//!
//! - `registration:<email>` - signup data waiting for email verification
//! - `refresh:<user id>` - the currently valid refresh token of a user
//!
//! No cross-key transactions are assumed. Expiry is enforced by the store.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::UserId;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value store with TTL
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, for `ttl_secs` seconds
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()>;

    /// Fetch a live value
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Remove a key; removing a missing key succeeds
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Connectivity check used by readiness
    async fn ping(&self) -> CacheResult<()>;
}

/// Key of a staged registration
pub fn registration_key(email: &str) -> String {
    format!("registration:{email}")
}

/// Key of a cached refresh token
pub fn refresh_key(user_id: UserId) -> String {
    format!("refresh:{user_id}")
}
