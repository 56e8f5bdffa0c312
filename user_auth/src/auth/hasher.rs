//! Keyed password digests.
//!
//! Digests are HMAC-SHA256 over the plaintext with a server-wide key, rendered
//! as lowercase hex. The transform is deterministic (no per-record salt), so
//! login re-derives the digest and compares it exactly.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the hashing key
pub const HASH_KEY_ENV: &str = "PASSWORD_HASH_KEY";

/// Credential hasher bound to a configured key
#[derive(Clone)]
pub struct CredentialHasher {
    key: Vec<u8>,
}

impl CredentialHasher {
    /// Create a hasher for `key`.
    ///
    /// # Errors
    ///
    /// * `AuthError::Configuration` - The key is empty
    pub fn new(key: impl Into<String>) -> AuthResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(AuthError::Configuration(format!("{HASH_KEY_ENV} is required")));
        }
        Ok(Self {
            key: key.into_bytes(),
        })
    }

    /// Create a hasher from `PASSWORD_HASH_KEY`.
    pub fn from_env() -> AuthResult<Self> {
        let key = std::env::var(HASH_KEY_ENV)
            .map_err(|_| AuthError::Configuration(format!("{HASH_KEY_ENV} is required")))?;
        Self::new(key)
    }

    /// Digest `secret` with the configured key.
    pub fn hash(&self, secret: &str) -> AuthResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AuthError::Configuration(format!("unusable {HASH_KEY_ENV}: {e}")))?;
        mac.update(secret.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Whether `secret` digests to exactly `digest`.
    pub fn matches(&self, secret: &str, digest: &str) -> AuthResult<bool> {
        let computed = self.hash(secret)?;
        Ok(constant_time_eq(&computed, digest))
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

/// Exact string equality without early exit on the first differing byte.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
