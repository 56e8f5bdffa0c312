//! HS256 signing and verification of claims tokens.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use super::claims::{Claims, TokenPayload};
use crate::auth::{AuthError, AuthResult};

/// Verification failures visible to callers
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature valid but `exp` is in the past
    #[error("Token expired")]
    Expired,

    /// Bad signature, structure or claim shape
    #[error("Malformed token")]
    Malformed,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed => AuthError::InvalidToken,
        }
    }
}

/// Signs and verifies claims tokens with a shared secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl_secs: u64,
}

impl TokenCodec {
    /// Create a codec
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC signing secret
    /// * `default_ttl_secs` - Lifetime used by [`sign_with_default_ttl`](Self::sign_with_default_ttl)
    ///
    /// # Errors
    ///
    /// * `AuthError::Configuration` - The secret is empty
    pub fn new(secret: &str, default_ttl_secs: u64) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("JWT_SECRET is required".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_ttl_secs,
        })
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    /// Sign `payload` so that it expires `ttl_secs` from now.
    pub fn sign(&self, payload: TokenPayload, ttl_secs: u64) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX - now);
        let claims = Claims {
            payload,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };
        self.encode(&claims)
    }

    /// Sign with the codec's configured default lifetime.
    pub fn sign_with_default_ttl(&self, payload: TokenPayload) -> AuthResult<String> {
        self.sign(payload, self.default_ttl_secs)
    }

    /// Encode a fully specified claim set.
    pub fn encode(&self, claims: &Claims) -> AuthResult<String> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }

    /// Read claims without checking signature or expiry.
    ///
    /// Must never guard an authorization decision.
    pub fn decode(&self, token: &str) -> Option<Claims> {
        jsonwebtoken::dangerous::insecure_decode::<Claims>(token)
            .ok()
            .map(|data| data.claims)
    }
}
