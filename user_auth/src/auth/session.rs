//! Session engine: login, refresh-token rotation and logout.
//!
//! A refresh session is either short (cache only) or long (cache plus one
//! durable row per user). The cache always holds the single currently valid
//! refresh token of a user, so presenting any older token fails.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{
    config::{LONG_CACHE_TTL_SECS, LONG_REFRESH_TTL_SECS, SessionConfig},
    errors::{AuthError, AuthResult},
    hasher::{CredentialHasher, constant_time_eq},
    models::{LoginOutcome, LoginRequest, SessionTokens, User},
};
use crate::cache::{EphemeralStore, refresh_key};
use crate::db::{RefreshTokenRepository, UserRepository};
use crate::token::{AccessClaims, RefreshClaims, Tier, TokenCodec, TokenPayload};

/// How the cached refresh token compares to the presented one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheVerdict {
    Matched,
    Mismatched,
    Missing,
}

impl CacheVerdict {
    pub fn of(cached: Option<&str>, presented: &str) -> Self {
        match cached {
            Some(token) if constant_time_eq(token, presented) => CacheVerdict::Matched,
            Some(_) => CacheVerdict::Mismatched,
            None => CacheVerdict::Missing,
        }
    }
}

/// What to do with a presented refresh token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
    ConsultDurable,
}

/// Rotation policy. Only a long session may fall back to the durable record,
/// and only when the cache has nothing for the user.
pub fn decide(tier: Tier, verdict: CacheVerdict) -> Decision {
    match (tier, verdict) {
        (_, CacheVerdict::Matched) => Decision::Accept,
        (_, CacheVerdict::Mismatched) => Decision::Reject,
        (Tier::Short, CacheVerdict::Missing) => Decision::Reject,
        (Tier::Long, CacheVerdict::Missing) => Decision::ConsultDurable,
    }
}

/// Session manager
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    cache: Arc<dyn EphemeralStore>,
    codec: Arc<TokenCodec>,
    hasher: Arc<CredentialHasher>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        cache: Arc<dyn EphemeralStore>,
        codec: Arc<TokenCodec>,
        hasher: Arc<CredentialHasher>,
        config: SessionConfig,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            cache,
            codec,
            hasher,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authenticate with email and password and open a refresh session
    ///
    /// # Arguments
    ///
    /// * `request` - Credentials and the stay-logged-in flag
    ///
    /// # Returns
    ///
    /// * `AuthResult<LoginOutcome>` - Refresh token and its lifetime
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginOutcome> {
        let Some(user) = self.users.find_by_email(&request.email).await? else {
            log::warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.matches(&request.password, &user.password_hash)? {
            log::warn!("Login failed: wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let tier = Tier::from_stay_login(request.stay_login);
        let refresh_ttl_secs = self.refresh_ttl(tier);
        let refresh_token = self.mint_refresh(&user, tier)?;

        if tier == Tier::Long {
            self.refresh_tokens
                .upsert(user.id, &refresh_token, expires_at(refresh_ttl_secs))
                .await?;
        }

        self.cache
            .set(
                &refresh_key(user.id),
                &refresh_token,
                self.config.refresh_cache_ttl_secs,
            )
            .await?;

        log::info!("User {} logged in ({} session)", user.id, tier.as_str());
        Ok(LoginOutcome {
            user_id: user.id,
            refresh_token,
            refresh_ttl_secs,
            stay_login: request.stay_login,
        })
    }

    /// Exchange a refresh token for a new access token and a rotated refresh token
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenExpired` - The refresh token is past its expiry
    /// * `AuthError::InvalidToken` - Any other validation failure, including reuse
    ///   of a token that has already been rotated
    pub async fn issue_access_token(&self, refresh_token: &str) -> AuthResult<SessionTokens> {
        let claims = self
            .codec
            .verify(refresh_token)?
            .into_refresh()
            .ok_or(AuthError::InvalidToken)?;

        let user = self
            .users
            .find_by_email(&claims.email)
            .await?
            .filter(|u| u.id == claims.sub)
            .ok_or(AuthError::InvalidToken)?;

        let cache_key = refresh_key(user.id);
        let cached = self.cache.get(&cache_key).await?;
        let verdict = CacheVerdict::of(cached.as_deref(), refresh_token);

        match decide(claims.tier, verdict) {
            Decision::Accept => {}
            Decision::Reject => {
                log::warn!(
                    "Rejected {} refresh token for user {} ({verdict:?})",
                    claims.tier.as_str(),
                    user.id
                );
                return Err(AuthError::InvalidToken);
            }
            Decision::ConsultDurable => {
                let authorized = self
                    .refresh_tokens
                    .find_by_user(user.id)
                    .await?
                    .is_some_and(|record| record.authorizes(refresh_token, Utc::now()));
                if !authorized {
                    log::warn!("Rejected long refresh token for user {}", user.id);
                    return Err(AuthError::InvalidToken);
                }
            }
        }

        let refresh_ttl_secs = self.refresh_ttl(claims.tier);
        let new_refresh = self.mint_refresh(&user, claims.tier)?;

        let refresh_cache_ttl_secs = match claims.tier {
            Tier::Short => {
                self.cache
                    .set(&cache_key, &new_refresh, self.config.refresh_short_ttl_secs)
                    .await?;
                None
            }
            Tier::Long => {
                self.cache
                    .set(&cache_key, &new_refresh, LONG_CACHE_TTL_SECS)
                    .await?;
                self.refresh_tokens
                    .upsert(user.id, &new_refresh, expires_at(refresh_ttl_secs))
                    .await?;
                Some(LONG_CACHE_TTL_SECS)
            }
        };

        let access_token = self.codec.sign(
            TokenPayload::Access(AccessClaims {
                sub: user.id,
                email: user.email.clone(),
            }),
            self.config.access_ttl_secs,
        )?;

        log::debug!("Rotated {} refresh token for user {}", claims.tier.as_str(), user.id);
        Ok(SessionTokens {
            access_token,
            refresh_token: new_refresh,
            access_ttl_secs: self.config.access_ttl_secs,
            refresh_ttl_secs,
            refresh_cache_ttl_secs,
        })
    }

    /// End the session of a refresh token. Never fails.
    ///
    /// Tokens that do not verify are ignored. For a long session the durable
    /// record is revoked and expired but kept.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(claims) = refresh_token
            .and_then(|token| self.codec.verify(token).ok())
            .and_then(|claims| claims.into_refresh())
        else {
            return;
        };

        if let Err(e) = self.cache.delete(&refresh_key(claims.sub)).await {
            log::warn!("Logout: could not clear cached refresh token for user {}: {e}", claims.sub);
        }

        if claims.stay_login {
            if let Err(e) = self.refresh_tokens.revoke(claims.sub, Utc::now()).await {
                log::warn!(
                    "Logout: could not revoke refresh record for user {}: {e}",
                    claims.sub
                );
            }
        }

        log::info!("User {} logged out", claims.sub);
    }

    /// Validate an access token for a protected request
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenExpired` - The token is past its expiry
    /// * `AuthError::InvalidToken` - Bad signature, structure, or not an access token
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessClaims> {
        self.codec
            .verify(token)?
            .into_access()
            .ok_or(AuthError::InvalidToken)
    }

    /// Resolve the user an access token was issued to
    pub async fn current_user(&self, claims: &AccessClaims) -> AuthResult<User> {
        self.users
            .find_by_email(&claims.email)
            .await?
            .filter(|u| u.id == claims.sub)
            .ok_or(AuthError::InvalidToken)
    }

    fn refresh_ttl(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Short => self.config.refresh_short_ttl_secs,
            Tier::Long => LONG_REFRESH_TTL_SECS,
        }
    }

    fn mint_refresh(&self, user: &User, tier: Tier) -> AuthResult<String> {
        self.codec.sign(
            TokenPayload::Refresh(RefreshClaims::new(user.id, user.email.clone(), tier)),
            self.refresh_ttl(tier),
        )
    }
}

fn expires_at(ttl_secs: u64) -> DateTime<Utc> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        use CacheVerdict::*;
        use Decision::*;

        let table = [
            (Tier::Short, Matched, Accept),
            (Tier::Short, Mismatched, Reject),
            (Tier::Short, Missing, Reject),
            (Tier::Long, Matched, Accept),
            (Tier::Long, Mismatched, Reject),
            (Tier::Long, Missing, ConsultDurable),
        ];
        for (tier, verdict, expected) in table {
            assert_eq!(decide(tier, verdict), expected, "{tier:?} / {verdict:?}");
        }
    }

    #[test]
    fn test_cache_verdict() {
        assert_eq!(CacheVerdict::of(Some("a"), "a"), CacheVerdict::Matched);
        assert_eq!(CacheVerdict::of(Some("a"), "b"), CacheVerdict::Mismatched);
        assert_eq!(CacheVerdict::of(None, "a"), CacheVerdict::Missing);
    }

    #[test]
    fn test_expires_at_is_in_the_future() {
        let at = expires_at(LONG_REFRESH_TTL_SECS);
        let days = (at - Utc::now()).num_days();
        assert!((29..=30).contains(&days));
    }
}
