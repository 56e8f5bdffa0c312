//! Two-phase registration: stage the signup in the cache, send a verification
//! link, and create the user only once the link is followed.

use std::sync::Arc;

use chrono::Utc;

use super::{
    config::SessionConfig,
    errors::{AuthError, AuthResult},
    hasher::CredentialHasher,
    models::{NewUser, PendingRegistration, RegisterRequest, RegistrationReceipt, RoleType, User},
};
use crate::cache::{EphemeralStore, registration_key};
use crate::db::UserRepository;
use crate::mail::Notifier;
use crate::token::{EmailVerificationClaims, TokenCodec, TokenPayload};

/// Registration and email verification
#[derive(Clone)]
pub struct RegistrationManager {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn EphemeralStore>,
    notifier: Arc<dyn Notifier>,
    codec: Arc<TokenCodec>,
    hasher: Arc<CredentialHasher>,
    config: SessionConfig,
}

impl RegistrationManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn EphemeralStore>,
        notifier: Arc<dyn Notifier>,
        codec: Arc<TokenCodec>,
        hasher: Arc<CredentialHasher>,
        config: SessionConfig,
    ) -> Self {
        Self {
            users,
            cache,
            notifier,
            codec,
            hasher,
            config,
        }
    }

    /// Stage a registration and send the verification email
    ///
    /// # Arguments
    ///
    /// * `request` - Email, password and optional display name
    ///
    /// # Returns
    ///
    /// * `AuthResult<RegistrationReceipt>` - Email and verification token
    ///
    /// # Errors
    ///
    /// * `AuthError::EmailInUse` - A user with this email already exists
    /// * `AuthError::EmailDeliveryFailed` - The notifier failed or refused the message
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<RegistrationReceipt> {
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let pending = PendingRegistration {
            email: request.email,
            password_hash: self.hasher.hash(&request.password)?,
            display_name: request.display_name,
        };

        let token = self
            .codec
            .sign_with_default_ttl(TokenPayload::EmailVerification(EmailVerificationClaims {
                email: pending.email.clone(),
                timestamp: Utc::now().timestamp_millis(),
            }))?;

        match self
            .notifier
            .send_verification_email(&pending.email, &token, pending.display_name.as_deref())
            .await
        {
            Ok(delivery) if delivery.success => {}
            Ok(_) => {
                log::warn!("Verification email to {} was not accepted", pending.email);
                return Err(AuthError::EmailDeliveryFailed);
            }
            Err(e) => {
                log::warn!("Verification email to {} failed: {e}", pending.email);
                return Err(AuthError::EmailDeliveryFailed);
            }
        }

        self.cache
            .set(
                &registration_key(&pending.email),
                &serde_json::to_string(&pending)?,
                self.config.registration_ttl_secs,
            )
            .await?;

        log::info!("Registration pending verification for {}", pending.email);
        Ok(RegistrationReceipt {
            email: pending.email,
            verification_token: token,
        })
    }

    /// Commit a staged registration
    ///
    /// The token is decoded without signature or expiry checks; the staged
    /// cache entry is what actually authorizes the commit.
    ///
    /// # Errors
    ///
    /// * `AuthError::VerifyLinkExpired` - Unreadable token or nothing staged for its email
    /// * `AuthError::VerificationFailed` - Staged data unusable or the user could not be created
    pub async fn verify_email(&self, token: &str) -> AuthResult<User> {
        let claims = self
            .codec
            .decode(token)
            .and_then(|c| c.into_email_verification())
            .ok_or(AuthError::VerifyLinkExpired)?;

        let key = registration_key(&claims.email);
        let staged = self
            .cache
            .get(&key)
            .await?
            .ok_or(AuthError::VerifyLinkExpired)?;

        let pending: PendingRegistration = serde_json::from_str(&staged).map_err(|e| {
            log::error!("Unreadable pending registration for {}: {e}", claims.email);
            AuthError::VerificationFailed
        })?;

        let user = self
            .users
            .create_user(NewUser {
                email: pending.email,
                password_hash: pending.password_hash,
                display_name: pending.display_name,
                role: RoleType::User,
            })
            .await
            .map_err(|e| {
                log::warn!("Could not create verified user {}: {e}", claims.email);
                AuthError::VerificationFailed
            })?;

        self.cache.delete(&key).await.map_err(|e| {
            log::error!("Could not clear pending registration {key}: {e}");
            AuthError::VerificationFailed
        })?;

        log::info!("Email verified, created user {}", user.id);
        Ok(user)
    }
}
