//! Shared fixtures for the integration tests: in-memory stores and a
//! notifier that records what it was asked to send.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use user_auth::auth::{
    CredentialHasher, RegisterRequest, RegistrationManager, SessionConfig, SessionManager, User,
};
use user_auth::cache::MemoryStore;
use user_auth::db::{MemoryRefreshTokenRepository, MemoryUserRepository};
use user_auth::mail::{Delivery, MailError, MailResult, Notifier};
use user_auth::token::TokenCodec;

pub const JWT_SECRET: &str = "integration-test-secret-of-sufficient-length";
pub const HASH_KEY: &str = "integration-hash-key";

/// One captured verification email
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub token: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Accept,
    Refuse,
    Fail,
}

/// Notifier double
#[derive(Debug)]
pub struct RecordingNotifier {
    mode: Mode,
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::with_mode(Mode::Accept)
    }

    /// Reports `success = false`
    pub fn refusing() -> Self {
        Self::with_mode(Mode::Refuse)
    }

    /// Returns a transport error
    pub fn failing() -> Self {
        Self::with_mode(Mode::Fail)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|m| m.token.clone())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_email(
        &self,
        to: &str,
        token: &str,
        display_name: Option<&str>,
    ) -> MailResult<Delivery> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            token: token.to_string(),
            display_name: display_name.map(str::to_string),
        });

        match self.mode {
            Mode::Accept => Ok(Delivery {
                success: true,
                message_id: Some(format!("<{}@test>", self.sent.lock().unwrap().len())),
            }),
            Mode::Refuse => Ok(Delivery {
                success: false,
                message_id: None,
            }),
            Mode::Fail => Err(MailError::NotConfigured),
        }
    }
}

/// Both managers wired to shared in-memory stores
pub struct Fixture {
    pub users: Arc<MemoryUserRepository>,
    pub refresh_tokens: Arc<MemoryRefreshTokenRepository>,
    pub cache: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub codec: Arc<TokenCodec>,
    pub hasher: Arc<CredentialHasher>,
    pub registration: RegistrationManager,
    pub sessions: SessionManager,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::new())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        let users = Arc::new(MemoryUserRepository::new());
        let refresh_tokens = Arc::new(MemoryRefreshTokenRepository::new());
        let cache = Arc::new(MemoryStore::new());
        let notifier = Arc::new(notifier);
        let codec = Arc::new(TokenCodec::new(JWT_SECRET, 3600).unwrap());
        let hasher = Arc::new(CredentialHasher::new(HASH_KEY).unwrap());
        let config = SessionConfig::default();

        let registration = RegistrationManager::new(
            users.clone(),
            cache.clone(),
            notifier.clone(),
            codec.clone(),
            hasher.clone(),
            config,
        );
        let sessions = SessionManager::new(
            users.clone(),
            refresh_tokens.clone(),
            cache.clone(),
            codec.clone(),
            hasher.clone(),
            config,
        );

        Self {
            users,
            refresh_tokens,
            cache,
            notifier,
            codec,
            hasher,
            registration,
            sessions,
        }
    }

    /// Register and verify a user in one step
    pub async fn verified_user(&self, email: &str, password: &str) -> User {
        let receipt = self
            .registration
            .register(RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                display_name: None,
            })
            .await
            .expect("registration should succeed");
        self.registration
            .verify_email(&receipt.verification_token)
            .await
            .expect("verification should succeed")
    }
}
