//! In-memory repositories for tests and local development.
//!
//! They honor the same uniqueness rules as the SQL schema: unique email per
//! user and at most one refresh record per user.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::repository::{RefreshTokenRepository, UserRepository};
use crate::auth::{
    AuthError, AuthProvider, AuthResult, NewUser, RefreshTokenRecord, RoleType, User, UserId,
};

/// Users keyed by id
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
    next_id: AtomicI64,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users, soft-deleted included
    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Soft-delete a user by email
    pub async fn soft_delete(&self, email: &str) -> bool {
        let mut users = self.users.write().await;
        match users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }
}

fn role_id(role: RoleType) -> i64 {
    match role {
        RoleType::Admin => 1,
        RoleType::User => 2,
        RoleType::Moderator => 3,
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        let mut users = self.users.write().await;
        // unique constraint covers soft-deleted rows too
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailInUse);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let created = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            display_name: user.display_name,
            role_id: Some(role_id(user.role)),
            role: Some(user.role),
            provider: AuthProvider::Local,
            provider_id: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.insert(id, created.clone());
        Ok(created)
    }
}

/// Refresh records keyed by user id
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenRepository {
    records: RwLock<HashMap<UserId, RefreshTokenRecord>>,
    next_id: AtomicI64,
}

impl MemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all users
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn find_by_user(&self, user_id: UserId) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(self.records.read().await.get(&user_id).cloned())
    }

    async fn upsert(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let record = records.entry(user_id).or_insert_with(|| RefreshTokenRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            token: String::new(),
            expires_at,
            is_revoked: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        record.token = token.to_string();
        record.expires_at = expires_at;
        record.is_revoked = false;
        record.deleted_at = None;
        record.updated_at = now;
        Ok(())
    }

    async fn revoke(&self, user_id: UserId, at: DateTime<Utc>) -> AuthResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&user_id) {
            Some(record) => {
                record.is_revoked = true;
                record.expires_at = at;
                record.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
