//! Repository trait definitions for testability and dependency injection.
//!
//! The session engine and registration flow only see these traits. PostgreSQL
//! implementations live here; in-memory ones live in [`super::memory`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::timeouts::{TimeoutError, with_default_timeout};
use crate::auth::{AuthError, AuthResult, NewUser, RefreshTokenRecord, User, UserId};

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a live (not soft-deleted) user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Insert a user. Fails if the email is already taken.
    async fn create_user(&self, user: NewUser) -> AuthResult<User>;
}

/// Trait for the single long-tier refresh record per user
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Find the record of a user
    async fn find_by_user(&self, user_id: UserId) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Create or overwrite the record of a user, clearing any revocation
    async fn upsert(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Mark the record revoked and expire it at `at`. Returns whether a row existed.
    async fn revoke(&self, user_id: UserId, at: DateTime<Utc>) -> AuthResult<bool>;
}

const USER_COLUMNS: &str = "u.id, u.email, u.password_hash, u.display_name, u.role_id, \
     r.type::text AS role_type, u.provider::text AS provider, u.provider_id, u.avatar_url, \
     u.created_at, u.updated_at, u.deleted_at";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        display_name: row.get("display_name"),
        role_id: row.get("role_id"),
        role: row
            .get::<Option<String>, _>("role_type")
            .and_then(|t| t.parse().ok()),
        provider: row
            .get::<String, _>("provider")
            .parse()
            .unwrap_or_default(),
        provider_id: row.get("provider_id"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get::<NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<NaiveDateTime, _>("updated_at").and_utc(),
        deleted_at: row
            .get::<Option<NaiveDateTime>, _>("deleted_at")
            .map(|dt| dt.and_utc()),
    }
}

/// PostgreSQL implementation of `UserRepository`
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}
             FROM users u LEFT JOIN roles r ON r.id = u.role_id
             WHERE u.email = $1 AND u.deleted_at IS NULL"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        let sql = format!(
            "WITH inserted AS (
                 INSERT INTO users (email, password_hash, display_name, role_id, provider)
                 VALUES ($1, $2, $3,
                         (SELECT id FROM roles WHERE type = $4::role_type_enum),
                         'local')
                 RETURNING *
             )
             SELECT {USER_COLUMNS}
             FROM inserted u LEFT JOIN roles r ON r.id = u.role_id"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&user.display_name)
                .bind(user.role.as_str())
                .fetch_one(&self.pool),
        )
        .await
        .map_err(|e| match e {
            TimeoutError::Database(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation() =>
            {
                AuthError::EmailInUse
            }
            other => other.into(),
        })?;

        Ok(user_from_row(&row))
    }
}

/// PostgreSQL implementation of `RefreshTokenRepository`
#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn find_by_user(&self, user_id: UserId) -> AuthResult<Option<RefreshTokenRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                SELECT id, user_id, token, expires_at, is_revoked, created_at, updated_at, deleted_at
                FROM refresh_tokens
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(|r| RefreshTokenRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            token: r.get("token"),
            expires_at: r.get::<NaiveDateTime, _>("expires_at").and_utc(),
            is_revoked: r.get("is_revoked"),
            created_at: r.get::<NaiveDateTime, _>("created_at").and_utc(),
            updated_at: r.get::<NaiveDateTime, _>("updated_at").and_utc(),
            deleted_at: r
                .get::<Option<NaiveDateTime>, _>("deleted_at")
                .map(|dt| dt.and_utc()),
        }))
    }

    async fn upsert(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        // The unique index on user_id makes this a single atomic overwrite
        with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO refresh_tokens (user_id, token, expires_at, is_revoked)
                VALUES ($1, $2, $3, FALSE)
                ON CONFLICT (user_id) DO UPDATE
                SET token = EXCLUDED.token,
                    expires_at = EXCLUDED.expires_at,
                    is_revoked = FALSE,
                    deleted_at = NULL,
                    updated_at = $4
                "#,
            )
            .bind(user_id)
            .bind(token)
            .bind(expires_at.naive_utc())
            .bind(Utc::now().naive_utc())
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn revoke(&self, user_id: UserId, at: DateTime<Utc>) -> AuthResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                r#"
                UPDATE refresh_tokens
                SET is_revoked = TRUE, expires_at = $2, updated_at = $2
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .bind(at.naive_utc())
            .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
