//! Bootstrap data: the fixed role set and an optional administrator account.

use crate::auth::{AuthResult, CredentialHasher, NewUser, RoleType, User};

use super::repository::UserRepository;

/// Result of [`ensure_admin`]
#[derive(Debug)]
pub enum SeedOutcome {
    Created(User),
    AlreadyPresent(User),
}

/// Create the administrator account unless a user with `email` already exists.
///
/// The password digest uses the same keyed transform as login, so the seeded
/// account can sign in immediately.
pub async fn ensure_admin(
    users: &dyn UserRepository,
    hasher: &CredentialHasher,
    email: &str,
    password: &str,
) -> AuthResult<SeedOutcome> {
    if let Some(existing) = users.find_by_email(email).await? {
        log::info!("Admin account already present (id {})", existing.id);
        return Ok(SeedOutcome::AlreadyPresent(existing));
    }

    let user = users
        .create_user(NewUser {
            email: email.to_string(),
            password_hash: hasher.hash(password)?,
            display_name: Some("System Administrator".to_string()),
            role: RoleType::Admin,
        })
        .await?;

    log::info!("Seeded admin account (id {})", user.id);
    Ok(SeedOutcome::Created(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryUserRepository;

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let users = MemoryUserRepository::new();
        let hasher = CredentialHasher::new("seed-key").unwrap();

        let first = ensure_admin(&users, &hasher, "admin@example.com", "admin123")
            .await
            .unwrap();
        let SeedOutcome::Created(admin) = first else {
            panic!("expected a new admin");
        };
        assert_eq!(admin.role, Some(RoleType::Admin));
        assert!(hasher.matches("admin123", &admin.password_hash).unwrap());

        let second = ensure_admin(&users, &hasher, "admin@example.com", "other")
            .await
            .unwrap();
        assert!(matches!(second, SeedOutcome::AlreadyPresent(u) if u.id == admin.id));
        assert_eq!(users.count().await, 1);
    }
}
