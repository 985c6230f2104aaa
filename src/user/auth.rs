//! Owner credential verification.

use crate::crypto::{constant_time_eq, PasswordHasher};
use crate::error::ServiceError;
use crate::model::User;
use crate::storage::UserStore;

/// Look up a user by email and verify the password against the stored
/// hash in constant time.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] for an unknown email and
/// [`ServiceError::CredentialsMismatch`] for a wrong password. Callers
/// must collapse both into the same external outcome; the distinction
/// exists only for logging.
pub async fn find_by_email_and_password(
    users: &dyn UserStore,
    hasher: &dyn PasswordHasher,
    email: &str,
    password: &str,
) -> Result<User, ServiceError> {
    let record = users
        .find_by_email(email)
        .await?
        .ok_or(ServiceError::NotFound)?;
    let derived = hasher.hash_hex(password, &record.salt);
    if constant_time_eq(derived.as_bytes(), record.user.password.as_bytes()) {
        Ok(record.user)
    } else {
        Err(ServiceError::CredentialsMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Pbkdf2PasswordHasher, TokenGenerator};
    use crate::model::NewUser;
    use crate::storage::MemoryStorage;

    async fn seeded_storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        let hasher = Pbkdf2PasswordHasher::new();
        let salt = TokenGenerator::new().generate_hex(60).unwrap();
        let user = NewUser {
            display_name: "Alice".to_string(),
            email: "a@example.com".to_string(),
            password_hash: hasher.hash_hex("secret1", &salt),
            salt,
        };
        UserStore::create(&storage, &user).await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_correct_credentials() {
        let storage = seeded_storage().await;
        let hasher = Pbkdf2PasswordHasher::new();
        let user =
            find_by_email_and_password(&storage, &hasher, "a@example.com", "secret1")
                .await
                .unwrap();
        assert_eq!(user.email, "a@example.com");
        assert_ne!(user.password, "secret1");
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let storage = seeded_storage().await;
        let hasher = Pbkdf2PasswordHasher::new();
        let result =
            find_by_email_and_password(&storage, &hasher, "a@example.com", "wrong").await;
        assert!(matches!(result, Err(ServiceError::CredentialsMismatch)));
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let storage = seeded_storage().await;
        let hasher = Pbkdf2PasswordHasher::new();
        let result =
            find_by_email_and_password(&storage, &hasher, "b@example.com", "secret1").await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }
}
