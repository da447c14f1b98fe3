//! Credential verification against the user store

use schoolhub_db::{User, UserRepository};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::password::{dummy_hash, verify_password};

/// Checks an identifier (email or username) and password against the store
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Resolve the credentials to exactly one user.
    ///
    /// Unknown identifier and wrong password both yield
    /// `InvalidCredentials`. Store failures are not retried.
    pub async fn verify(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        debug!("Verifying credentials for: {}", identifier);

        let user = self.users.find_user_by_identifier(identifier).await?;

        let Some(user) = user else {
            // Same Argon2 cost as a real mismatch
            let _ = verify_password(password, dummy_hash());
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!("Password mismatch for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::hash_password;
    use schoolhub_db::{
        DbError, MemoryStore, NewSchool, NewUser, Role, SchoolRepository, UserRepository,
    };

    async fn seeded() -> (CredentialVerifier, User) {
        let store = MemoryStore::new();
        store
            .insert_school(NewSchool {
                id: Some("s1".to_string()),
                name: "Springfield High".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let user = store
            .insert_user(NewUser {
                email: "a@x.com".to_string(),
                username: Some("admin_springfield".to_string()),
                full_name: "Springfield Admin".to_string(),
                password_hash: hash_password("secret").unwrap(),
                role: Role::SchoolAdmin,
                school_id: Some("s1".to_string()),
            })
            .await
            .unwrap();
        (CredentialVerifier::new(Arc::new(store)), user)
    }

    #[tokio::test]
    async fn test_email_and_username_both_resolve() {
        let (verifier, user) = seeded().await;

        let by_email = verifier.verify("a@x.com", "secret").await.unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.role, Role::SchoolAdmin);
        assert_eq!(by_email.school_id.as_deref(), Some("s1"));

        let by_username = verifier.verify("admin_springfield", "secret").await.unwrap();
        assert_eq!(by_username.id, user.id);
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let (verifier, _) = seeded().await;

        let wrong_password = verifier.verify("a@x.com", "wrong").await.unwrap_err();
        let unknown_user = verifier.verify("ghost@x.com", "secret").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let (verifier, _) = seeded().await;

        for (identifier, password) in [("", "secret"), ("   ", "secret"), ("a@x.com", "")] {
            assert!(matches!(
                verifier.verify(identifier, password).await,
                Err(AuthError::MissingFields)
            ));
        }
    }

    #[tokio::test]
    async fn test_password_is_case_sensitive() {
        let (verifier, _) = seeded().await;
        assert!(matches!(
            verifier.verify("a@x.com", "SECRET").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl UserRepository for BrokenStore {
        async fn find_user_by_identifier(&self, _: &str) -> Result<Option<User>, DbError> {
            Err(DbError::Migration("store offline".to_string()))
        }
        async fn get_user_by_id(&self, _: i64) -> Result<Option<User>, DbError> {
            unreachable!()
        }
        async fn insert_user(&self, _: NewUser) -> Result<User, DbError> {
            unreachable!()
        }
        async fn list_users(&self, _: Option<&str>, _: Option<Role>) -> Result<Vec<User>, DbError> {
            unreachable!()
        }
        async fn count_users(&self, _: Option<&str>, _: Option<Role>) -> Result<i64, DbError> {
            unreachable!()
        }
        async fn update_user_password(&self, _: i64, _: &str) -> Result<bool, DbError> {
            unreachable!()
        }
        async fn delete_user(&self, _: i64) -> Result<bool, DbError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let verifier = CredentialVerifier::new(Arc::new(BrokenStore));
        assert!(matches!(
            verifier.verify("a@x.com", "secret").await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }
}
