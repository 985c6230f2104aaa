//! In-memory repositories implementing the storage contracts.
//!
//! Backs the test suites and local development. A single lock over all
//! tables makes chain revocation trivially atomic; every operation holds
//! the lock for its whole duration.

use crate::error::ServiceError;
use crate::model::{AccessToken, Client, NewUser, TokenRecord, User, UserRecord};
use crate::storage::{ClientStore, TokenStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredClient {
    client: Client,
    #[allow(dead_code)]
    user_id: i64,
}

#[derive(Debug, Clone)]
struct StoredToken {
    token: AccessToken,
    client_id: String,
    user_id: i64,
    expires_on: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    next_user_id: i64,
    users: HashMap<i64, UserRecord>,
    clients: HashMap<String, StoredClient>,
    tokens: HashMap<String, StoredToken>,
}

/// Lock-protected in-memory storage.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of token rows currently stored. Test helper.
    pub async fn token_count(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }

    /// Whether a token row exists, expired or not. Test helper.
    pub async fn contains_token(&self, access_token: &str) -> bool {
        self.inner.lock().await.tokens.contains_key(access_token)
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn create(&self, user: &NewUser) -> Result<i64, ServiceError> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|r| r.user.email == user.email) {
            return Err(ServiceError::storage(format!(
                "duplicate email: {}",
                user.email
            )));
        }
        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.insert(
            id,
            UserRecord {
                user: User {
                    id,
                    display_name: user.display_name.clone(),
                    email: user.email.clone(),
                    password: user.password_hash.clone(),
                },
                salt: user.salt.clone(),
            },
        );
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|r| r.user.email == email)
            .cloned())
    }
}

#[async_trait]
impl ClientStore for MemoryStorage {
    async fn create(&self, user_id: i64, client: &Client) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        if inner.clients.contains_key(&client.id) {
            return Err(ServiceError::storage(format!(
                "duplicate client id: {}",
                client.id
            )));
        }
        inner.clients.insert(
            client.id.clone(),
            StoredClient {
                client: client.clone(),
                user_id,
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner.clients.get(client_id).map(|c| c.client.clone()))
    }
}

#[async_trait]
impl TokenStore for MemoryStorage {
    async fn save(
        &self,
        user_id: i64,
        client_id: &str,
        token: &AccessToken,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        if inner.tokens.contains_key(&token.access_token)
            || inner
                .tokens
                .values()
                .any(|t| t.token.refresh_token == token.refresh_token)
        {
            return Err(ServiceError::storage("duplicate token value"));
        }
        inner.tokens.insert(
            token.access_token.clone(),
            StoredToken {
                token: token.clone(),
                client_id: client_id.to_string(),
                user_id,
                expires_on: Utc::now() + Duration::seconds(token.expires_in as i64),
            },
        );
        Ok(())
    }

    async fn find_by_value(
        &self,
        access_token: &str,
    ) -> Result<Option<TokenRecord>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .get(access_token)
            .filter(|t| t.expires_on > Utc::now())
            .map(|t| TokenRecord {
                token: t.token.clone(),
                client_id: t.client_id.clone(),
                user_id: t.user_id,
            }))
    }

    async fn find_by_refresh_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<Option<AccessToken>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .values()
            .find(|t| t.client_id == client_id && t.token.refresh_token == refresh_token)
            .map(|t| t.token.clone()))
    }

    async fn find_user_for_token(
        &self,
        access_token: &str,
    ) -> Result<Option<User>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .get(access_token)
            .and_then(|t| inner.users.get(&t.user_id))
            .map(|r| r.user.clone()))
    }

    async fn revoke_chain(&self, record: &mut TokenRecord) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;

        // Walk the ancestry captured before the parent link is cleared.
        let mut next = record.token.parent_token.clone();
        while let Some(value) = next {
            next = inner
                .tokens
                .get(&value)
                .and_then(|t| t.token.parent_token.clone());
            inner.tokens.remove(&value);
        }

        if let Some(stored) = inner.tokens.get_mut(&record.token.access_token) {
            stored.token.parent_token = None;
        }
        record.token.parent_token = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: &str, refresh: &str, parent: Option<&str>) -> AccessToken {
        AccessToken::bearer(
            value.to_string(),
            refresh.to_string(),
            3600,
            parent.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_duplicate_token_value_is_surfaced() {
        let storage = MemoryStorage::new();
        storage.save(1, "c1", &token("t1", "r1", None)).await.unwrap();
        let result = storage.save(1, "c1", &token("t1", "r2", None)).await;
        assert!(matches!(result, Err(ServiceError::Storage(_))));
    }

    #[tokio::test]
    async fn test_refresh_lookup_is_client_scoped() {
        let storage = MemoryStorage::new();
        storage.save(1, "c1", &token("t1", "r1", None)).await.unwrap();
        assert!(storage.find_by_refresh_token("c1", "r1").await.unwrap().is_some());
        assert!(storage.find_by_refresh_token("c2", "r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_not_found_by_value() {
        let storage = MemoryStorage::new();
        let mut expired = token("t1", "r1", None);
        expired.expires_in = 0;
        storage.save(1, "c1", &expired).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(storage.find_by_value("t1").await.unwrap().is_none());
        // Still refreshable: the refresh path is not expiry-gated.
        assert!(storage.find_by_refresh_token("c1", "r1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke_chain_deletes_direct_lineage_only() {
        let storage = MemoryStorage::new();
        storage.save(1, "c1", &token("t1", "r1", None)).await.unwrap();
        storage.save(1, "c1", &token("t2", "r2", Some("t1"))).await.unwrap();
        storage.save(1, "c1", &token("t3", "r3", Some("t1"))).await.unwrap();
        storage.save(1, "c1", &token("t4", "r4", Some("t2"))).await.unwrap();

        let mut record = storage.find_by_value("t4").await.unwrap().unwrap();
        storage.revoke_chain(&mut record).await.unwrap();

        assert!(record.token.parent_token.is_none());
        assert!(!storage.contains_token("t1").await);
        assert!(!storage.contains_token("t2").await);
        assert!(storage.contains_token("t3").await);
        assert!(storage.contains_token("t4").await);
        assert_eq!(storage.token_count().await, 2);

        let survivor = storage.find_by_value("t4").await.unwrap().unwrap();
        assert!(survivor.token.parent_token.is_none());
    }
}
