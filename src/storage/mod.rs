//! Persistent repositories for users, clients, and access tokens.
//!
//! The traits here are the seam between the issuance engine and the
//! storage engine. [`postgres::PostgresStorage`] is the authoritative
//! backend; [`memory::MemoryStorage`] implements the same contracts for
//! tests and local development.

pub mod memory;
pub mod postgres;

use crate::error::ServiceError;
use crate::model::{AccessToken, Client, NewUser, TokenRecord, User, UserRecord};
use async_trait::async_trait;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

/// Repository for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user and return the assigned id.
    async fn create(&self, user: &NewUser) -> Result<i64, ServiceError>;

    /// Look up a user (with salt) by unique email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ServiceError>;
}

/// Repository for client applications.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Persist a new client owned by a user.
    async fn create(&self, user_id: i64, client: &Client) -> Result<(), ServiceError>;

    /// Look up a client by its externally assigned id.
    async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>, ServiceError>;
}

/// Repository for access tokens and their lineage links.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a new token bound to a (user, client) pair. The stored
    /// expiry is computed here from the token's `expires_in`. A duplicate
    /// token value surfaces as a storage error.
    async fn save(
        &self,
        user_id: i64,
        client_id: &str,
        token: &AccessToken,
    ) -> Result<(), ServiceError>;

    /// Direct lookup by access-token value. Expired tokens are not
    /// returned; this is the only expiry-gated path.
    async fn find_by_value(&self, access_token: &str)
        -> Result<Option<TokenRecord>, ServiceError>;

    /// Lookup by refresh-token value, scoped to the client the paired
    /// access token was issued to. Not expiry-gated: a token remains
    /// refreshable until explicitly revoked.
    async fn find_by_refresh_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<Option<AccessToken>, ServiceError>;

    /// Resolve the user owning a token.
    async fn find_user_for_token(&self, access_token: &str)
        -> Result<Option<User>, ServiceError>;

    /// Collapse the token's ancestor chain in one atomic operation: clear
    /// the token's parent link, then delete every token reachable through
    /// the parent chain captured before the clear. On failure nothing is
    /// committed and `record` is left untouched; on success the record's
    /// in-memory parent link is cleared too.
    async fn revoke_chain(&self, record: &mut TokenRecord) -> Result<(), ServiceError>;
}
