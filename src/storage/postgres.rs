//! Postgres-backed repositories.
//!
//! All statements are parameterized; the ancestor walk for chain
//! revocation is a single recursive CTE executed inside the revocation
//! transaction.

use crate::error::ServiceError;
use crate::model::{AccessToken, Client, NewUser, TokenRecord, User, UserRecord};
use crate::storage::{ClientStore, TokenStore, UserStore};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;

/// Deletes a token and its whole parent chain, seeded by the chain head
/// passed as `$1`. A NULL seed matches nothing and deletes nothing.
const DELETE_TOKEN_AND_PARENTS: &str = r#"
WITH RECURSIVE parent_tokens(access_token, parent_token) AS (
    SELECT access_token, parent_token
    FROM access_tokens
    WHERE access_token = $1
  UNION ALL
    SELECT at.access_token, at.parent_token
    FROM parent_tokens pt, access_tokens at
    WHERE at.access_token = pt.parent_token
)
DELETE FROM access_tokens
WHERE access_token IN (SELECT access_token FROM parent_tokens)
"#;

/// Shared repository over a Postgres connection pool.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    display_name: String,
    email: String,
    password: String,
    salt: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            user: User {
                id: row.id,
                display_name: row.display_name,
                email: row.email,
                password: row.password,
            },
            salt: row.salt,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    access_token: String,
    client_id: String,
    user_id: i64,
    token_type: String,
    expires_in: i64,
    refresh_token: String,
    parent_token: Option<String>,
}

impl From<TokenRow> for TokenRecord {
    fn from(row: TokenRow) -> Self {
        TokenRecord {
            token: AccessToken {
                access_token: row.access_token,
                token_type: row.token_type,
                expires_in: row.expires_in.max(0) as u64,
                refresh_token: row.refresh_token,
                parent_token: row.parent_token,
            },
            client_id: row.client_id,
            user_id: row.user_id,
        }
    }
}

#[async_trait]
impl UserStore for PostgresStorage {
    async fn create(&self, user: &NewUser) -> Result<i64, ServiceError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (display_name, email, password, salt)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ServiceError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, display_name, email, password, salt
             FROM users
             WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserRecord::from))
    }
}

#[async_trait]
impl ClientStore for PostgresStorage {
    async fn create(&self, user_id: i64, client: &Client) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO clients (client_id, client_secret, user_id)
             VALUES ($1, $2, $3)",
        )
        .bind(&client.id)
        .bind(&client.secret)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>, ServiceError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT client_id, client_secret
             FROM clients
             WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, secret)| Client { id, secret }))
    }
}

#[async_trait]
impl TokenStore for PostgresStorage {
    async fn save(
        &self,
        user_id: i64,
        client_id: &str,
        token: &AccessToken,
    ) -> Result<(), ServiceError> {
        let expires_on = Utc::now() + Duration::seconds(token.expires_in as i64);
        sqlx::query(
            "INSERT INTO access_tokens
                 (access_token, client_id, user_id, token_type, expires_in,
                  expires_on, refresh_token, parent_token)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&token.access_token)
        .bind(client_id)
        .bind(user_id)
        .bind(&token.token_type)
        .bind(token.expires_in as i64)
        .bind(expires_on)
        .bind(&token.refresh_token)
        .bind(token.parent_token.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_value(
        &self,
        access_token: &str,
    ) -> Result<Option<TokenRecord>, ServiceError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT access_token, client_id, user_id, token_type, expires_in,
                    refresh_token, parent_token
             FROM access_tokens
             WHERE access_token = $1 AND expires_on > NOW()",
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TokenRecord::from))
    }

    async fn find_by_refresh_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<Option<AccessToken>, ServiceError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT access_token, client_id, user_id, token_type, expires_in,
                    refresh_token, parent_token
             FROM access_tokens
             WHERE client_id = $1 AND refresh_token = $2",
        )
        .bind(client_id)
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| TokenRecord::from(r).token))
    }

    async fn find_user_for_token(
        &self,
        access_token: &str,
    ) -> Result<Option<User>, ServiceError> {
        let row = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT u.id, u.display_name, u.email, u.password
             FROM users u INNER JOIN access_tokens at
             ON u.id = at.user_id
             WHERE at.access_token = $1",
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, display_name, email, password)| User {
            id,
            display_name,
            email,
            password,
        }))
    }

    async fn revoke_chain(&self, record: &mut TokenRecord) -> Result<(), ServiceError> {
        // The parent link is captured before the clear so the delete still
        // reaches the full ancestry.
        let chain_head = record.token.parent_token.clone();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE access_tokens
             SET parent_token = NULL
             WHERE access_token = $1",
        )
        .bind(&record.token.access_token)
        .execute(&mut *tx)
        .await?;
        sqlx::query(DELETE_TOKEN_AND_PARENTS)
            .bind(chain_head.as_deref())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        record.token.parent_token = None;
        Ok(())
    }
}
