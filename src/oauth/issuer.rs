//! The grant-type state machine.

use crate::crypto::{constant_time_eq, PasswordHasher, TokenGenerator};
use crate::error::ServiceError;
use crate::messages::{AccessTokenRequest, AccessTokenResponse, ErrorResponse};
use crate::model::{AccessToken, Client};
use crate::oauth::{
    ERROR_INVALID_CLIENT, ERROR_INVALID_GRANT, ERROR_INVALID_REQUEST,
    ERROR_UNSUPPORTED_GRANT_TYPE, GRANT_TYPE_PASSWORD, GRANT_TYPE_REFRESH_TOKEN,
};
use crate::storage::{ClientStore, TokenStore, UserStore};
use crate::user::auth::find_by_email_and_password;
use std::sync::Arc;
use tracing::{info, warn};

const ACCESS_TOKEN_SIZE: usize = 32;
const REFRESH_TOKEN_SIZE: usize = 32;

/// Verify a presented client against the registry.
///
/// Returns the stored client only when it exists and its secret matches in
/// constant time (a length mismatch short-circuits to not-equal).
pub(crate) async fn verify_client(
    clients: &dyn ClientStore,
    presented: &Client,
) -> Result<Option<Client>, ServiceError> {
    match clients.find_by_id(&presented.id).await? {
        Some(stored)
            if constant_time_eq(stored.secret.as_bytes(), presented.secret.as_bytes()) =>
        {
            Ok(Some(stored))
        }
        _ => Ok(None),
    }
}

/// Token issuance engine: dispatches on grant type after authenticating
/// the requesting client.
pub struct TokenIssuer {
    users: Arc<dyn UserStore>,
    clients: Arc<dyn ClientStore>,
    tokens: Arc<dyn TokenStore>,
    generator: TokenGenerator,
    hasher: Arc<dyn PasswordHasher>,
    /// Lifetime of a password-grant token, seconds.
    access_token_ttl: u64,
    /// Lifetime of a refresh-grant token, seconds. Longer-lived: the
    /// requester already proved recent possession of a valid refresh token.
    refresh_token_ttl: u64,
}

impl TokenIssuer {
    pub fn new(
        users: Arc<dyn UserStore>,
        clients: Arc<dyn ClientStore>,
        tokens: Arc<dyn TokenStore>,
        generator: TokenGenerator,
        hasher: Arc<dyn PasswordHasher>,
        access_token_ttl: u64,
        refresh_token_ttl: u64,
    ) -> Self {
        Self {
            users,
            clients,
            tokens,
            generator,
            hasher,
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    /// Handle one access token request.
    ///
    /// Domain failures (bad client, bad credentials, malformed grant) come
    /// back as `Ok` with an error payload; an `Err` is an infrastructure
    /// failure the caller must not translate into an OAuth2 error.
    pub async fn issue(
        &self,
        request: &AccessTokenRequest,
    ) -> Result<AccessTokenResponse, ServiceError> {
        let Some(client) = verify_client(self.clients.as_ref(), &request.client).await? else {
            warn!(client_id = %request.client.id, "Unknown client");
            return Ok(AccessTokenResponse::with_error(ErrorResponse::new(
                ERROR_INVALID_CLIENT,
                "Client not found.",
            )));
        };

        match request.grant_type.as_str() {
            GRANT_TYPE_PASSWORD => self.password_grant(&client, request).await,
            GRANT_TYPE_REFRESH_TOKEN => self.refresh_token_grant(&client, request).await,
            other => Ok(AccessTokenResponse::with_error(ErrorResponse::new(
                ERROR_UNSUPPORTED_GRANT_TYPE,
                format!("Unsupported grant type: {}.", other),
            ))),
        }
    }

    async fn password_grant(
        &self,
        client: &Client,
        request: &AccessTokenRequest,
    ) -> Result<AccessTokenResponse, ServiceError> {
        let username = request.username.as_deref().unwrap_or_default();
        let password = request.password.as_deref().unwrap_or_default();

        let user = match find_by_email_and_password(
            self.users.as_ref(),
            self.hasher.as_ref(),
            username,
            password,
        )
        .await
        {
            Ok(user) => user,
            Err(ServiceError::NotFound | ServiceError::CredentialsMismatch) => {
                warn!(client_id = %client.id, "Wrong owner credentials");
                return Ok(AccessTokenResponse::with_error(ErrorResponse::new(
                    ERROR_INVALID_GRANT,
                    "Wrong owner credentials",
                )));
            }
            Err(err) => return Err(err),
        };

        let token = self.mint(None, self.access_token_ttl)?;
        self.tokens.save(user.id, &client.id, &token).await?;
        info!(client_id = %client.id, user_id = user.id, "Issued password-grant token");
        Ok(AccessTokenResponse::with_token(token))
    }

    async fn refresh_token_grant(
        &self,
        client: &Client,
        request: &AccessTokenRequest,
    ) -> Result<AccessTokenResponse, ServiceError> {
        let Some(refresh_token) = request.refresh_token.as_deref() else {
            return Ok(AccessTokenResponse::with_error(ErrorResponse::new(
                ERROR_INVALID_REQUEST,
                "Required parameter is missing",
            )));
        };

        let Some(previous) = self
            .tokens
            .find_by_refresh_token(&client.id, refresh_token)
            .await?
        else {
            warn!(client_id = %client.id, "Invalid refresh token");
            return Ok(AccessTokenResponse::with_error(ErrorResponse::new(
                ERROR_INVALID_GRANT,
                "Invalid refresh token",
            )));
        };

        // The owning user can vanish between the lookups if a revocation
        // races this request; treat that like an invalid token.
        let Some(user) = self
            .tokens
            .find_user_for_token(&previous.access_token)
            .await?
        else {
            warn!(client_id = %client.id, "No owning user for refreshed token");
            return Ok(AccessTokenResponse::with_error(ErrorResponse::new(
                ERROR_INVALID_GRANT,
                "Invalid refresh token",
            )));
        };

        // The replaced token deliberately stays valid until an explicit
        // chain revocation; the new token only records its lineage.
        let token = self.mint(Some(previous.access_token), self.refresh_token_ttl)?;
        self.tokens.save(user.id, &client.id, &token).await?;
        info!(client_id = %client.id, user_id = user.id, "Issued refresh-grant token");
        Ok(AccessTokenResponse::with_token(token))
    }

    fn mint(
        &self,
        parent_token: Option<String>,
        expires_in: u64,
    ) -> Result<AccessToken, ServiceError> {
        let access_token = self.generator.generate_hex(ACCESS_TOKEN_SIZE)?;
        let refresh_token = self.generator.generate_hex(REFRESH_TOKEN_SIZE)?;
        Ok(AccessToken::bearer(
            access_token,
            refresh_token,
            expires_in,
            parent_token,
        ))
    }
}
