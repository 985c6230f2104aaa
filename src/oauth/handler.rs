//! Message handlers for the OAuth2 service socket.

use crate::messages::{
    AccessTokenRequest, ErrorResponse, RevokeResponse, RevokeToken, ValidateToken,
    ValidationResult,
};
use crate::oauth::issuer::{verify_client, TokenIssuer};
use crate::oauth::{ERROR_INVALID_CLIENT, ERROR_INVALID_GRANT};
use crate::rpc::{encode_response, DispatchError, MessageHandler};
use crate::storage::{ClientStore, TokenStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handles `AccessTokenRequest` messages by delegating to the issuer.
pub struct AccessTokenHandler {
    issuer: TokenIssuer,
}

impl AccessTokenHandler {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

#[async_trait]
impl MessageHandler for AccessTokenHandler {
    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let request: AccessTokenRequest = match serde_json::from_slice(data) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Error decoding AccessTokenRequest");
                return Err(DispatchError::Discard);
            }
        };

        let response = match self.issuer.issue(&request).await {
            Ok(response) => response,
            Err(err) => {
                // Infrastructure failure: never surfaced as an OAuth2
                // error payload.
                error!(error = %err, "Error handling token request");
                return Err(DispatchError::Discard);
            }
        };

        encode_response(&response)
    }
}

/// Handles `ValidateToken` messages.
///
/// A dead token is a successful negative answer, not an error.
pub struct ValidateTokenHandler {
    tokens: Arc<dyn TokenStore>,
}

impl ValidateTokenHandler {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl MessageHandler for ValidateTokenHandler {
    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let request: ValidateToken = match serde_json::from_slice(data) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Error decoding ValidateToken");
                return Err(DispatchError::Discard);
            }
        };

        let record = match self.tokens.find_by_value(&request.access_token).await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "Error retrieving token");
                return Err(DispatchError::Discard);
            }
        };

        let result = match record {
            Some(record) => {
                match self.tokens.find_user_for_token(&record.token.access_token).await {
                    Ok(Some(user)) => ValidationResult {
                        valid: true,
                        user_id: Some(user.id),
                        email: Some(user.email),
                    },
                    Ok(None) => ValidationResult {
                        valid: false,
                        user_id: None,
                        email: None,
                    },
                    Err(err) => {
                        error!(error = %err, "Error resolving token owner");
                        return Err(DispatchError::Discard);
                    }
                }
            }
            None => ValidationResult {
                valid: false,
                user_id: None,
                email: None,
            },
        };

        encode_response(&result)
    }
}

/// Handles `RevokeToken` messages: collapses the ancestor chain of an
/// access token after authenticating the requesting client.
pub struct RevokeTokenHandler {
    clients: Arc<dyn ClientStore>,
    tokens: Arc<dyn TokenStore>,
}

impl RevokeTokenHandler {
    pub fn new(clients: Arc<dyn ClientStore>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { clients, tokens }
    }

    async fn revoke(&self, request: &RevokeToken) -> Result<RevokeResponse, DispatchError> {
        let client = match verify_client(self.clients.as_ref(), &request.client).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                warn!(client_id = %request.client.id, "Unknown client");
                return Ok(RevokeResponse {
                    success: false,
                    error: Some(ErrorResponse::new(ERROR_INVALID_CLIENT, "Client not found.")),
                });
            }
            Err(err) => {
                error!(error = %err, "Error retrieving client");
                return Err(DispatchError::Discard);
            }
        };

        let record = match self.tokens.find_by_value(&request.access_token).await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "Error retrieving token");
                return Err(DispatchError::Discard);
            }
        };

        // The token must exist and belong to the requesting client; both
        // failure shapes collapse into the same domain error.
        let mut record = match record.filter(|r| r.client_id == client.id) {
            Some(record) => record,
            None => {
                warn!(client_id = %client.id, "Invalid access token for revocation");
                return Ok(RevokeResponse {
                    success: false,
                    error: Some(ErrorResponse::new(ERROR_INVALID_GRANT, "Invalid access token")),
                });
            }
        };

        if let Err(err) = self.tokens.revoke_chain(&mut record).await {
            error!(error = %err, "Error revoking token chain");
            return Err(DispatchError::Discard);
        }
        info!(client_id = %client.id, "Revoked token chain");
        Ok(RevokeResponse {
            success: true,
            error: None,
        })
    }
}

#[async_trait]
impl MessageHandler for RevokeTokenHandler {
    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let request: RevokeToken = match serde_json::from_slice(data) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Error decoding RevokeToken");
                return Err(DispatchError::Discard);
            }
        };

        let response = self.revoke(&request).await?;
        encode_response(&response)
    }
}
