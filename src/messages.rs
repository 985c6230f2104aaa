//! Wire message contracts.
//!
//! Every request and response crossing a service socket is one of these
//! shapes, serialized as JSON. Optional fields are omitted when absent so
//! that present and absent are always distinguishable on the wire.

use crate::model::{AccessToken, Client};
use serde::{Deserialize, Serialize};

/// Message-type identifier carried as byte 0 of every request frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// User service: register a new user.
    RegisterUser = 1,
    /// User service: authenticate a user for session establishment.
    AuthenticateUser = 2,
    /// OAuth2 service: request an access token under some grant type.
    AccessTokenRequest = 3,
    /// OAuth2 service: check an access token and resolve its owner.
    ValidateToken = 4,
    /// OAuth2 service: collapse a token's ancestor chain.
    RevokeToken = 5,
}

/// Registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// A single field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputError {
    /// Stable field key: `display_name`, `email` or `password`.
    pub field: String,
    pub message: String,
}

impl InputError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Registration outcome. `errors` lists every violated field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<InputError>,
}

/// Authentication request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateUser {
    pub email: String,
    pub password: String,
}

/// Authentication outcome. The session id is withheld on any failure;
/// unknown email and wrong password are not distinguishable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateResult {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<String>,
}

/// Access token request: client credentials plus grant-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenRequest {
    pub client: Client,
    pub grant_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub refresh_token: Option<String>,
}

/// OAuth2-style error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    pub error_description: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_description: description.into(),
        }
    }
}

/// Access token response. Exactly one of `token` and `error` is present;
/// `success` is derived from the absence of `error`, never set on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<AccessToken>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorResponse>,
}

impl AccessTokenResponse {
    /// Successful issuance.
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            success: true,
            token: Some(token),
            error: None,
        }
    }

    /// Domain failure.
    pub fn with_error(error: ErrorResponse) -> Self {
        Self {
            success: false,
            token: None,
            error: Some(error),
        }
    }
}

/// Token validation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateToken {
    pub access_token: String,
}

/// Token validation outcome. User fields are set only when valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
}

/// Chain revocation request, authenticated with client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeToken {
    pub client: Client,
    pub access_token: String,
}

/// Chain revocation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorResponse>,
}
