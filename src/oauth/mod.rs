//! OAuth2-style token issuance, validation, and chain revocation.

pub mod handler;
pub mod issuer;

pub use handler::{AccessTokenHandler, RevokeTokenHandler, ValidateTokenHandler};
pub use issuer::TokenIssuer;

/// Grant type proving authorization via resource-owner credentials.
pub const GRANT_TYPE_PASSWORD: &str = "password";
/// Grant type proving authorization via a previously issued refresh token.
pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";

/// Error code: unknown client or wrong client secret.
pub const ERROR_INVALID_CLIENT: &str = "invalid_client";
/// Error code: bad owner credentials or invalid refresh token.
pub const ERROR_INVALID_GRANT: &str = "invalid_grant";
/// Error code: a required request parameter is missing.
pub const ERROR_INVALID_REQUEST: &str = "invalid_request";
/// Error code: the requested grant type is not supported.
pub const ERROR_UNSUPPORTED_GRANT_TYPE: &str = "unsupported_grant_type";
