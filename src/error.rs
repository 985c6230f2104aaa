//! Service-wide error type.
//!
//! Lower layers (stores, verifier, generator) return these typed failures;
//! the handlers decide per category whether to translate them into a domain
//! error payload or abort the request without a reply.

use thiserror::Error;

/// Error type shared by all service components.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The requested row does not exist (or is expired, for gated lookups).
    #[error("not found")]
    NotFound,

    /// A presented credential did not match the stored one. Externally
    /// indistinguishable from `NotFound`; kept separate for logging.
    #[error("credentials mismatch")]
    CredentialsMismatch,

    /// The entropy source refused to produce random bytes.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// Storage engine failure, including constraint violations.
    #[error("storage error: {0}")]
    Storage(String),

    /// Payload encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Socket-level failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invariant violation that has no better category.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Build a configuration error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a storage error from any displayable message.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Storage(other.to_string()),
        }
    }
}
