//! User management service library.
//!
//! Provides OAuth2-style access token issuance (password and refresh-token
//! grants), token-chain revocation, user registration and authentication,
//! all exposed over a message-oriented reply-socket RPC layer.

#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod messages;
pub mod model;
pub mod oauth;
pub mod rpc;
pub mod storage;
pub mod user;

// Re-exports for convenience
pub use config::Config;
pub use error::ServiceError;
