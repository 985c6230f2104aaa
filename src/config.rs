//! Centralized configuration.
//!
//! All configuration is loaded from environment variables and validated at
//! startup. Every field has a development-friendly default.

use crate::error::ServiceError;
use std::env;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the user service socket.
    pub user_service_addr: String,
    /// Bind address for the OAuth2 service socket.
    pub oauth2_service_addr: String,
    /// Postgres connection string.
    pub database_url: String,
    /// Maximum size of the storage connection pool.
    pub database_max_connections: u32,
    /// Lifetime in seconds of a password-grant access token.
    pub access_token_ttl: u64,
    /// Lifetime in seconds of a refresh-grant access token.
    pub refresh_token_ttl: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a present variable fails to parse.
    pub fn from_env() -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();

        let user_service_addr =
            env::var("USER_SERVICE_ADDR").unwrap_or_else(|_| "0.0.0.0:6001".to_string());
        let oauth2_service_addr =
            env::var("OAUTH2_SERVICE_ADDR").unwrap_or_else(|_| "0.0.0.0:6002".to_string());
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/users".to_string());
        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 5)?;
        let access_token_ttl = parse_env("ACCESS_TOKEN_TTL", 3600)?;
        let refresh_token_ttl = parse_env("REFRESH_TOKEN_TTL", 43200)?;

        Ok(Self {
            user_service_addr,
            oauth2_service_addr,
            database_url,
            database_max_connections,
            access_token_ttl,
            refresh_token_ttl,
        })
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ServiceError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| ServiceError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("USER_SERVICE_ADDR");
        env::remove_var("OAUTH2_SERVICE_ADDR");
        env::remove_var("ACCESS_TOKEN_TTL");
        env::remove_var("REFRESH_TOKEN_TTL");

        let config = Config::from_env().unwrap();

        assert_eq!(config.user_service_addr, "0.0.0.0:6001");
        assert_eq!(config.oauth2_service_addr, "0.0.0.0:6002");
        assert_eq!(config.access_token_ttl, 3600);
        assert_eq!(config.refresh_token_ttl, 43200);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        // A dedicated variable so parallel tests cannot race on it.
        env::set_var("UMS_TEST_NOT_A_NUMBER", "not-a-number");
        let result: Result<u32, _> = parse_env("UMS_TEST_NOT_A_NUMBER", 1);
        env::remove_var("UMS_TEST_NOT_A_NUMBER");
        assert!(result.is_err());
    }
}
