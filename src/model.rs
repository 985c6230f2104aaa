//! Domain records shared by the wire messages and the storage layer.

use serde::{Deserialize, Serialize};

/// Token type issued by every grant.
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// A registered end user.
///
/// After storage, `password` holds the hex-encoded derived hash; the
/// plaintext only ever appears inside inbound request payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity assigned by the store on creation.
    pub id: i64,
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// A registered client application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub secret: String,
}

/// An issued access token together with its paired refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds from issuance until the token expires for direct lookup.
    pub expires_in: u64,
    pub refresh_token: String,
    /// Access-token value of the token this one was refreshed from.
    /// Lookup-only lineage reference, never used to issue new tokens.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_token: Option<String>,
}

impl AccessToken {
    /// Build a bearer token pair, optionally linked to a parent.
    pub fn bearer(
        access_token: String,
        refresh_token: String,
        expires_in: u64,
        parent_token: Option<String>,
    ) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in,
            refresh_token,
            parent_token,
        }
    }
}

/// Fields required to persist a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
    /// Hex-encoded derived password hash.
    pub password_hash: String,
    /// Hex-encoded per-user salt.
    pub salt: String,
}

/// A stored user together with its salt.
///
/// The salt never leaves the storage/verification path.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub salt: String,
}

/// Storage-layer view of a token row: the token plus its owners.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub token: AccessToken,
    pub client_id: String,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_parent_is_omitted_from_wire() {
        let token = AccessToken::bearer("a".into(), "r".into(), 3600, None);
        let json = serde_json::to_value(&token).unwrap();
        assert!(json.get("parent_token").is_none());

        let linked = AccessToken::bearer("b".into(), "r2".into(), 3600, Some("a".into()));
        let json = serde_json::to_value(&linked).unwrap();
        assert_eq!(json["parent_token"], "a");
    }

    #[test]
    fn test_parent_round_trips() {
        let token = AccessToken::bearer("b".into(), "r".into(), 60, Some("a".into()));
        let bytes = serde_json::to_vec(&token).unwrap();
        let decoded: AccessToken = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, token);
    }
}
