//! Salted password hashing.

use ring::pbkdf2;
use std::num::NonZeroU32;

/// Length in bytes of every derived hash.
pub const HASH_OUTPUT_LEN: usize = 64;

const PBKDF2_ROUNDS: NonZeroU32 = match NonZeroU32::new(4096) {
    Some(n) => n,
    None => unreachable!(),
};

/// Pluggable hashing primitive for password storage and verification.
pub trait PasswordHasher: Send + Sync {
    /// Derive a fixed-length hash from a password and per-user salt.
    fn hash(&self, password: &str, salt: &str) -> [u8; HASH_OUTPUT_LEN];

    /// Hex-encoded form of [`PasswordHasher::hash`], as stored.
    fn hash_hex(&self, password: &str, salt: &str) -> String {
        hex::encode(self.hash(password, salt))
    }
}

/// PBKDF2-HMAC-SHA256 with 4096 rounds and a 64-byte output.
///
/// Deliberately slow so that brute-forcing a leaked hash is expensive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2PasswordHasher;

impl Pbkdf2PasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Pbkdf2PasswordHasher {
    fn hash(&self, password: &str, salt: &str) -> [u8; HASH_OUTPUT_LEN] {
        let mut out = [0u8; HASH_OUTPUT_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            PBKDF2_ROUNDS,
            salt.as_bytes(),
            password.as_bytes(),
            &mut out,
        );
        out
    }
}
