//! Cryptographically random opaque string generation.
//!
//! Used for access-token values, refresh-token values, session identifiers,
//! and per-user password salts.

use crate::error::ServiceError;
use rand::rngs::OsRng;
use rand::RngCore;

/// Generator backed by the operating system entropy source.
///
/// Every call draws fresh entropy; instances carry no state, so two
/// generators never produce correlated output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenGenerator;

impl TokenGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Produce `n` cryptographically random bytes.
    ///
    /// # Errors
    ///
    /// Fails with [`ServiceError::Entropy`] when the entropy source is
    /// unavailable; output is never silently degraded.
    pub fn generate(&self, n: usize) -> Result<Vec<u8>, ServiceError> {
        let mut token = vec![0u8; n];
        OsRng
            .try_fill_bytes(&mut token)
            .map_err(|e| ServiceError::Entropy(e.to_string()))?;
        Ok(token)
    }

    /// Produce a `2n`-character hex string encoding `n` random bytes.
    pub fn generate_hex(&self, n: usize) -> Result<String, ServiceError> {
        Ok(hex::encode(self.generate(n)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_requested_length() {
        let generator = TokenGenerator::new();
        assert_eq!(generator.generate(32).unwrap().len(), 32);
        assert_eq!(generator.generate_hex(32).unwrap().len(), 64);
    }

    #[test]
    fn test_generate_unique_output() {
        let generator = TokenGenerator::new();
        for _ in 0..64 {
            let a = generator.generate(32).unwrap();
            let b = generator.generate(32).unwrap();
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_separate_instances_not_correlated() {
        let a = TokenGenerator::new().generate_hex(32).unwrap();
        let b = TokenGenerator::new().generate_hex(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_output_is_lowercase_hex() {
        let token = TokenGenerator::new().generate_hex(16).unwrap();
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
