//! Constant-time byte comparison.

use subtle::ConstantTimeEq;

/// Compare two byte slices in constant time.
///
/// A length mismatch short-circuits to `false`; equal-length inputs are
/// compared in time independent of where they first differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_slices() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_unequal_slices() {
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"aecret", b"secret"));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(!constant_time_eq(b"secret", b"secret1"));
        assert!(!constant_time_eq(b"secret", b""));
    }
}
