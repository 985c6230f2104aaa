//! Cryptographic primitives: token generation, password hashing, and
//! constant-time comparison.

pub mod compare;
pub mod generator;
pub mod hasher;

pub use compare::constant_time_eq;
pub use generator::TokenGenerator;
pub use hasher::{PasswordHasher, Pbkdf2PasswordHasher, HASH_OUTPUT_LEN};
