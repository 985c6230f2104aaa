//! Property-based tests for registration validation and the credential
//! verifier primitives.

use proptest::prelude::*;
use user_management_service::crypto::{
    PasswordHasher, Pbkdf2PasswordHasher, TokenGenerator, HASH_OUTPUT_LEN,
};
use user_management_service::messages::RegisterUser;
use user_management_service::user::validation::validate_registration;

fn arb_display_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{2,19}".prop_map(|s| s.trim().to_string())
        .prop_filter("trimming must keep length in range", |s| {
            let n = s.chars().count();
            (3..=20).contains(&n)
        })
}

fn arb_email() -> impl Strategy<Value = String> {
    "[a-z]{1,12}@[a-z]{1,12}\\.[a-z]{2,4}"
}

fn arb_password() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!#%&]{6,64}"
}

proptest! {
    /// Any triple meeting the field rules registers without errors.
    #[test]
    fn prop_valid_registrations_accepted(
        display_name in arb_display_name(),
        email in arb_email(),
        password in arb_password(),
    ) {
        let errors = validate_registration(&RegisterUser {
            display_name,
            email,
            password,
        });
        prop_assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    /// A display name outside the 3..=20 code-point range is reported
    /// against exactly the display_name field.
    #[test]
    fn prop_bad_display_name_reported(
        display_name in "[a-zA-Z]{21,40}",
        email in arb_email(),
        password in arb_password(),
    ) {
        let errors = validate_registration(&RegisterUser {
            display_name,
            email,
            password,
        });
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        prop_assert_eq!(fields, vec!["display_name"]);
    }

    /// Violations accumulate: a bad email never masks a bad password.
    #[test]
    fn prop_violations_accumulate(
        display_name in arb_display_name(),
        email in "[a-z]{1,20}",
        password in "[a-z]{1,5}",
    ) {
        let errors = validate_registration(&RegisterUser {
            display_name,
            email,
            password,
        });
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        prop_assert_eq!(fields, vec!["email", "password"]);
    }

}

proptest! {
    // Key derivation is deliberately slow; keep the case count modest.
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Hashing is deterministic across verifier instances and sensitive
    /// to both inputs.
    #[test]
    fn prop_hashing_deterministic_and_input_sensitive(
        password in "[ -~]{1,64}",
        other in "[ -~]{1,64}",
        salt in "[0-9a-f]{16,120}",
    ) {
        let first = Pbkdf2PasswordHasher::new().hash(&password, &salt);
        let second = Pbkdf2PasswordHasher::new().hash(&password, &salt);
        prop_assert_eq!(first, second);
        prop_assert_eq!(
            Pbkdf2PasswordHasher::new().hash_hex(&password, &salt).len(),
            2 * HASH_OUTPUT_LEN
        );

        if password != other {
            prop_assert_ne!(
                Pbkdf2PasswordHasher::new().hash(&other, &salt),
                first
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Two independent generator calls never collide.
    #[test]
    fn prop_generated_tokens_unique(len in 16usize..64) {
        let generator = TokenGenerator::new();
        let a = generator.generate(len).unwrap();
        let b = generator.generate(len).unwrap();
        prop_assert_eq!(a.len(), len);
        prop_assert_ne!(a, b);
    }
}
