//! Registration field validation.
//!
//! Validation is exhaustive: every field is checked and all violations are
//! reported together. Lengths are counted in code points, not bytes.

use crate::messages::{InputError, RegisterUser};

const DISPLAY_NAME_MIN: usize = 3;
const DISPLAY_NAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 1024;

/// Validate a registration request, returning every violated field.
pub fn validate_registration(request: &RegisterUser) -> Vec<InputError> {
    let mut errors = Vec::new();
    if let Some(error) = validate_display_name(&request.display_name) {
        errors.push(error);
    }
    if let Some(error) = validate_email(&request.email) {
        errors.push(error);
    }
    if let Some(error) = validate_password(&request.password) {
        errors.push(error);
    }
    errors
}

fn validate_display_name(display_name: &str) -> Option<InputError> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Some(InputError::new("display_name", "Display Name must not be empty."));
    }
    let length = code_points(display_name);
    if !(DISPLAY_NAME_MIN..=DISPLAY_NAME_MAX).contains(&length) {
        return Some(InputError::new(
            "display_name",
            "Display Name length must be between 3 and 20 characters.",
        ));
    }
    None
}

fn validate_email(email: &str) -> Option<InputError> {
    let email = email.trim();
    if email.is_empty() {
        return Some(InputError::new("email", "Email must not be empty."));
    }
    if !email.contains('@') {
        return Some(InputError::new("email", "Email must contain an at sign (@)."));
    }
    None
}

fn validate_password(password: &str) -> Option<InputError> {
    if password.is_empty() {
        return Some(InputError::new("password", "Password must not be empty."));
    }
    let length = code_points(password);
    if length < PASSWORD_MIN {
        return Some(InputError::new(
            "password",
            "Password must be at least 6 characters long.",
        ));
    }
    if length > PASSWORD_MAX {
        return Some(InputError::new(
            "password",
            "Password length must not exceed 1024 characters.",
        ));
    }
    None
}

fn code_points(s: &str) -> usize {
    s.chars().count()
}
