//! User registration and authentication.

pub mod auth;
pub mod handler;
pub mod validation;

pub use auth::find_by_email_and_password;
pub use handler::{AuthenticateUserHandler, RegisterUserHandler};
