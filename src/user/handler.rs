//! Message handlers for the user service socket.

use crate::crypto::{PasswordHasher, TokenGenerator};
use crate::error::ServiceError;
use crate::messages::{
    AuthenticateResult, AuthenticateUser, RegisterResponse, RegisterUser,
};
use crate::model::NewUser;
use crate::rpc::{encode_response, DispatchError, MessageHandler};
use crate::storage::UserStore;
use crate::user::auth::find_by_email_and_password;
use crate::user::validation::validate_registration;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

const SALT_LENGTH: usize = 60;
const SESSION_ID_LENGTH: usize = 64;

/// Handles `RegisterUser` messages.
pub struct RegisterUserHandler {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    generator: TokenGenerator,
}

impl RegisterUserHandler {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        generator: TokenGenerator,
    ) -> Self {
        Self {
            users,
            hasher,
            generator,
        }
    }
}

#[async_trait]
impl MessageHandler for RegisterUserHandler {
    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let request: RegisterUser = match serde_json::from_slice(data) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Error decoding RegisterUser");
                return Err(DispatchError::Discard);
            }
        };

        let errors = validate_registration(&request);
        let response = if errors.is_empty() {
            let salt = match self.generator.generate_hex(SALT_LENGTH) {
                Ok(salt) => salt,
                Err(err) => {
                    error!(error = %err, "Error generating salt");
                    return Err(DispatchError::Discard);
                }
            };
            let user = NewUser {
                password_hash: self.hasher.hash_hex(&request.password, &salt),
                display_name: request.display_name,
                email: request.email,
                salt,
            };
            match self.users.create(&user).await {
                Ok(id) => {
                    info!(user_id = id, "Registered user");
                    RegisterResponse {
                        valid: true,
                        errors: Vec::new(),
                    }
                }
                Err(err) => {
                    error!(error = %err, "Error inserting user");
                    return Err(DispatchError::Discard);
                }
            }
        } else {
            RegisterResponse {
                valid: false,
                errors,
            }
        };

        encode_response(&response)
    }
}

/// Handles `AuthenticateUser` messages.
///
/// An unknown email and a wrong password produce identical responses (no
/// session id) so callers cannot enumerate registered addresses.
pub struct AuthenticateUserHandler {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    generator: TokenGenerator,
}

impl AuthenticateUserHandler {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        generator: TokenGenerator,
    ) -> Self {
        Self {
            users,
            hasher,
            generator,
        }
    }
}

#[async_trait]
impl MessageHandler for AuthenticateUserHandler {
    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let request: AuthenticateUser = match serde_json::from_slice(data) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Error decoding AuthenticateUser");
                return Err(DispatchError::Discard);
            }
        };

        let session_id = match find_by_email_and_password(
            self.users.as_ref(),
            self.hasher.as_ref(),
            &request.email,
            &request.password,
        )
        .await
        {
            Ok(user) => {
                info!(user_id = user.id, "Authenticated user");
                match self.generator.generate_hex(SESSION_ID_LENGTH) {
                    Ok(session_id) => Some(session_id),
                    Err(err) => {
                        error!(error = %err, "Error generating session id");
                        return Err(DispatchError::Discard);
                    }
                }
            }
            Err(ServiceError::NotFound) => {
                info!(email = %request.email, "User not found");
                None
            }
            Err(ServiceError::CredentialsMismatch) => {
                info!(email = %request.email, "Wrong password");
                None
            }
            Err(err) => {
                error!(error = %err, "Error retrieving user");
                return Err(DispatchError::Discard);
            }
        };

        encode_response(&AuthenticateResult { session_id })
    }
}
