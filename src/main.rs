use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use user_management_service::config::Config;
use user_management_service::crypto::{Pbkdf2PasswordHasher, TokenGenerator};
use user_management_service::messages::MessageType;
use user_management_service::oauth::{
    AccessTokenHandler, RevokeTokenHandler, TokenIssuer, ValidateTokenHandler,
};
use user_management_service::rpc::RepServer;
use user_management_service::storage::PostgresStorage;
use user_management_service::user::{AuthenticateUserHandler, RegisterUserHandler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting user management service");

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let storage = Arc::new(PostgresStorage::new(pool));
    let generator = TokenGenerator::new();
    let hasher = Arc::new(Pbkdf2PasswordHasher::new());

    let mut user_service = RepServer::bind(&config.user_service_addr).await?;
    user_service.add_handler(
        MessageType::RegisterUser,
        Arc::new(RegisterUserHandler::new(
            storage.clone(),
            hasher.clone(),
            generator,
        )),
    );
    user_service.add_handler(
        MessageType::AuthenticateUser,
        Arc::new(AuthenticateUserHandler::new(
            storage.clone(),
            hasher.clone(),
            generator,
        )),
    );

    let issuer = TokenIssuer::new(
        storage.clone(),
        storage.clone(),
        storage.clone(),
        generator,
        hasher,
        config.access_token_ttl,
        config.refresh_token_ttl,
    );
    let mut oauth2_service = RepServer::bind(&config.oauth2_service_addr).await?;
    oauth2_service.add_handler(
        MessageType::AccessTokenRequest,
        Arc::new(AccessTokenHandler::new(issuer)),
    );
    oauth2_service.add_handler(
        MessageType::ValidateToken,
        Arc::new(ValidateTokenHandler::new(storage.clone())),
    );
    oauth2_service.add_handler(
        MessageType::RevokeToken,
        Arc::new(RevokeTokenHandler::new(storage.clone(), storage)),
    );

    info!(
        user_service = %config.user_service_addr,
        oauth2_service = %config.oauth2_service_addr,
        "Listening"
    );

    // The two services run as independent loops; a fatal dispatch error in
    // either tears the process down.
    let user_task = tokio::spawn(user_service.serve());
    let oauth2_task = tokio::spawn(oauth2_service.serve());
    tokio::select! {
        result = user_task => result??,
        result = oauth2_task => result??,
    }
    Ok(())
}
