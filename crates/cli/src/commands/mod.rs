//! Command implementations.

pub mod admin;
pub mod invite;
pub mod migrate;
pub mod reindex;
pub mod stats;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use ramen_map_server::db::RepositoryError;
use ramen_map_server::services::ProfileError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Profile update failed.
    #[error("{0}")]
    Profile(#[from] ProfileError),

    /// Invalid argument.
    #[error("{0}")]
    InvalidInput(String),
}

/// Read the database URL from the environment (after loading `.env`).
///
/// # Errors
///
/// Returns `CliError::MissingEnvVar` if neither variable is set.
pub fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("RAMEN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("RAMEN_DATABASE_URL"))
}

/// Connect to the database.
///
/// # Errors
///
/// Returns `CliError` if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, CliError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(ramen_map_server::db::create_pool(&url).await?)
}
