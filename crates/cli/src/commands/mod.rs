//! CLI command implementations.
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

pub mod admin;
pub mod migrate;
pub mod user;

use backroom_admin::db::{self, PgAccountStore, StoreError};
use backroom_admin::services::LinkError;
use backroom_core::NameError;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Link or unlink failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Invalid admin name.
    #[error("Invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("ADMIN_DATABASE_URL"))
}

/// Connect to the admin database.
pub async fn connect() -> Result<PgPool, CliError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to admin database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Connect and wrap the pool in an account store.
pub async fn store() -> Result<PgAccountStore, CliError> {
    Ok(PgAccountStore::new(connect().await?))
}
