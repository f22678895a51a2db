//! Record storage for admins and users.
//!
//! # Backends
//!
//! - [`PgAccountStore`] - `PostgreSQL`, the production store
//! - [`InMemoryAccountStore`] - process-local maps for tests and local runs
//!
//! Both implement [`AccountStore`]. No atomicity is promised across the admin
//! and user tables; every update is a single-record, version-guarded write.
//!
//! # Tables (`PostgreSQL`)
//!
//! - `backroom.admin` - Admin records, JSONB `name`/`permissions`/`admin_groups`/`linked_user`
//! - `backroom.account` - User records, JSONB `roles`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p backroom-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::{InMemoryAccountStore, StoreOp};
pub use postgres::PgAccountStore;
pub use store::{AccountStore, ListParams, Page, StoreFuture};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The record to update does not exist.
    #[error("not found")]
    NotFound,

    /// The record changed since it was read.
    #[error("version conflict: expected version {expected}")]
    VersionConflict {
        /// Version the write was guarded on.
        expected: i64,
    },

    /// Constraint violation (e.g., duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
