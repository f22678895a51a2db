//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! backroom-cli migrate
//! ```
//!
//! Migrations live in `crates/admin/migrations/` and are embedded at build time.

use super::CliError;

/// Run the admin database migrations.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running admin migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Admin migrations complete!");
    Ok(())
}
