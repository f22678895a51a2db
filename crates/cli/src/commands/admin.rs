//! Admin management commands.
//!
//! # Usage
//!
//! ```bash
//! backroom-cli admin create -n "Ren Höek"
//! backroom-cli admin link 93EP150D35 ren
//! backroom-cli admin unlink 93EP150D35
//! ```
//!
//! Linking goes through the same link service as the HTTP API, so the
//! conflict checks and version guards apply here too.

use std::sync::Arc;

use backroom_admin::db::AccountStore;
use backroom_admin::services::{LinkLocks, LinkOutcome, LinkService};
use backroom_core::{AdminId, AdminName};

use super::CliError;

async fn link_service() -> Result<LinkService, CliError> {
    let store = super::store().await?;
    Ok(LinkService::new(Arc::new(store), Arc::new(LinkLocks::new())))
}

/// Create a new admin from a display name.
pub async fn create(name: &str) -> Result<AdminId, CliError> {
    let name = AdminName::parse(name)?;

    let store = super::store().await?;
    let admin = store.create_admin(name).await?;

    tracing::info!(
        "Admin created successfully! ID: {}, Name: {}",
        admin.id,
        admin.name
    );
    Ok(admin.id)
}

/// Link an admin to a user by username.
pub async fn link(admin_id: &str, username: &str) -> Result<(), CliError> {
    let outcome = link_service()
        .await?
        .link(&AdminId::new(admin_id), username.trim())
        .await?;

    if let LinkOutcome::Linked { admin, user } = outcome {
        tracing::info!("Linked admin {} to user {} ({})", admin.id, user.id, user.username);
    }
    Ok(())
}

/// Remove an admin's user link.
pub async fn unlink(admin_id: &str) -> Result<(), CliError> {
    let outcome = link_service()
        .await?
        .unlink(&AdminId::new(admin_id))
        .await?;

    match outcome {
        LinkOutcome::Unlinked { admin, user } => {
            tracing::info!("Unlinked admin {} from user {}", admin.id, user.id);
        }
        LinkOutcome::AlreadyUnlinked { admin } => {
            tracing::info!("Admin {} has no linked user; nothing to do", admin.id);
        }
        LinkOutcome::Linked { .. } => {}
    }
    Ok(())
}
