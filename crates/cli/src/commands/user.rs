//! User management commands.

use backroom_admin::db::AccountStore;
use backroom_core::UserId;

use super::CliError;

/// Create a new user with no roles.
pub async fn create(username: &str) -> Result<UserId, CliError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CliError::InvalidArgument(
            "username cannot be empty".to_owned(),
        ));
    }

    let store = super::store().await?;
    let user = store.create_user(username.to_owned()).await?;

    tracing::info!("User created successfully! ID: {}, Username: {}", user.id, user.username);
    Ok(user.id)
}
