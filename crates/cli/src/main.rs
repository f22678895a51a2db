//! Backroom CLI - Database migrations and record management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! backroom-cli migrate
//!
//! # Create an admin
//! backroom-cli admin create -n "Ren Höek"
//!
//! # Create a user
//! backroom-cli user create -u ren
//!
//! # Link an admin to a user, and undo it
//! backroom-cli admin link 93EP150D35 ren
//! backroom-cli admin unlink 93EP150D35
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create|link|unlink` - Manage admins and their user links
//! - `user create` - Create users

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "backroom-cli")]
#[command(author, version, about = "Backroom CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin
    Create {
        /// Admin display name, e.g. "Stimpson J Cat"
        #[arg(short, long)]
        name: String,
    },
    /// Link an admin to a user
    Link {
        /// Admin id
        admin_id: String,
        /// Username of the user to link
        username: String,
    },
    /// Remove an admin's user link
    Unlink {
        /// Admin id
        admin_id: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Unique username
        #[arg(short, long)]
        username: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create { name } => {
                commands::admin::create(&name).await?;
            }
            AdminAction::Link { admin_id, username } => {
                commands::admin::link(&admin_id, &username).await?;
            }
            AdminAction::Unlink { admin_id } => {
                commands::admin::unlink(&admin_id).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Create { username } => {
                commands::user::create(&username).await?;
            }
        },
    }
    Ok(())
}
