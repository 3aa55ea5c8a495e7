use clap::Subcommand;
use serde_json::json;

use crate::auth::CredentialStore;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::types::Domain;

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create an admin account")]
    Create {
        #[arg(help = "Admin username")]
        username: String,

        #[arg(long, env = "LEDGER_ADMIN_PASSWORD", hide_env_values = true, help = "Admin password")]
        password: String,
    },

    #[command(about = "List admin accounts")]
    List,

    #[command(about = "Set a new password for an admin")]
    Passwd {
        #[arg(help = "Admin username")]
        username: String,

        #[arg(long, env = "LEDGER_ADMIN_PASSWORD", hide_env_values = true, help = "New password")]
        password: String,
    },

    #[command(about = "Delete an admin account")]
    Delete {
        #[arg(help = "Admin username")]
        username: String,
    },
}

pub async fn handle(
    cmd: AdminCommands,
    credentials: &CredentialStore,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Create { username, password } => {
            let admin = credentials.create(Domain::Admin, &username, &password).await?;
            output_success(
                &output_format,
                &format!("Admin '{}' created", admin.username),
                Some(json!({ "id": admin.id, "username": admin.username })),
            )
        }
        AdminCommands::List => {
            let admins = credentials.list(Domain::Admin).await?;
            if admins.is_empty() {
                return output_empty_collection(&output_format, "admins", "No admin accounts");
            }
            output_principals(&output_format, "admins", &admins)
        }
        AdminCommands::Passwd { username, password } => {
            let admin = require_admin(credentials, &username).await?;
            credentials
                .update(Domain::Admin, admin.id, None, Some(&password))
                .await?;
            output_success(&output_format, &format!("Password updated for '{}'", admin.username), None)
        }
        AdminCommands::Delete { username } => {
            let admin = require_admin(credentials, &username).await?;
            credentials.delete(Domain::Admin, admin.id).await?;
            output_success(
                &output_format,
                &format!("Admin '{}' deleted", admin.username),
                Some(json!({ "id": admin.id })),
            )
        }
    }
}

async fn require_admin(
    credentials: &CredentialStore,
    username: &str,
) -> anyhow::Result<crate::database::models::Principal> {
    credentials
        .find_by_username(Domain::Admin, username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Admin '{}' not found", username))
}
