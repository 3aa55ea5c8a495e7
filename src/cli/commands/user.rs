use clap::Subcommand;

use crate::auth::CredentialStore;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::types::Domain;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List end-user accounts")]
    List,
}

pub async fn handle(
    cmd: UserCommands,
    credentials: &CredentialStore,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        UserCommands::List => {
            let users = credentials.list(Domain::User).await?;
            if users.is_empty() {
                return output_empty_collection(&output_format, "users", "No user accounts");
            }
            output_principals(&output_format, "users", &users)
        }
    }
}
