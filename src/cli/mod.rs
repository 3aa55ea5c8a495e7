pub mod commands;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::auth::CredentialStore;
use crate::config;
use crate::database::{DatabaseManager, PgStore};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Ledger CLI - account administration for the Ledger API database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "DATABASE_URL", help = "Postgres connection string")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Admin account management")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    #[command(about = "End-user account inspection")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let credentials = connect(cli.database_url.as_deref()).await?;

    match cli.command {
        Commands::Admin { cmd } => commands::admin::handle(cmd, &credentials, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, &credentials, output_format).await,
    }
}

/// Credential store over the configured database; the CLI never uses the in-memory store
async fn connect(url: Option<&str>) -> anyhow::Result<CredentialStore> {
    let config = config::config();
    let mut database = config.database.clone();
    if let Some(url) = url {
        database.url = Some(url.to_string());
    }

    let pool = DatabaseManager::connect(&database)
        .await
        .context("could not open the ledger database (set DATABASE_URL or --database-url)")?;
    Ok(CredentialStore::new(Arc::new(PgStore::new(pool)), config.security.bcrypt_cost))
}
