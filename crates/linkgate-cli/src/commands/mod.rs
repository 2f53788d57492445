//! CLI command definitions and dispatch.

pub mod attempts;
pub mod hash;
pub mod ip;
pub mod logs;
pub mod migrate;
pub mod share;
pub mod verify;

use clap::{Parser, Subcommand};
use dialoguer::Password;

use crate::output::OutputFormat;
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;
use linkgate_service::AppServices;

/// LinkGate: password, IP, and lockout protection for share links
#[derive(Debug, Parser)]
#[command(name = "linkgate", version, about, long_about = None)]
pub struct Cli {
    /// Extra configuration file merged over `config/default.toml`
    #[arg(short, long)]
    pub config: Option<String>,

    /// Environment overlay to load from `config/{env}.toml`
    #[arg(long, env = "LINKGATE_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Share creation and protection changes
    Share(share::ShareArgs),
    /// Check a password and requester address against a share
    Verify(verify::VerifyArgs),
    /// IP allow-list management
    Ip(ip::IpArgs),
    /// Failed-attempt records and lockouts
    Attempts(attempts::AttemptsArgs),
    /// Access log listing and export
    Logs(logs::LogsArgs),
    /// Produce a protection record for a password
    Hash(hash::HashArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Share(args) => share::execute(args, config, self.format).await,
            Commands::Verify(args) => verify::execute(args, config, self.format).await,
            Commands::Ip(args) => ip::execute(args, config, self.format).await,
            Commands::Attempts(args) => attempts::execute(args, config, self.format).await,
            Commands::Logs(args) => logs::execute(args, config, self.format).await,
            Commands::Hash(args) => hash::execute(args, config, self.format).await,
        }
    }
}

/// Helper: connect the configured stores and build the services
pub async fn connect(config: &AppConfig) -> Result<AppServices, AppError> {
    AppServices::from_config(config).await
}

/// Helper: read a password from the terminal without echo
pub fn prompt_password(prompt: &str, confirm: bool) -> Result<String, AppError> {
    let mut input = Password::new().with_prompt(prompt).allow_empty_password(true);
    if confirm {
        input = input.with_confirmation("Repeat password", "Passwords do not match");
    }
    input
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {}", e)))
}
