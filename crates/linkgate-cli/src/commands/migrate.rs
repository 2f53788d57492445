//! Database migration management commands.

use clap::{Args, Subcommand};

use crate::output;
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;
use linkgate_database::DatabasePool;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Check that the database is reachable
    Ping,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    if config.database.backend != "postgres" {
        output::print_warning(&format!(
            "Database backend is '{}'; nothing to migrate.",
            config.database.backend
        ));
        return Ok(());
    }

    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            linkgate_database::migration::run_migrations(pool.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Ping => {
            if pool.health_check().await? {
                output::print_success("Database is reachable.");
            } else {
                return Err(AppError::service_unavailable("Database did not answer"));
            }
        }
    }

    Ok(())
}
