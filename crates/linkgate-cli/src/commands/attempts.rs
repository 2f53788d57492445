//! Failed-attempt and lockout commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;

/// Arguments for attempt commands
#[derive(Debug, Args)]
pub struct AttemptsArgs {
    /// Attempts subcommand
    #[command(subcommand)]
    pub command: AttemptsCommand,
}

/// Attempt subcommands
#[derive(Debug, Subcommand)]
pub enum AttemptsCommand {
    /// Show the failure record of a requester on a resource
    Show {
        /// Resource id
        resource_id: String,
        /// Requester address
        requester_ip: String,
    },
    /// Clear the failure record, lifting any lock
    Reset {
        /// Resource id
        resource_id: String,
        /// Requester address
        requester_ip: String,
    },
}

/// Execute attempt commands
pub async fn execute(
    args: &AttemptsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::connect(config).await?;
    let tracker = &services.tracker;

    match &args.command {
        AttemptsCommand::Show {
            resource_id,
            requester_ip,
        } => match tracker.find(resource_id, requester_ip).await? {
            Some(record) => {
                let locked = tracker.is_locked(&record);
                output::print_record(
                    &record,
                    &[
                        ("Failures", record.attempt_count.to_string()),
                        (
                            "Remaining",
                            tracker.remaining_attempts(Some(&record)).to_string(),
                        ),
                        ("First failure", record.first_attempt.to_rfc3339()),
                        ("Last failure", record.last_attempt.to_rfc3339()),
                        ("Locked", locked.to_string()),
                        (
                            "Lock expires",
                            output::or_dash(record.lock_expiry.map(|t| t.to_rfc3339())),
                        ),
                    ],
                    format,
                );
            }
            None => output::print_success(&format!(
                "No failures recorded; {} attempts available.",
                tracker.threshold()
            )),
        },
        AttemptsCommand::Reset {
            resource_id,
            requester_ip,
        } => {
            tracker.reset(resource_id, requester_ip).await;
            output::print_success(&format!(
                "Cleared attempts of {} on '{}'.",
                requester_ip, resource_id
            ));
        }
    }

    Ok(())
}
