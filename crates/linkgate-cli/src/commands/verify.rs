//! Access verification from the command line.

use clap::Args;

use crate::output::{self, OutputFormat};
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;

/// Arguments for the verify command
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Resource id
    pub resource_id: String,
    /// Requester address the check is made for
    #[arg(long)]
    pub ip: String,
    /// Send no password at all instead of prompting
    #[arg(long)]
    pub no_password: bool,
}

/// Execute the verify command
pub async fn execute(
    args: &VerifyArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::connect(config).await?;

    let password = if args.no_password {
        None
    } else {
        Some(super::prompt_password("Share password", false)?)
    };

    let result = services
        .evaluator
        .verify_access(&args.resource_id, password.as_deref(), &args.ip)
        .await?;
    services.evaluator.drain_upgrades().await;

    let mut pairs = vec![
        ("Decision", result.reason_code.to_string()),
        ("HTTP status", result.http_status().to_string()),
        ("Message", result.message.clone()),
    ];
    if let Some(remaining) = result.remaining_attempts {
        pairs.push(("Remaining attempts", remaining.to_string()));
    }
    if let Some(expiry) = result.lock_expiry {
        pairs.push(("Locked until", expiry.to_rfc3339()));
    }
    if let Some(summary) = &result.resource_summary {
        pairs.push(("Link expires", summary.expiration_date.to_rfc3339()));
    }
    output::print_record(&result, &pairs, format);

    Ok(())
}
