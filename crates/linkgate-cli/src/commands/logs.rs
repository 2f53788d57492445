//! Access log commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;
use linkgate_entity::audit::AccessLogEntry;

/// Arguments for log commands
#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Logs subcommand
    #[command(subcommand)]
    pub command: LogsCommand,
}

/// Log subcommands
#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// List entries of a resource, newest first
    List {
        /// Resource id
        resource_id: String,
        /// Page size
        #[arg(short, long)]
        limit: Option<u32>,
        /// Token from a previous page
        #[arg(long)]
        page_token: Option<String>,
    },
    /// Export entries of a resource between two dates to a JSON file
    Export {
        /// Resource id
        resource_id: String,
        /// Start (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// End (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Output file path
        #[arg(short, long, default_value = "access_log_export.json")]
        output: String,
    },
    /// Delete entries past their retention
    Purge,
}

/// Log display row
#[derive(Debug, Serialize, Tabled)]
struct LogRow {
    /// Time
    time: String,
    /// Action
    action: String,
    /// Requester
    requester: String,
    /// Masked address
    ip: String,
    /// Outcome recorded with the entry
    outcome: String,
}

impl From<&AccessLogEntry> for LogRow {
    fn from(entry: &AccessLogEntry) -> Self {
        Self {
            time: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            action: entry.action.to_string(),
            requester: entry.requester_id.clone(),
            ip: entry.ip_address.clone(),
            outcome: entry
                .metadata
                .get("reasonCode")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
        }
    }
}

/// Execute log commands
pub async fn execute(
    args: &LogsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::connect(config).await?;

    match &args.command {
        LogsCommand::List {
            resource_id,
            limit,
            page_token,
        } => {
            let page = services
                .audit
                .list(resource_id, *limit, page_token.as_deref())
                .await?;

            match format {
                OutputFormat::Json => output::print_json(&page),
                OutputFormat::Table => {
                    let rows: Vec<LogRow> = page.entries.iter().map(LogRow::from).collect();
                    output::print_list(&rows, format);
                    if let Some(token) = &page.next_page_token {
                        output::print_kv("Next page", token);
                    }
                }
            }
        }
        LogsCommand::Export {
            resource_id,
            start,
            end,
            output: out_path,
        } => {
            let entries = services
                .audit
                .export(resource_id, start.as_deref(), end.as_deref())
                .await?;

            let json = serde_json::to_string_pretty(&entries)
                .map_err(|e| AppError::internal(format!("Serialization error: {}", e)))?;
            tokio::fs::write(out_path, json)
                .await
                .map_err(|e| AppError::internal(format!("Failed to write file: {}", e)))?;

            output::print_success(&format!(
                "Exported {} access log entries to '{}'",
                entries.len(),
                out_path
            ));
        }
        LogsCommand::Purge => {
            let removed = services.audit.purge_expired().await?;
            output::print_success(&format!("Removed {} expired entries.", removed));
        }
    }

    Ok(())
}
