//! IP allow-list commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use linkgate_auth::ip::{IpMatcher, IpRule};
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;
use linkgate_service::access::IpRestrictionUpdate;

/// Arguments for IP allow-list commands
#[derive(Debug, Args)]
pub struct IpArgs {
    /// IP subcommand
    #[command(subcommand)]
    pub command: IpCommand,
}

/// IP subcommands
#[derive(Debug, Subcommand)]
pub enum IpCommand {
    /// Replace the allow-list of a permission
    Set {
        /// Permission id
        permission_id: String,
        /// Allowed address, CIDR block, or IPv4 wildcard (repeatable)
        #[arg(long = "rule")]
        rules: Vec<String>,
        /// Store the rules but leave the allow-list switched off
        #[arg(long)]
        disabled: bool,
    },
    /// Show the allow-list of a permission
    Show {
        /// Permission id
        permission_id: String,
    },
    /// Test an address against rules without touching any store
    Check {
        /// Requester address
        requester: String,
        /// Rule to test against (repeatable)
        #[arg(long = "rule")]
        rules: Vec<String>,
    },
}

/// Allow-list display row
#[derive(Debug, Serialize, Tabled)]
struct RuleRow {
    /// Rule text
    rule: String,
    /// Rule kind
    kind: String,
}

/// Execute IP commands
pub async fn execute(
    args: &IpArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        IpCommand::Set {
            permission_id,
            rules,
            disabled,
        } => {
            let services = super::connect(config).await?;
            let result = services
                .protection
                .update_ip_restriction(
                    permission_id,
                    IpRestrictionUpdate {
                        enabled: !disabled,
                        allowed_rules: rules.clone(),
                    },
                )
                .await?;

            let dropped = rules
                .iter()
                .filter(|r| !r.trim().is_empty())
                .count()
                .saturating_sub(result.normalized_rules.len());
            if dropped > 0 {
                output::print_warning(&format!(
                    "{} rule(s) dropped as malformed, duplicate, or over the limit.",
                    dropped
                ));
            }
            output::print_list(&rows(&result.normalized_rules), format);
            output::print_success(&format!(
                "Allow-list of '{}' {}.",
                permission_id,
                if *disabled { "stored (disabled)" } else { "enabled" }
            ));
        }
        IpCommand::Show { permission_id } => {
            let services = super::connect(config).await?;
            match services.protection.get_ip_restriction(permission_id).await? {
                Some(restriction) => {
                    output::print_record(
                        &restriction,
                        &[
                            ("Permission", restriction.permission_id.clone()),
                            ("Enabled", restriction.enabled.to_string()),
                            ("Updated", restriction.updated_at.to_rfc3339()),
                        ],
                        format,
                    );
                    if format == OutputFormat::Table {
                        output::print_list(&rows(&restriction.allowed_rules), format);
                    }
                }
                None => {
                    output::print_warning(&format!("No allow-list set for '{}'.", permission_id))
                }
            }
        }
        IpCommand::Check { requester, rules } => {
            let matched = IpMatcher::first_match(requester, rules);
            let allowed = IpMatcher::is_allowed(requester, rules);
            output::print_record(
                &serde_json::json!({ "allowed": allowed, "matchedRule": matched }),
                &[
                    ("Allowed", allowed.to_string()),
                    ("Matched rule", output::or_dash(matched)),
                ],
                format,
            );
        }
    }

    Ok(())
}

fn rows(rules: &[String]) -> Vec<RuleRow> {
    rules
        .iter()
        .map(|raw| RuleRow {
            rule: raw.clone(),
            kind: match IpRule::parse(raw) {
                Ok(IpRule::Exact { .. }) => "address",
                Ok(IpRule::Cidr { .. }) => "cidr",
                Ok(IpRule::Wildcard { .. }) => "wildcard",
                Err(_) => "invalid",
            }
            .to_string(),
        })
        .collect()
}
