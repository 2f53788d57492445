//! Share creation and protection management commands.

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use serde_json::json;

use crate::output::{self, OutputFormat};
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;
use linkgate_service::access::NewShare;

/// Arguments for share commands
#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Share subcommand
    #[command(subcommand)]
    pub command: ShareCommand,
}

/// Share subcommands
#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    /// Create a share resource and its permission
    Create {
        /// Resource id (the file group key)
        resource_id: String,
        /// Owner of the share
        #[arg(long)]
        owner: String,
        /// Lifetime of the link in days
        #[arg(long, default_value = "7", conflicts_with = "expires_at")]
        days: i64,
        /// Absolute expiration (RFC 3339)
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
        /// Prompt for a password
        #[arg(long)]
        protect: bool,
        /// Recipient email addresses
        #[arg(long = "email")]
        emails: Vec<String>,
    },
    /// Show a share and its protection state
    Show {
        /// Resource id
        resource_id: String,
    },
    /// Set or remove the password of a share
    Password {
        /// Resource id
        resource_id: String,
        /// Remove the password instead of prompting for a new one
        #[arg(long)]
        clear: bool,
    },
    /// Move the expiration of a share
    Expire {
        /// Resource id
        resource_id: String,
        /// New expiration (RFC 3339)
        #[arg(long)]
        at: DateTime<Utc>,
    },
}

/// Execute share commands
pub async fn execute(
    args: &ShareArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::connect(config).await?;

    match &args.command {
        ShareCommand::Create {
            resource_id,
            owner,
            days,
            expires_at,
            protect,
            emails,
        } => {
            let password = if *protect {
                Some(super::prompt_password("Share password", true)?)
            } else {
                None
            };
            let expiration_date = expires_at.unwrap_or_else(|| Utc::now() + Duration::days(*days));

            let (resource, permission) = services
                .protection
                .create_share(NewShare {
                    resource_id: resource_id.clone(),
                    owner_id: owner.clone(),
                    expiration_date,
                    password,
                    allowed_emails: emails.clone(),
                })
                .await?;

            output::print_record(
                &json!({
                    "resourceId": resource.id,
                    "permissionId": permission.id,
                    "expirationDate": resource.expiration_date,
                    "isPasswordProtected": resource.is_password_protected,
                }),
                &[
                    ("Resource", resource.id.clone()),
                    ("Permission", permission.id.clone()),
                    ("Expires", resource.expiration_date.to_rfc3339()),
                    ("Password protected", resource.is_password_protected.to_string()),
                ],
                format,
            );
        }
        ShareCommand::Show { resource_id } => {
            let resource = services
                .stores
                .resources
                .find_by_id(resource_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Resource '{}' not found", resource_id)))?;
            let permission = services
                .stores
                .permissions
                .find_by_id(&resource.permission_id)
                .await?;
            let restriction = services
                .protection
                .get_ip_restriction(&resource.permission_id)
                .await?;

            let ip_rules = restriction
                .as_ref()
                .filter(|r| r.enabled)
                .map(|r| r.allowed_rules.join(", "));

            output::print_record(
                &json!({
                    "resource": resource,
                    "allowedEmails": permission.as_ref().map(|p| p.allowed_emails.clone()),
                    "passwordScheme": permission.as_ref().map(|p| p.password.scheme()),
                    "ipRestriction": restriction,
                }),
                &[
                    ("Resource", resource.id.clone()),
                    ("Owner", resource.owner_id.clone()),
                    ("Created", resource.created_at.to_rfc3339()),
                    ("Expires", resource.expiration_date.to_rfc3339()),
                    ("Password protected", resource.is_password_protected.to_string()),
                    ("Permission", resource.permission_id.clone()),
                    (
                        "Password scheme",
                        output::or_dash(permission.as_ref().map(|p| p.password.scheme())),
                    ),
                    (
                        "Recipients",
                        output::or_dash(permission.as_ref().map(|p| p.allowed_emails.join(", "))),
                    ),
                    ("IP allow-list", ip_rules.unwrap_or_else(|| "off".to_string())),
                ],
                format,
            );
        }
        ShareCommand::Password { resource_id, clear } => {
            let password = if *clear {
                None
            } else {
                Some(super::prompt_password("New share password", true)?)
            };
            let protection = services
                .protection
                .change_password(resource_id, password.as_deref())
                .await?;
            if protection.is_password_protected {
                output::print_success(&format!("Password of '{}' changed.", resource_id));
            } else {
                output::print_success(&format!("'{}' is no longer password protected.", resource_id));
            }
        }
        ShareCommand::Expire { resource_id, at } => {
            services.protection.update_expiration(resource_id, *at).await?;
            output::print_success(&format!("'{}' now expires at {}.", resource_id, at.to_rfc3339()));
        }
    }

    Ok(())
}
