//! Offline protection record generation.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::output::{self, OutputFormat};
use linkgate_cache::KvStoreManager;
use linkgate_cache::memory::MemoryKvStore;
use linkgate_core::config::AppConfig;
use linkgate_core::error::AppError;
use linkgate_core::traits::SystemClock;
use linkgate_database::Stores;
use linkgate_service::AppServices;

/// Arguments for the hash command
#[derive(Debug, Args)]
pub struct HashArgs {
    /// Print the record for an unprotected share instead of prompting
    #[arg(long)]
    pub none: bool,
}

/// Execute the hash command
///
/// Nothing is stored; the record can be written to a permission by hand.
pub async fn execute(
    args: &HashArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let password = if args.none {
        None
    } else {
        Some(super::prompt_password("Password to hash", true)?)
    };

    let services = AppServices::build(
        config,
        Stores::memory(),
        KvStoreManager::from_store(
            Arc::new(MemoryKvStore::new()),
            Duration::from_secs(config.attempts.record_ttl_hours * 3600),
        ),
        Arc::new(SystemClock),
    );
    let record = services.protection.create_protection(password.as_deref());

    output::print_record(
        &record,
        &[
            ("Password protected", record.is_password_protected.to_string()),
            ("Hash", output::or_dash(record.password_hash.as_deref())),
            ("Salt", output::or_dash(record.password_salt.as_deref())),
        ],
        format,
    );

    Ok(())
}
