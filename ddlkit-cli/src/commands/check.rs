//! `ddlkit check` command - Commutativity check over the migrations folder.

use std::path::PathBuf;

use ddlkit_migrate::MigrationEngine;

use crate::cli::CheckArgs;
use crate::commands::migrations_dir;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the check command. Fails when any pair of branches conflicts.
pub async fn run(config_path: Option<PathBuf>, args: CheckArgs) -> CliResult<()> {
    let config = Config::resolve(config_path.as_deref())?;
    let mut migration_config = config.migration_config();
    migration_config.migrations_dir = migrations_dir(&config, args.out);
    let engine = MigrationEngine::new(migration_config);

    let report = engine.check().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::header("Check Migration Branches");
        if report.is_empty() {
            success(&report.summary());
        } else {
            for conflict in &report.conflicts {
                output::conflict(conflict);
            }
        }
    }

    if report.is_empty() {
        Ok(())
    } else {
        Err(CliError::Conflicts(format!(
            "{} non-commutative branch pair(s)",
            report.len()
        )))
    }
}
