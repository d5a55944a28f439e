//! `ddlkit pull` command - Introspect a live database into a schema file.

use std::path::PathBuf;

use crate::cli::PullArgs;
use crate::config::Config;
use crate::error::CliResult;

/// Run the pull command
pub async fn run(config_path: Option<PathBuf>, args: PullArgs) -> CliResult<()> {
    let config = Config::resolve(config_path.as_deref())?;
    imp::run(config, args).await
}

#[cfg(feature = "postgres")]
mod imp {
    use ddlkit_migrate::{DdlDocument, Introspector, PostgresIntrospector};

    use super::*;
    use crate::catalog::PgCatalog;
    use crate::commands::database_url;
    use crate::output::{self, success};

    pub(super) async fn run(config: Config, args: PullArgs) -> CliResult<()> {
        output::header("Pull Database Schema");

        let url = database_url(&config, args.url)?;
        let mut introspection = config.introspection_config();
        if !args.schemas.is_empty() {
            introspection.schemas = args.schemas;
        }

        let catalog = PgCatalog::connect(&url).await?;
        let introspector = PostgresIntrospector::new(catalog);
        let result = introspector.introspect(&introspection).await?;

        for skipped in &result.skipped_tables {
            output::dim(&format!(
                "skipped {}.{}: {}",
                skipped.schema, skipped.name, skipped.reason
            ));
        }
        for warning in &result.warnings {
            output::warn(warning);
        }

        let output_path = args.output.unwrap_or_else(|| config.project.schema.clone());
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let entities = result.ddl.len();
        DdlDocument {
            dialect: introspector.dialect(),
            ddl: result.ddl,
        }
        .save(&output_path)
        .await?;

        success(&format!(
            "Wrote {} entities to {}",
            entities,
            output_path.display()
        ));
        Ok(())
    }
}

#[cfg(not(feature = "postgres"))]
mod imp {
    use super::*;
    use crate::error::CliError;

    pub(super) async fn run(_config: Config, _args: PullArgs) -> CliResult<()> {
        Err(CliError::Command(
            "ddlkit was built without the `postgres` feature".to_string(),
        ))
    }
}
