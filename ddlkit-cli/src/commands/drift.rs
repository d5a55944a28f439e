//! `ddlkit drift` command - Compare a live database with the declared schema.

use std::path::PathBuf;

use crate::cli::DriftArgs;
use crate::config::Config;
use crate::error::CliResult;

/// Run the drift command. Fails when the database needs changes to match.
pub async fn run(config_path: Option<PathBuf>, args: DriftArgs) -> CliResult<()> {
    let config = Config::resolve(config_path.as_deref())?;
    imp::run(config, args).await
}

#[cfg(feature = "postgres")]
mod imp {
    use ddlkit_migrate::{Introspector, PostgresIntrospector, detect_drift};

    use super::*;
    use crate::catalog::PgCatalog;
    use crate::commands::{database_url, load_schema};
    use crate::error::CliError;
    use crate::output::{self, success};

    pub(super) async fn run(config: Config, args: DriftArgs) -> CliResult<()> {
        output::header("Schema Drift");

        let schema_path = args.schema.unwrap_or_else(|| config.project.schema.clone());
        let declared = load_schema(&schema_path).await?;
        let url = database_url(&config, args.url)?;

        let catalog = PgCatalog::connect(&url).await?;
        let introspector = PostgresIntrospector::new(catalog);
        let live = introspector
            .introspect(&config.introspection_config())
            .await?;

        let result = detect_drift(&declared.ddl, &live.ddl, introspector.dialect()).await?;
        if !result.errors.is_empty() {
            output::diff_errors(&result.errors);
            return Err(CliError::Schema(format!(
                "{} structural error(s)",
                result.errors.len()
            )));
        }
        if result.statements.is_empty() {
            success("Database matches the declared schema");
            return Ok(());
        }

        output::section("Statements needed to converge");
        for (i, statement) in result.statements.iter().enumerate() {
            output::statement(i + 1, statement);
        }
        output::newline();
        Err(CliError::Drift(result.statements.len()))
    }
}

#[cfg(not(feature = "postgres"))]
mod imp {
    use super::*;
    use crate::error::CliError;

    pub(super) async fn run(_config: Config, _args: DriftArgs) -> CliResult<()> {
        Err(CliError::Command(
            "ddlkit was built without the `postgres` feature".to_string(),
        ))
    }
}
