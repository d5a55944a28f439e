//! `ddlkit generate` command - Write a migration for the declared schema.

use std::path::PathBuf;

use ddlkit_migrate::{MigrationEngine, MigrationError};

use crate::cli::GenerateArgs;
use crate::commands::{load_schema, migrations_dir, resolver};
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the generate command
pub async fn run(config_path: Option<PathBuf>, args: GenerateArgs) -> CliResult<()> {
    output::header("Generate Migration");

    let config = Config::resolve(config_path.as_deref())?;
    let schema_path = args.schema.unwrap_or_else(|| config.project.schema.clone());
    let document = load_schema(&schema_path).await?;
    if document.dialect != config.project.dialect {
        return Err(CliError::Schema(format!(
            "{} targets {}, but the project is configured for {}",
            schema_path.display(),
            document.dialect,
            config.project.dialect
        )));
    }

    let mut migration_config = config.migration_config();
    migration_config.migrations_dir = migrations_dir(&config, args.out);
    migration_config.allow_data_loss |= args.allow_data_loss;
    let engine = MigrationEngine::new(migration_config);
    let resolver = resolver(args.renames.as_deref(), args.rename_mode).await?;

    output::kv("Schema", &schema_path.display().to_string());
    output::kv("Dialect", document.dialect.as_str());
    output::kv(
        "Migrations",
        &engine.config().migrations_dir.display().to_string(),
    );
    output::newline();

    if args.dry_run {
        let plan = engine.plan(&document.ddl, resolver.as_ref()).await?;
        if plan.is_empty() {
            output::info("No schema changes detected");
            return Ok(());
        }
        for (i, statement) in plan.statements.iter().enumerate() {
            output::statement(i + 1, statement);
        }
        if !plan.data_loss.is_empty() {
            output::warn("Plan drops data; generating it needs --allow-data-loss");
        }
        output::sql(&plan.sql.to_script(engine.config().breakpoints));
        return Ok(());
    }

    match engine.generate(&args.name, &document.ddl, resolver.as_ref()).await {
        Ok(file) => {
            success(&format!("Created migration {}", file.tag));
            output::kv("Path", &file.path.display().to_string());
            output::kv("Checksum", &file.checksum);
            Ok(())
        }
        Err(MigrationError::NoChanges) => {
            output::info("No schema changes detected");
            Ok(())
        }
        Err(MigrationError::DataLoss(reasons)) => {
            for reason in reasons.split("; ") {
                output::warn(&format!("Data loss: {}", reason));
            }
            Err(CliError::Command(
                "migration would lose data; re-run with --allow-data-loss".to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}
