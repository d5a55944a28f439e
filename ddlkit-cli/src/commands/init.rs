//! `ddlkit init` command - Initialize a new ddlkit project.

use std::path::Path;

use ddlkit_migrate::{
    Column, Ddl, DdlDocument, Dialect, Identity, IdentityKind, PrimaryKey, Table,
};

use crate::cli::InitArgs;
use crate::config::{CONFIG_FILE_NAME, Config, DDLKIT_DIR, MIGRATIONS_DIR, SCHEMA_FILE_PATH};
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the init command
pub async fn run(args: InitArgs) -> CliResult<()> {
    output::header("Initialize ddlkit Project");

    let project_path = args.path.clone();
    let config_path = project_path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        output::warn(&format!(
            "Project already initialized. {} exists (use --force to overwrite).",
            CONFIG_FILE_NAME
        ));
        return Ok(());
    }

    let dialect = Dialect::from(args.dialect);

    output::newline();
    output::info("Creating project structure...");
    tokio::fs::create_dir_all(project_path.join(MIGRATIONS_DIR)).await?;

    output::info("Creating configuration file...");
    let mut config = Config::default_for_dialect(dialect);
    config.database.url = args.url;
    config.save(&config_path)?;

    let schema_path = project_path.join(SCHEMA_FILE_PATH);
    if !schema_path.exists() {
        output::info("Creating example schema...");
        write_example_schema(&schema_path, dialect).await?;
    }

    output::newline();
    success("Project initialized successfully!");
    output::newline();

    output::section("Next steps");
    output::bullet(&format!(
        "Export your declared schema to {}",
        SCHEMA_FILE_PATH
    ));
    output::bullet("Run `ddlkit generate --name init` to create your first migration");
    output::bullet("Run `ddlkit check` before merging migration branches");
    output::newline();

    output::section("Created files");
    output::kv(CONFIG_FILE_NAME, "ddlkit configuration");
    output::kv(&format!("{}/", DDLKIT_DIR), "ddlkit directory");
    output::kv("  schema.json", "Declared schema");
    output::kv("  migrations/", "Migration folders");

    Ok(())
}

async fn write_example_schema(path: &Path, dialect: Dialect) -> CliResult<()> {
    let mut id = Column::new("public", "users", "id", "integer").not_null();
    if matches!(dialect, Dialect::Postgresql | Dialect::Cockroach) {
        id.identity = Some(Identity::new(IdentityKind::ByDefault));
    }
    let ddl = Ddl::builder()
        .with(Table::new("public", "users"))
        .with(id)
        .with(Column::new("public", "users", "email", "varchar(255)").not_null())
        .with(PrimaryKey {
            schema: "public".into(),
            table: "users".into(),
            name: "users_pkey".into(),
            columns: vec!["id".into()],
        })
        .build();
    DdlDocument { dialect, ddl }.save(path).await?;
    Ok(())
}
