//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ddlkit_migrate::Dialect;

/// ddlkit - schema diffing and migration planning for SQL databases
#[derive(Parser, Debug)]
#[command(name = "ddlkit")]
#[command(version)]
#[command(about = "ddlkit - schema diffing and migration planning for SQL databases", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to ./ddlkit.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new ddlkit project
    Init(InitArgs),

    /// Generate a migration from the declared schema
    Generate(GenerateArgs),

    /// Diff two schema or snapshot files
    Diff(DiffArgs),

    /// Check migration branches for conflicts
    Check(CheckArgs),

    /// Introspect a live database into a schema file
    Pull(PullArgs),

    /// Compare a live database with the declared schema
    Drift(DriftArgs),

    /// Display version information
    Version,
}

/// Supported dialects
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialectArg {
    #[default]
    Postgresql,
    Cockroach,
    Mysql,
    Sqlite,
    Mssql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgresql => Dialect::Postgresql,
            DialectArg::Cockroach => Dialect::Cockroach,
            DialectArg::Mysql => Dialect::Mysql,
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Mssql => Dialect::Mssql,
        }
    }
}

/// How renames are decided
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenameMode {
    /// Never rename; every change is a drop and a create
    #[default]
    None,
    /// Rename when exactly one drop and one create share a shape
    Heuristic,
}

// =============================================================================
// Init Command
// =============================================================================

/// Arguments for the `init` command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to initialize the project (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Target dialect
    #[arg(short, long, value_enum, default_value_t = DialectArg::Postgresql)]
    pub dialect: DialectArg,

    /// Database connection URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,
}

// =============================================================================
// Generate Command
// =============================================================================

/// Arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Name for the migration
    #[arg(short, long, default_value = "migration")]
    pub name: String,

    /// Path to the declared schema (JSON)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Migrations directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Rename decisions to replay (JSON list of rename hints)
    #[arg(long)]
    pub renames: Option<PathBuf>,

    /// Rename strategy when no decisions file is given
    #[arg(long, value_enum, default_value_t = RenameMode::None)]
    pub rename_mode: RenameMode,

    /// Allow statements that drop data
    #[arg(long)]
    pub allow_data_loss: bool,

    /// Print the plan without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

// =============================================================================
// Diff Command
// =============================================================================

/// Output format for `diff`
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffFormat {
    /// Dialect SQL
    #[default]
    Sql,
    /// JSON statements
    Json,
}

/// Arguments for the `diff` command
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Starting schema or snapshot
    pub from: PathBuf,

    /// Target schema or snapshot
    pub to: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = DiffFormat::Sql)]
    pub format: DiffFormat,

    /// Rename decisions to replay (JSON list of rename hints)
    #[arg(long)]
    pub renames: Option<PathBuf>,

    /// Rename strategy when no decisions file is given
    #[arg(long, value_enum, default_value_t = RenameMode::None)]
    pub rename_mode: RenameMode,
}

// =============================================================================
// Check Command
// =============================================================================

/// Arguments for the `check` command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Migrations directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Pull / Drift Commands
// =============================================================================

/// Arguments for the `pull` command
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Database URL (overrides config and DATABASE_URL)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Where to write the introspected schema
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Schemas to read
    #[arg(long, value_delimiter = ',')]
    pub schemas: Vec<String>,
}

/// Arguments for the `drift` command
#[derive(Args, Debug)]
pub struct DriftArgs {
    /// Database URL (overrides config and DATABASE_URL)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Path to the declared schema (JSON)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "ddlkit",
            "generate",
            "--name",
            "add_posts",
            "--rename-mode",
            "heuristic",
        ]);
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.name, "add_posts");
                assert_eq!(args.rename_mode, RenameMode::Heuristic);
                assert!(!args.allow_data_loss);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_dialect_arg_maps_to_dialect() {
        assert_eq!(Dialect::from(DialectArg::Mssql), Dialect::Mssql);
        assert_eq!(Dialect::from(DialectArg::default()), Dialect::Postgresql);
    }
}
