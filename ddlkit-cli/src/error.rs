//! CLI error types and result alias.

use ddlkit_migrate::MigrationError;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(ddlkit::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(ddlkit::config))]
    Config(String),

    /// Declared schema could not be read
    #[error("Schema error: {0}")]
    #[diagnostic(code(ddlkit::schema))]
    Schema(String),

    /// Engine error
    #[error(transparent)]
    #[diagnostic(code(ddlkit::migrate))]
    Migration(#[from] MigrationError),

    /// Branches do not commute
    #[error("{0}")]
    #[diagnostic(code(ddlkit::conflicts), help("rebase one branch onto the other and regenerate"))]
    Conflicts(String),

    /// Live database differs from the declared schema
    #[error("Schema drift detected: {0} statement(s) needed to converge")]
    #[diagnostic(code(ddlkit::drift))]
    Drift(usize),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(ddlkit::database))]
    Database(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(ddlkit::command))]
    Command(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Schema(err.to_string())
    }
}
