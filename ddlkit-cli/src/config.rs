//! CLI configuration handling.

use std::path::{Path, PathBuf};

use ddlkit_migrate::{Dialect, IntrospectionConfig, MigrationConfig};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "ddlkit.toml";

/// Default project directory name
pub const DDLKIT_DIR: &str = "ddlkit";

/// Default declared schema path (relative to project root)
pub const SCHEMA_FILE_PATH: &str = "ddlkit/schema.json";

/// Default migrations directory (relative to project root)
pub const MIGRATIONS_DIR: &str = "ddlkit/migrations";

/// Environment variable overriding `database.url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// ddlkit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Introspection configuration
    pub introspect: IntrospectSection,

    /// Migration configuration
    pub migrations: MigrationsSection,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path`, or `./ddlkit.toml` when it exists, or the defaults.
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) if !path.exists() => Err(CliError::Config(format!(
                "config file {} not found",
                path.display()
            ))),
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(CONFIG_FILE_NAME);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create a default config for a specific dialect
    pub fn default_for_dialect(dialect: Dialect) -> Self {
        let mut config = Self::default();
        config.project.dialect = dialect;
        config
    }

    /// Database URL; `DATABASE_URL` wins over the file.
    pub fn database_url(&self) -> Option<String> {
        std::env::var(DATABASE_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| self.database.url.clone())
    }

    /// Engine configuration for this project.
    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig::new()
            .migrations_dir(&self.project.out)
            .dialect(self.project.dialect)
            .allow_data_loss(self.migrations.allow_data_loss)
            .breakpoints(self.project.breakpoints)
    }

    /// Introspection configuration for this project.
    pub fn introspection_config(&self) -> IntrospectionConfig {
        IntrospectionConfig::new()
            .schemas(self.introspect.schemas.clone())
            .exclude_tables(self.introspect.exclude_tables.clone())
            .include_views(self.introspect.include_views)
            .include_roles(self.introspect.include_roles)
    }
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Target dialect
    pub dialect: Dialect,

    /// Declared schema file
    pub schema: PathBuf,

    /// Migrations directory
    pub out: PathBuf,

    /// Separate statements with breakpoint markers
    pub breakpoints: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgresql,
            schema: PathBuf::from(SCHEMA_FILE_PATH),
            out: PathBuf::from(MIGRATIONS_DIR),
            breakpoints: true,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: Option<String>,
}

/// Introspection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectSection {
    /// Schemas to read
    pub schemas: Vec<String>,

    /// Tables to leave out
    pub exclude_tables: Vec<String>,

    /// Read views
    pub include_views: bool,

    /// Read roles
    pub include_roles: bool,
}

impl Default for IntrospectSection {
    fn default() -> Self {
        let defaults = IntrospectionConfig::default();
        Self {
            schemas: defaults.schemas,
            exclude_tables: defaults.exclude_tables,
            include_views: defaults.include_views,
            include_roles: defaults.include_roles,
        }
    }
}

/// Migration configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsSection {
    /// Allow statements that drop data
    pub allow_data_loss: bool,
}
