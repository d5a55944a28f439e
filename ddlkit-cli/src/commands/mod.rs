//! CLI command implementations.

pub mod check;
pub mod diff;
pub mod drift;
pub mod generate;
pub mod init;
pub mod pull;
pub mod version;

use std::path::{Path, PathBuf};

use ddlkit_migrate::{
    Ddl, DdlDocument, Dialect, HeuristicResolver, HintResolver, NoRenames, Resolver, Snapshot,
};

use crate::cli::RenameMode;
use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Read a declared schema document.
pub(crate) async fn load_schema(path: &Path) -> CliResult<DdlDocument> {
    if !path.exists() {
        return Err(CliError::Schema(format!(
            "schema file {} not found",
            path.display()
        )));
    }
    Ok(DdlDocument::load(path).await?)
}

/// Read either a snapshot or a declared schema document.
pub(crate) async fn load_ddl(path: &Path) -> CliResult<(Dialect, Ddl)> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        CliError::Schema(format!("cannot read {}: {}", path.display(), e))
    })?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    if value.get("version").is_some() {
        let snapshot = Snapshot::from_json(&content, &path.display().to_string())?;
        Ok((snapshot.dialect, snapshot.ddl))
    } else {
        let document: DdlDocument = serde_json::from_value(value)?;
        Ok((document.dialect, document.ddl))
    }
}

/// Pick the rename resolver: a decisions file wins over the mode.
pub(crate) async fn resolver(
    renames: Option<&Path>,
    mode: RenameMode,
) -> CliResult<Box<dyn Resolver>> {
    if let Some(path) = renames {
        return Ok(Box::new(HintResolver::load(path).await?));
    }
    Ok(match mode {
        RenameMode::None => Box::new(NoRenames),
        RenameMode::Heuristic => Box::new(HeuristicResolver),
    })
}

/// Flag, then environment, then config file.
pub(crate) fn database_url(config: &Config, flag: Option<String>) -> CliResult<String> {
    flag.or_else(|| config.database_url()).ok_or_else(|| {
        CliError::Config(
            "no database URL; pass --url, set DATABASE_URL or database.url in ddlkit.toml"
                .to_string(),
        )
    })
}

/// Migrations directory from a flag or the config.
pub(crate) fn migrations_dir(config: &Config, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| config.project.out.clone())
}
