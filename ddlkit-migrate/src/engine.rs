//! Migration planning engine.
//!
//! Ties the pieces together for a migrations folder: find the current head,
//! diff it against the declared schema, lower the result to SQL and write a
//! new migration. When the folder has several heads (parallel branches), the
//! engine refuses to continue unless they commute, and then plans from a
//! three-way merge of the heads so the new snapshot joins them.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::commutativity::{ConflictReport, Lineage, analyze_lineage};
use crate::ddl::{Ddl, Dialect};
use crate::diff::diff;
use crate::error::{MigrateResult, MigrationError};
use crate::file::{MigrationFile, MigrationFileManager};
use crate::resolver::Resolver;
use crate::snapshot::{ORIGIN_ID, RenameHint, Snapshot};
use crate::sql::{MigrationSql, generator_for};
use crate::statement::JsonStatement;

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Path to the migrations directory.
    pub migrations_dir: PathBuf,
    /// Target dialect.
    pub dialect: Dialect,
    /// Whether to allow data loss (dropping tables, columns, ...).
    pub allow_data_loss: bool,
    /// Whether to separate statements with breakpoint markers.
    pub breakpoints: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("./migrations"),
            dialect: Dialect::Postgresql,
            allow_data_loss: false,
            breakpoints: true,
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migrations directory.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Set the dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Allow data loss operations.
    pub fn allow_data_loss(mut self, allow: bool) -> Self {
        self.allow_data_loss = allow;
        self
    }

    /// Toggle breakpoint markers.
    pub fn breakpoints(mut self, breakpoints: bool) -> Self {
        self.breakpoints = breakpoints;
        self
    }
}

/// What the next migration would contain.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Parents of the snapshot this plan produces.
    pub prev_ids: Vec<String>,
    /// Schema the plan starts from.
    pub base: Ddl,
    /// Statements in execution order.
    pub statements: Vec<JsonStatement>,
    /// Generated SQL.
    pub sql: MigrationSql,
    /// Rename decisions taken.
    pub renames: Vec<RenameHint>,
    /// One line per statement that can destroy data.
    pub data_loss: Vec<String>,
}

impl MigrationPlan {
    /// Check if there is nothing to migrate.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Whether the plan joins several branches.
    pub fn is_merge(&self) -> bool {
        self.prev_ids.len() > 1
    }

    /// Snapshot recording `declared` as the result of this plan.
    pub fn snapshot(&self, dialect: Dialect, declared: &Ddl) -> Snapshot {
        Snapshot::new(dialect, self.prev_ids.clone(), declared.clone())
            .with_renames(self.renames.clone())
    }
}

/// The migration planning engine.
pub struct MigrationEngine {
    config: MigrationConfig,
    files: MigrationFileManager,
}

impl MigrationEngine {
    /// Create an engine over a migrations folder.
    pub fn new(config: MigrationConfig) -> Self {
        let files = MigrationFileManager::new(&config.migrations_dir);
        Self { config, files }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Get the file manager.
    pub fn files(&self) -> &MigrationFileManager {
        &self.files
    }

    /// Plan the migration from the current head(s) to `declared`.
    #[instrument(skip(self, declared, resolver), fields(dialect = %self.config.dialect))]
    pub async fn plan(&self, declared: &Ddl, resolver: &dyn Resolver) -> MigrateResult<MigrationPlan> {
        let dialect = self.config.dialect;
        let snapshots = self.files.load_snapshots().await?;

        let (prev_ids, base) = if snapshots.is_empty() {
            (vec![ORIGIN_ID.to_string()], Ddl::empty())
        } else {
            let lineage = Lineage::build(snapshots, dialect)?;
            self.base_of(&lineage).await?
        };

        let result = diff(&base, declared, dialect, resolver).await?;
        if !result.errors.is_empty() {
            let message = result
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(MigrationError::InvalidSchema(message));
        }

        let sql = generator_for(dialect).generate(&result.statements)?;
        let data_loss = result
            .statements
            .iter()
            .filter_map(JsonStatement::data_loss_reason)
            .collect();

        info!(
            statements = result.statements.len(),
            parents = prev_ids.len(),
            "Planned migration"
        );
        Ok(MigrationPlan {
            prev_ids,
            base,
            statements: result.statements,
            sql,
            renames: result.renames,
            data_loss,
        })
    }

    /// Parents and starting schema for the next snapshot.
    async fn base_of(&self, lineage: &Lineage) -> MigrateResult<(Vec<String>, Ddl)> {
        let heads = lineage.heads();
        let ids: Vec<String> = heads.iter().map(|s| s.id.clone()).collect();

        let [head] = heads.as_slice() else {
            let report = analyze_lineage(lineage, self.config.dialect).await?;
            if !report.is_empty() {
                warn!("{}", report.summary());
                return Err(MigrationError::Conflicts(report.len()));
            }

            let ancestor = lineage.ddl(lineage.common_ancestor(ids.as_slice()));
            let mut merged = heads.first().map(|h| h.ddl.clone()).unwrap_or_default();
            for other in heads.iter().skip(1) {
                merged = Ddl::three_way_merge(ancestor, &merged, &other.ddl);
            }
            info!(heads = ids.len(), "Merging commuting branches");
            return Ok((ids, merged));
        };

        Ok((ids, head.ddl.clone()))
    }

    /// Plan and write a new migration called `name`.
    ///
    /// Fails with [`MigrationError::NoChanges`] when there is nothing to do,
    /// and with [`MigrationError::DataLoss`] when the plan drops data and the
    /// configuration does not allow it. Joining branches always writes a
    /// migration, even an empty one, so the lineage gets a single head again.
    pub async fn generate(
        &self,
        name: &str,
        declared: &Ddl,
        resolver: &dyn Resolver,
    ) -> MigrateResult<MigrationFile> {
        let start = Instant::now();
        let plan = self.plan(declared, resolver).await?;

        if plan.is_empty() && !plan.is_merge() {
            return Err(MigrationError::NoChanges);
        }
        if !plan.data_loss.is_empty() && !self.config.allow_data_loss {
            return Err(MigrationError::DataLoss(plan.data_loss.join("; ")));
        }

        let snapshot = plan.snapshot(self.config.dialect, declared);
        let script = plan.sql.to_script(self.config.breakpoints);
        let tag = MigrationFileManager::new_tag(name);
        let file = self.files.write_migration(&tag, &snapshot, &script).await?;

        info!(
            tag = %file.tag,
            statements = plan.statements.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generated migration"
        );
        Ok(file)
    }

    /// Run the commutativity analysis over the folder.
    pub async fn check(&self) -> MigrateResult<ConflictReport> {
        let snapshots = self.files.load_snapshots().await?;
        if snapshots.is_empty() {
            return Ok(ConflictReport::default());
        }
        let lineage = Lineage::build(snapshots, self.config.dialect)?;
        analyze_lineage(&lineage, self.config.dialect).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Column, Table};
    use crate::resolver::NoRenames;

    fn users() -> Ddl {
        Ddl::builder()
            .with(Table::new("public", "users"))
            .with(Column::new("public", "users", "id", "integer").not_null())
            .build()
    }

    fn engine(dir: &std::path::Path) -> MigrationEngine {
        MigrationEngine::new(MigrationConfig::new().migrations_dir(dir))
    }

    #[test]
    fn test_config_builder() {
        let config = MigrationConfig::new()
            .dialect(Dialect::Sqlite)
            .allow_data_loss(true)
            .breakpoints(false);
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert!(config.allow_data_loss);
        assert!(!config.breakpoints);
    }

    #[tokio::test]
    async fn test_first_plan_starts_from_origin() {
        let dir = tempfile::tempdir().unwrap();
        let plan = engine(dir.path()).plan(&users(), &NoRenames).await.unwrap();
        assert_eq!(plan.prev_ids, vec![ORIGIN_ID.to_string()]);
        assert_eq!(plan.statements.len(), 1);
        assert!(plan.sql.statements[0].starts_with("CREATE TABLE"));
        assert!(plan.data_loss.is_empty());
    }

    #[tokio::test]
    async fn test_generate_then_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let file = engine.generate("init", &users(), &NoRenames).await.unwrap();
        assert!(file.sql.contains("CREATE TABLE"));

        let err = engine.generate("again", &users(), &NoRenames).await.unwrap_err();
        assert!(matches!(err, MigrationError::NoChanges));
    }

    #[tokio::test]
    async fn test_generate_refuses_data_loss() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        engine.generate("init", &users(), &NoRenames).await.unwrap();

        let err = engine
            .generate("drop", &Ddl::empty(), &NoRenames)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::DataLoss(_)));
    }

    #[tokio::test]
    async fn test_check_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(engine(dir.path()).check().await.unwrap().is_empty());
    }
}
