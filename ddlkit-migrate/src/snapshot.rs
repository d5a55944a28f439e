//! Versioned snapshot documents.
//!
//! A snapshot captures a full DDL entity list plus lineage pointers. Version
//! `"7"` files carry a single `prevId`; version `"8"` files carry `prevIds`
//! so merge nodes can name several parents. Both are read, only `"8"` is
//! written.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::ddl::{Ddl, Dialect, EntityKey, EntityKind};
use crate::error::{MigrateResult, MigrationError};

/// Version written by this build.
pub const SNAPSHOT_VERSION: &str = "8";

/// Oldest version still understood.
pub const LEGACY_SNAPSHOT_VERSION: &str = "7";

/// Virtual empty root of every lineage.
pub const ORIGIN_ID: &str = "00000000-0000-0000-0000-000000000000";

/// A rename decision recorded for replay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameHint {
    /// Kind of the renamed entity.
    pub entity_type: EntityKind,
    /// Key before the rename.
    pub from: EntityKey,
    /// Key after the rename.
    pub to: EntityKey,
}

impl RenameHint {
    /// Create a hint.
    pub fn new(entity_type: EntityKind, from: EntityKey, to: EntityKey) -> Self {
        Self {
            entity_type,
            from,
            to,
        }
    }
}

/// An immutable schema capture with lineage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub dialect: Dialect,
    pub id: String,
    pub prev_ids: Vec<String>,
    pub ddl: Ddl,
    pub renames: Vec<RenameHint>,
}

/// On-disk shape accepted by the reader.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    version: String,
    dialect: Dialect,
    id: String,
    #[serde(default)]
    prev_id: Option<String>,
    #[serde(default)]
    prev_ids: Option<Vec<String>>,
    ddl: Option<Ddl>,
    #[serde(default)]
    renames: Vec<RenameHint>,
}

impl Snapshot {
    /// A fresh snapshot with a new UUID v4 id.
    pub fn new(dialect: Dialect, prev_ids: Vec<String>, ddl: Ddl) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            dialect,
            id: Uuid::new_v4().to_string(),
            prev_ids,
            ddl,
            renames: Vec::new(),
        }
    }

    /// The first snapshot of a lineage.
    pub fn initial(dialect: Dialect, ddl: Ddl) -> Self {
        Self::new(dialect, vec![ORIGIN_ID.to_string()], ddl)
    }

    /// Override the generated id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach rename decisions.
    pub fn with_renames(mut self, renames: Vec<RenameHint>) -> Self {
        self.renames = renames;
        self
    }

    /// Whether this snapshot joins several branches.
    pub fn is_merge(&self) -> bool {
        self.prev_ids.len() > 1
    }

    /// Parse a snapshot document. `origin` names the source in errors.
    pub fn from_json(content: &str, origin: &str) -> MigrateResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| MigrationError::invalid_snapshot(origin, e.to_string()))?;

        match value.get("version").and_then(Value::as_str) {
            Some(SNAPSHOT_VERSION) | Some(LEGACY_SNAPSHOT_VERSION) => {}
            Some(other) => return Err(MigrationError::UnsupportedVersion(other.to_string())),
            None => return Err(MigrationError::invalid_snapshot(origin, "missing 'version'")),
        }

        let raw: RawSnapshot = serde_json::from_value(value)
            .map_err(|e| MigrationError::invalid_snapshot(origin, e.to_string()))?;

        let ddl = raw
            .ddl
            .ok_or_else(|| MigrationError::invalid_snapshot(origin, "missing 'ddl'"))?;

        let prev_ids = match (raw.prev_ids, raw.prev_id) {
            (Some(ids), _) if !ids.is_empty() => ids,
            (_, Some(id)) => vec![id],
            _ => {
                return Err(MigrationError::invalid_snapshot(
                    origin,
                    "missing 'prevId' or 'prevIds'",
                ));
            }
        };

        Ok(Self {
            version: SNAPSHOT_VERSION.to_string(),
            dialect: raw.dialect,
            id: raw.id,
            prev_ids,
            ddl,
            renames: raw.renames,
        })
    }

    /// Serialize as pretty JSON, always in the current version.
    pub fn to_json(&self) -> MigrateResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a snapshot file, fully buffered.
    pub async fn load(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading snapshot");
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Write the snapshot file.
    pub async fn save(&self, path: impl AsRef<Path>) -> MigrateResult<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), id = %self.id, "Saving snapshot");
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Column, Table};

    fn sample_ddl() -> Ddl {
        Ddl::builder()
            .with(Table::new("public", "users"))
            .with(Column::new("public", "users", "id", "integer"))
            .build()
    }

    #[test]
    fn test_new_snapshot_has_uuid_id() {
        let snapshot = Snapshot::initial(Dialect::Postgresql, Ddl::empty());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.prev_ids, vec![ORIGIN_ID.to_string()]);
        assert!(Uuid::parse_str(&snapshot.id).is_ok());
        assert_ne!(snapshot.id, ORIGIN_ID);
    }

    #[test]
    fn test_reads_legacy_prev_id() {
        let json = r#"{
            "version": "7",
            "dialect": "postgresql",
            "id": "b",
            "prevId": "a",
            "ddl": [{"entityType": "table", "schema": "public", "name": "users"}],
            "renames": []
        }"#;
        let snapshot = Snapshot::from_json(json, "test").unwrap();
        assert_eq!(snapshot.prev_ids, vec!["a".to_string()]);
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.ddl.tables().len(), 1);
    }

    #[test]
    fn test_writes_prev_ids() {
        let snapshot = Snapshot::new(
            Dialect::Postgresql,
            vec!["a".into(), "b".into()],
            sample_ddl(),
        )
        .with_id("m");
        let json: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["prevIds"], serde_json::json!(["a", "b"]));
        assert!(json.get("prevId").is_none());
        assert!(snapshot.is_merge());
    }

    #[test]
    fn test_missing_ddl_is_rejected() {
        let json = r#"{"version": "8", "dialect": "postgresql", "id": "x", "prevIds": ["y"]}"#;
        let err = Snapshot::from_json(json, "broken.json").unwrap_err();
        assert!(matches!(err, MigrationError::InvalidSnapshot { .. }));
        assert!(err.to_string().contains("missing 'ddl'"));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let json = r#"{"version": "5", "dialect": "postgresql", "id": "x", "prevId": "y", "ddl": []}"#;
        let err = Snapshot::from_json(json, "old.json").unwrap_err();
        assert!(matches!(err, MigrationError::UnsupportedVersion(v) if v == "5"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let renames = vec![RenameHint::new(
            EntityKind::Table,
            EntityKey::in_schema("public", "people"),
            EntityKey::in_schema("public", "users"),
        )];
        let snapshot = Snapshot::initial(Dialect::Postgresql, sample_ddl()).with_renames(renames);
        snapshot.save(&path).await.unwrap();

        let loaded = Snapshot::load(&path).await.unwrap();
        assert_eq!(loaded, snapshot);
    }
}
