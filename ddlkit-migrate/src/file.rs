//! Migration folder management.
//!
//! Every migration lives in its own folder named by its tag:
//!
//! ```text
//! migrations/
//!   20250101120000_create_users/
//!     snapshot.json
//!     migration.sql
//! ```
//!
//! The lineage comes from the `prevIds` inside the snapshots, not from the
//! folder order; tags only keep listings stable.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{MigrateResult, MigrationError};
use crate::snapshot::Snapshot;

/// Snapshot file inside a migration folder.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// SQL file inside a migration folder.
pub const MIGRATION_FILE: &str = "migration.sql";

/// A migration folder on disk.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationFile {
    /// Folder path.
    pub path: PathBuf,
    /// Folder name, `<timestamp>_<name>`.
    pub tag: String,
    /// Human readable part of the tag.
    pub name: String,
    /// Migration SQL; empty when the folder has no SQL file.
    pub sql: String,
    /// SHA-256 of the SQL, hex encoded.
    pub checksum: String,
}

impl MigrationFile {
    /// Path of the folder's snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.path.join(SNAPSHOT_FILE)
    }

    /// Load the folder's snapshot.
    pub async fn snapshot(&self) -> MigrateResult<Snapshot> {
        Snapshot::load(self.snapshot_path()).await
    }
}

/// SHA-256 checksum of migration SQL.
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Migration folder reader/writer.
#[derive(Debug, Clone)]
pub struct MigrationFileManager {
    migrations_dir: PathBuf,
}

impl MigrationFileManager {
    /// Create a new file manager.
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    /// Get the migrations directory.
    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Ensure the migrations directory exists.
    pub async fn ensure_dir(&self) -> MigrateResult<()> {
        tokio::fs::create_dir_all(&self.migrations_dir).await?;
        Ok(())
    }

    /// Fresh tag for a migration called `name`.
    pub fn new_tag(name: &str) -> String {
        format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), sanitize_name(name))
    }

    /// All migration folders, in tag order. Folders without a snapshot are
    /// ignored; a missing directory lists as empty.
    pub async fn list_migrations(&self) -> MigrateResult<Vec<MigrationFile>> {
        let mut dirs = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.migrations_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.join(SNAPSHOT_FILE).is_file() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut migrations = Vec::with_capacity(dirs.len());
        for dir in dirs {
            migrations.push(self.read_migration(&dir).await?);
        }
        debug!(
            dir = %self.migrations_dir.display(),
            count = migrations.len(),
            "Listed migrations"
        );
        Ok(migrations)
    }

    /// Snapshot paths of every migration, in tag order.
    pub async fn snapshot_paths(&self) -> MigrateResult<Vec<PathBuf>> {
        Ok(self
            .list_migrations()
            .await?
            .iter()
            .map(MigrationFile::snapshot_path)
            .collect())
    }

    /// Load every snapshot, in tag order.
    pub async fn load_snapshots(&self) -> MigrateResult<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for path in self.snapshot_paths().await? {
            snapshots.push(Snapshot::load(&path).await?);
        }
        Ok(snapshots)
    }

    async fn read_migration(&self, dir: &Path) -> MigrateResult<MigrationFile> {
        let tag = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                MigrationError::invalid_snapshot(dir.display().to_string(), "invalid folder name")
            })?
            .to_string();
        let name = parse_tag(&tag)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| tag.clone());

        let sql_path = dir.join(MIGRATION_FILE);
        let sql = match tokio::fs::read_to_string(&sql_path).await {
            Ok(sql) => sql,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let checksum = compute_checksum(&sql);

        Ok(MigrationFile {
            path: dir.to_path_buf(),
            tag,
            name,
            sql,
            checksum,
        })
    }

    /// Write a migration folder. Fails if the folder already exists.
    pub async fn write_migration(
        &self,
        tag: &str,
        snapshot: &Snapshot,
        sql: &str,
    ) -> MigrateResult<MigrationFile> {
        self.ensure_dir().await?;

        let dir = self.migrations_dir.join(tag);
        if tokio::fs::try_exists(&dir).await? {
            return Err(MigrationError::other(format!(
                "migration folder {} already exists",
                dir.display()
            )));
        }
        tokio::fs::create_dir_all(&dir).await?;

        snapshot.save(dir.join(SNAPSHOT_FILE)).await?;
        tokio::fs::write(dir.join(MIGRATION_FILE), sql).await?;
        info!(tag, snapshot = %snapshot.id, "Wrote migration");

        let name = parse_tag(tag)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| tag.to_string());
        Ok(MigrationFile {
            path: dir,
            tag: tag.to_string(),
            name,
            sql: sql.to_string(),
            checksum: compute_checksum(sql),
        })
    }
}

/// Split a tag into its timestamp and name. `None` unless the tag starts with
/// fourteen digits and an underscore.
pub fn parse_tag(tag: &str) -> Option<(&str, &str)> {
    let (timestamp, name) = tag.split_once('_')?;
    if timestamp.len() == 14 && timestamp.chars().all(|c| c.is_ascii_digit()) && !name.is_empty() {
        Some((timestamp, name))
    } else {
        None
    }
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "migration".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Ddl, Dialect, Table};

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("20231215120000_create_users"),
            Some(("20231215120000", "create_users"))
        );
        assert_eq!(parse_tag("invalid"), None);
        assert_eq!(parse_tag("abc_test"), None);
    }

    #[test]
    fn test_new_tag() {
        let tag = MigrationFileManager::new_tag("Add users table!");
        let (_, name) = parse_tag(&tag).unwrap();
        assert_eq!(name, "add_users_table");
        assert!(MigrationFileManager::new_tag("  ").ends_with("_migration"));
    }

    #[test]
    fn test_compute_checksum() {
        let a = compute_checksum("CREATE TABLE users();");
        let b = compute_checksum("CREATE TABLE users();");
        let c = compute_checksum("DROP TABLE users;");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_missing_dir_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = MigrationFileManager::new(dir.path().join("missing"));
        assert!(manager.list_migrations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_and_list_in_tag_order() {
        let dir = tempfile::tempdir().unwrap();
        let manager = MigrationFileManager::new(dir.path());

        let first = Snapshot::initial(Dialect::Postgresql, Ddl::empty());
        let second = Snapshot::new(
            Dialect::Postgresql,
            vec![first.id.clone()],
            Ddl::builder().with(Table::new("public", "users")).build(),
        );

        manager
            .write_migration("20250102000000_users", &second, "CREATE TABLE \"users\" ();\n")
            .await
            .unwrap();
        manager
            .write_migration("20250101000000_init", &first, "")
            .await
            .unwrap();
        std::fs::create_dir(dir.path().join("notes")).unwrap();

        let listed = manager.list_migrations().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "init");
        assert_eq!(listed[1].tag, "20250102000000_users");
        assert_eq!(listed[1].checksum, compute_checksum("CREATE TABLE \"users\" ();\n"));

        let snapshots = manager.load_snapshots().await.unwrap();
        assert_eq!(snapshots[1].prev_ids, vec![first.id]);
    }

    #[tokio::test]
    async fn test_write_refuses_existing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let manager = MigrationFileManager::new(dir.path());
        let snapshot = Snapshot::initial(Dialect::Sqlite, Ddl::empty());

        manager
            .write_migration("20250101000000_init", &snapshot, "")
            .await
            .unwrap();
        assert!(
            manager
                .write_migration("20250101000000_init", &snapshot, "")
                .await
                .is_err()
        );
    }
}
