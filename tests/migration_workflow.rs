//! Integration tests for the migration workflow.
//!
//! A migrations folder is grown through the engine the way `ddlkit
//! generate` does it, including branches and merges.

use ddlkit::migrate::{
    Column, Ddl, Dialect, HeuristicResolver, MigrationConfig, MigrationEngine, MigrationError,
    NoRenames, ORIGIN_ID, Snapshot, Table,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const PG: Dialect = Dialect::Postgresql;

fn engine(dir: &TempDir) -> MigrationEngine {
    MigrationEngine::new(
        MigrationConfig::new()
            .migrations_dir(dir.path().join("migrations"))
            .dialect(PG),
    )
}

fn schema(tables: &[&str]) -> Ddl {
    let mut builder = Ddl::builder();
    for table in tables {
        builder
            .push(Table::new("public", *table))
            .push(Column::new("public", *table, "id", "integer").not_null());
    }
    builder.build()
}

fn with_column(base: Ddl, table: &str, column: &str) -> Ddl {
    let mut builder = Ddl::builder();
    builder.extend(base.list());
    builder
        .with(Column::new("public", table, column, "text"))
        .build()
}

/// Test that each migration chains onto the previous snapshot
#[tokio::test]
async fn test_linear_history() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);

    let first = engine
        .generate("init", &schema(&["users"]), &NoRenames)
        .await
        .unwrap();
    let first_snapshot = first.snapshot().await.unwrap();
    assert_eq!(first_snapshot.prev_ids, vec![ORIGIN_ID.to_string()]);
    assert!(first.sql.contains("CREATE TABLE \"users\""));

    let second = engine
        .generate("posts", &schema(&["users", "posts"]), &NoRenames)
        .await
        .unwrap();
    let second_snapshot = second.snapshot().await.unwrap();
    assert_eq!(second_snapshot.prev_ids, vec![first_snapshot.id.clone()]);
    assert!(second.sql.contains("CREATE TABLE \"posts\""));
    assert!(!second.sql.contains("\"users\""));

    let migrations = engine.files().list_migrations().await.unwrap();
    assert_eq!(migrations.len(), 2);
    assert!(engine.check().await.unwrap().is_empty());
}

/// Test that a rename picked by the resolver is recorded in the snapshot
#[tokio::test]
async fn test_rename_is_recorded() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);

    engine
        .generate("init", &with_column(schema(&["users"]), "users", "email"), &NoRenames)
        .await
        .unwrap();

    let renamed = with_column(schema(&["users"]), "users", "mail");
    let plan = engine.plan(&renamed, &HeuristicResolver).await.unwrap();
    let types: Vec<_> = plan.statements.iter().map(|s| s.type_name()).collect();
    assert_eq!(types, vec!["rename_column"]);
    assert!(plan.data_loss.is_empty());

    let file = engine
        .generate("rename_email", &renamed, &HeuristicResolver)
        .await
        .unwrap();
    assert!(file.sql.contains("RENAME COLUMN \"email\" TO \"mail\""));
    assert_eq!(file.snapshot().await.unwrap().renames.len(), 1);
}

/// Test that dropping a table needs explicit permission
#[tokio::test]
async fn test_data_loss_is_gated() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    engine
        .generate("init", &schema(&["users", "posts"]), &NoRenames)
        .await
        .unwrap();

    let err = engine
        .generate("drop_posts", &schema(&["users"]), &NoRenames)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::DataLoss(_)));
    assert_eq!(engine.files().list_migrations().await.unwrap().len(), 1);

    let permissive = MigrationEngine::new(engine.config().clone().allow_data_loss(true));
    let file = permissive
        .generate("drop_posts", &schema(&["users"]), &NoRenames)
        .await
        .unwrap();
    assert!(file.sql.contains("DROP TABLE \"posts\""));
}

/// Test that commuting branches are merged into a single head
#[tokio::test]
async fn test_commuting_branches_merge() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let root = engine
        .generate("init", &schema(&["users"]), &NoRenames)
        .await
        .unwrap()
        .snapshot()
        .await
        .unwrap();

    let files = engine.files();
    let left = Snapshot::new(PG, vec![root.id.clone()], schema(&["users", "posts"]));
    let right = Snapshot::new(PG, vec![root.id.clone()], schema(&["users", "tags"]));
    files
        .write_migration("20250102000000_posts", &left, "")
        .await
        .unwrap();
    files
        .write_migration("20250102000001_tags", &right, "")
        .await
        .unwrap();

    let merged = schema(&["users", "posts", "tags"]);
    let plan = engine.plan(&merged, &NoRenames).await.unwrap();
    assert!(plan.is_merge());
    assert!(plan.is_empty());
    assert_eq!(plan.base.tables().len(), 3);

    let file = engine.generate("merge", &merged, &NoRenames).await.unwrap();
    let snapshot = file.snapshot().await.unwrap();
    assert!(snapshot.is_merge());
    assert!(engine.check().await.unwrap().is_empty());
}

/// Test that conflicting branches block planning
#[tokio::test]
async fn test_conflicting_branches_block_generate() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    let root = engine
        .generate("init", &with_column(schema(&["users"]), "users", "email"), &NoRenames)
        .await
        .unwrap()
        .snapshot()
        .await
        .unwrap();

    let files = engine.files();
    let dropped = Snapshot::new(PG, vec![root.id.clone()], Ddl::empty());
    let widened = Snapshot::new(
        PG,
        vec![root.id.clone()],
        with_column(
            with_column(schema(&["users"]), "users", "email"),
            "users",
            "name",
        ),
    );
    files
        .write_migration("20250102000000_drop_users", &dropped, "")
        .await
        .unwrap();
    files
        .write_migration("20250102000001_add_name", &widened, "")
        .await
        .unwrap();

    let report = engine.check().await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicts[0].parent_id, root.id);

    let err = engine
        .generate("next", &schema(&["users"]), &NoRenames)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Conflicts(1)));
}

/// Test that snapshot documents survive a write and read
#[tokio::test]
async fn test_snapshot_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshot.json");
    let snapshot = Snapshot::initial(PG, with_column(schema(&["users"]), "users", "email"));

    snapshot.save(&path).await.unwrap();
    let loaded = Snapshot::load(&path).await.unwrap();
    assert_eq!(loaded, snapshot);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["version"], "8");
    assert_eq!(raw["dialect"], "postgresql");
    assert_eq!(raw["ddl"][0]["entityType"], "table");
}

/// Test that a snapshot without a ddl array is rejected
#[test]
fn test_snapshot_without_ddl_is_rejected() {
    let err = Snapshot::from_json(
        r#"{"version": "8", "dialect": "postgresql", "id": "a", "prevId": "b"}"#,
        "inline",
    )
    .unwrap_err();
    assert!(err.to_string().contains("ddl"));
}
