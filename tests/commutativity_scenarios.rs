//! Integration tests for branch conflict detection.
//!
//! Snapshots are written to a temporary directory and analyzed the same
//! way `ddlkit check` reads a migrations folder.

use ddlkit::migrate::{
    Column, Ddl, Dialect, EnumType, FieldChange, FullTable, JsonStatement, MigrationError,
    ORIGIN_ID, Privilege, PrivilegeType, Schema, Snapshot, Table, detect_non_commutative,
    explain_conflicts,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

const PG: Dialect = Dialect::Postgresql;

fn users(email_not_null: bool) -> Ddl {
    let email = Column::new("public", "users", "email", "text");
    Ddl::builder()
        .with(Table::new("public", "users"))
        .with(Column::new("public", "users", "id", "integer").not_null())
        .with(if email_not_null { email.not_null() } else { email })
        .build()
}

fn with_posts(base: Ddl) -> Ddl {
    let mut builder = Ddl::builder();
    builder.extend(base.list());
    builder
        .with(Table::new("public", "posts"))
        .with(Column::new("public", "posts", "id", "integer").not_null())
        .build()
}

/// Writes snapshots into one folder each and returns the file paths.
struct History {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl History {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            files: Vec::new(),
        }
    }

    async fn push(&mut self, id: &str, parents: &[&str], ddl: Ddl) {
        let prev_ids = parents.iter().map(|p| p.to_string()).collect();
        let path = self.dir.path().join(id).join("snapshot.json");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        Snapshot::new(PG, prev_ids, ddl)
            .with_id(id)
            .save(&path)
            .await
            .unwrap();
        self.files.push(path);
    }
}

fn table_of(ddl: &Ddl, name: &str) -> FullTable {
    FullTable::from_ddl(ddl, ddl.table("public", name).unwrap())
}

fn alter_not_null(table: &str, column: &str) -> JsonStatement {
    let from = Column::new("public", table, column, "text");
    let to = from.clone().not_null();
    JsonStatement::AlterColumn {
        from,
        to,
        diff: vec![FieldChange::new(
            "notNull",
            Some("false".into()),
            Some("true".into()),
        )],
    }
}

fn privilege(grantee: &str) -> Privilege {
    Privilege::new("public", "t", grantee, PrivilegeType::Select)
}

/// Test that both branches touching users.email nullability conflict
#[tokio::test]
async fn test_same_column_altered_on_both_branches() {
    let mut history = History::new();
    history.push("p1", &[ORIGIN_ID], users(false)).await;
    history.push("a1", &["p1"], users(true)).await;
    history.push("b1", &["p1"], with_posts(users(true))).await;

    let report = detect_non_commutative(&history.files, PG).await.unwrap();
    assert!(!report.is_empty());
    assert_eq!(report.conflicts[0].parent_id, "p1");
}

/// Test that a dropped table conflicts with a column change on it
#[tokio::test]
async fn test_table_drop_against_column_alter() {
    let mut history = History::new();
    history.push("p1", &[ORIGIN_ID], users(false)).await;
    history.push("a1", &["p1"], Ddl::empty()).await;
    history.push("b1", &["p1"], users(true)).await;

    let report = detect_non_commutative(&history.files, PG).await.unwrap();
    assert_eq!(report.len(), 1);

    let conflict = &report.conflicts[0];
    assert_eq!(conflict.branch_a.head_id, "a1");
    assert_eq!(conflict.branch_b.head_id, "b1");
    assert_eq!(conflict.branch_a.statement.type_name(), "drop_table");
    assert_eq!(conflict.branch_b.statement.type_name(), "alter_column");
}

/// Test that independent tables from an empty parent commute
#[tokio::test]
async fn test_disjoint_tables_commute() {
    let posts = Ddl::builder()
        .with(Table::new("public", "posts"))
        .with(Column::new("public", "posts", "id", "integer"))
        .build();

    let mut history = History::new();
    history.push("p1", &[ORIGIN_ID], Ddl::empty()).await;
    history.push("a1", &["p1"], users(false)).await;
    history.push("b1", &["p1"], posts).await;

    let report = detect_non_commutative(&history.files, PG).await.unwrap();
    assert!(report.is_empty());
    assert_eq!(report.summary(), "All branches commute");
}

/// Test that a conflict several migrations deep is still found
#[tokio::test]
async fn test_conflict_deep_in_branch() {
    let mut history = History::new();
    history.push("p1", &[ORIGIN_ID], users(false)).await;
    history.push("a1", &["p1"], with_posts(users(false))).await;
    history.push("a2", &["a1"], with_posts(Ddl::builder().build())).await;
    history.push("b1", &["p1"], users(true)).await;

    let report = detect_non_commutative(&history.files, PG).await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicts[0].branch_a.head_id, "a2");
    assert_eq!(report.conflicts[0].branch_b.head_id, "b1");
}

/// Test that each pair of leaves under a three-way branch is compared
#[tokio::test]
async fn test_three_way_branch() {
    let mut history = History::new();
    history.push("p1", &[ORIGIN_ID], users(false)).await;
    history.push("a1", &["p1"], users(true)).await;
    history.push("b1", &["p1"], users(true)).await;
    history.push("c1", &["p1"], with_posts(users(false))).await;

    let report = detect_non_commutative(&history.files, PG).await.unwrap();
    let pairs: Vec<(&str, &str)> = report
        .conflicts
        .iter()
        .map(|c| (c.branch_a.head_id.as_str(), c.branch_b.head_id.as_str()))
        .collect();
    assert_eq!(pairs, vec![("a1", "b1")]);
}

/// Test that branches already merged back together are not reported
#[tokio::test]
async fn test_merged_branches_are_skipped() {
    let mut history = History::new();
    history.push("p1", &[ORIGIN_ID], users(false)).await;
    history.push("a1", &["p1"], users(true)).await;
    history.push("b1", &["p1"], with_posts(users(false))).await;
    history.push("m1", &["a1", "b1"], with_posts(users(true))).await;

    let report = detect_non_commutative(&history.files, PG).await.unwrap();
    assert!(report.is_empty());
}

/// Test that a cycle in the lineage fails the whole analysis
#[tokio::test]
async fn test_cycle_is_rejected() {
    let mut history = History::new();
    history.push("a1", &["b1"], Ddl::empty()).await;
    history.push("b1", &["a1"], Ddl::empty()).await;

    let err = detect_non_commutative(&history.files, PG).await.unwrap_err();
    assert!(matches!(err, MigrationError::Lineage(_)));
    assert!(err.to_string().contains("cycle"));
}

/// Test that a dangling parent reference fails the analysis
#[tokio::test]
async fn test_unknown_parent_is_rejected() {
    let mut history = History::new();
    history.push("a1", &["missing"], Ddl::empty()).await;

    let err = detect_non_commutative(&history.files, PG).await.unwrap_err();
    assert!(err.to_string().contains("missing"));
}

/// Test the drop-table rule directly
#[test]
fn test_explain_drop_table_against_alter_column() {
    let ddl = Ddl::builder()
        .with(Table::new("public", "t"))
        .with(Column::new("public", "t", "c", "text"))
        .build();
    let reasons = explain_conflicts(
        &[JsonStatement::DropTable {
            table: table_of(&ddl, "t"),
        }],
        &[alter_not_null("t", "c")],
    );
    assert!(reasons.iter().any(|r| r.contains("Dropping a table conflicts")));
}

/// Test that two identical column changes are flagged
#[test]
fn test_explain_identical_alters() {
    let reasons = explain_conflicts(&[alter_not_null("t", "c")], &[alter_not_null("t", "c")]);
    assert!(reasons.iter().any(|r| r.contains("identical operations")));
}

/// Test that grant and revoke for different grantees commute
#[test]
fn test_explain_grant_revoke_different_grantee() {
    let reasons = explain_conflicts(
        &[JsonStatement::GrantPrivilege {
            privilege: privilege("user1"),
        }],
        &[JsonStatement::RevokePrivilege {
            privilege: privilege("user2"),
        }],
    );
    assert!(reasons.is_empty());

    let same = explain_conflicts(
        &[JsonStatement::GrantPrivilege {
            privilege: privilege("user1"),
        }],
        &[JsonStatement::RevokePrivilege {
            privilege: privilege("user1"),
        }],
    );
    assert_eq!(same.len(), 1);
}

/// Test that unrelated statements never conflict
#[test]
fn test_explain_defaults_to_commutative() {
    let ddl = Ddl::builder()
        .with(Table::new("public", "a"))
        .with(Table::new("public", "b"))
        .build();
    let left = vec![
        JsonStatement::CreateTable {
            table: table_of(&ddl, "a"),
        },
        JsonStatement::CreateSchema {
            name: "billing".into(),
        },
    ];
    let right = vec![
        JsonStatement::CreateTable {
            table: table_of(&ddl, "b"),
        },
        JsonStatement::CreateEnum {
            enum_type: EnumType::new("public", "mood", ["ok"]),
        },
    ];
    assert!(explain_conflicts(&left, &right).is_empty());
    assert!(explain_conflicts(&right, &left).is_empty());
}

/// Test that swapping the inputs flags the same pairs
#[test]
fn test_explain_is_symmetric() {
    let ddl = Ddl::builder()
        .with(Table::new("public", "t"))
        .with(Schema::new("auth"))
        .build();
    let a = vec![
        JsonStatement::DropTable {
            table: table_of(&ddl, "t"),
        },
        JsonStatement::DropSchema {
            name: "auth".into(),
        },
    ];
    let b = vec![
        alter_not_null("t", "c"),
        JsonStatement::CreateTable {
            table: FullTable {
                schema: "auth".into(),
                ..table_of(&ddl, "t")
            },
        },
    ];
    assert_eq!(explain_conflicts(&a, &b).len(), explain_conflicts(&b, &a).len());
    assert_eq!(explain_conflicts(&a, &b).len(), 2);
}
