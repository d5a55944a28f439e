//! Commutativity analysis of migration branches.
//!
//! Two branches commute when applying their changes in either order against
//! their common ancestor gives the same, conflict-free result. The analyzer
//! finds every branch point in a snapshot lineage, diffs each leaf below it
//! against the branch point and compares the statement lists pairwise with
//! [`explain_conflicts`].
//!
//! Pairs no rule covers are assumed to commute.

mod footprint;
mod lineage;

pub use footprint::{Access, Footprint, Resource, conflict_reason};
pub use lineage::Lineage;

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::ddl::Dialect;
use crate::diff::{DiffResult, diff};
use crate::error::{MigrateResult, MigrationError};
use crate::resolver::HintResolver;
use crate::snapshot::Snapshot;
use crate::statement::JsonStatement;

/// Reasons every cross pair of `a` and `b` fails to commute. Pure; an empty
/// list means the two lists commute.
pub fn explain_conflicts(a: &[JsonStatement], b: &[JsonStatement]) -> Vec<String> {
    let mut reasons = Vec::new();
    for sa in a {
        for sb in b {
            if let Some(reason) = conflict_reason(sa, sb) {
                reasons.push(reason);
            }
        }
    }
    reasons
}

/// One side of a conflicting branch pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchHead {
    /// Leaf snapshot of the branch.
    pub head_id: String,
    /// First statement of this branch involved in a conflict.
    pub statement: JsonStatement,
}

/// Two branches below the same parent that do not commute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub parent_id: String,
    pub branch_a: BranchHead,
    pub branch_b: BranchHead,
    /// Every reason found, in statement order.
    pub reasons: Vec<String>,
}

/// Outcome of an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    /// Check if no conflicts were found.
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicting branch pairs.
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Human readable summary, one block per conflict.
    pub fn summary(&self) -> String {
        if self.conflicts.is_empty() {
            return "All branches commute".to_string();
        }
        let mut out = format!(
            "{} non-commutative branch pair(s)",
            self.conflicts.len()
        );
        for conflict in &self.conflicts {
            out.push_str(&format!(
                "\n\n{} and {} (branched from {}):",
                conflict.branch_a.head_id, conflict.branch_b.head_id, conflict.parent_id
            ));
            for reason in &conflict.reasons {
                out.push_str(&format!("\n  - {}", reason));
            }
        }
        out
    }
}

/// Load snapshot files and analyze their lineage. File order does not
/// matter; the graph comes from the `prevIds` inside the files.
#[instrument(skip(paths), fields(files = paths.len()))]
pub async fn detect_non_commutative<P: AsRef<Path>>(
    paths: &[P],
    dialect: Dialect,
) -> MigrateResult<ConflictReport> {
    let mut snapshots = Vec::with_capacity(paths.len());
    for path in paths {
        snapshots.push(Snapshot::load(path).await?);
    }
    let lineage = Lineage::build(snapshots, dialect)?;
    analyze_lineage(&lineage, dialect).await
}

/// Analyze an already built lineage.
///
/// For every branch point, each pair of leaves descending from distinct
/// children is compared. Leaves reachable from both children sit below a
/// merge of the two sides and are skipped.
pub async fn analyze_lineage(lineage: &Lineage, dialect: Dialect) -> MigrateResult<ConflictReport> {
    let mut diffs: HashMap<(String, String), Vec<JsonStatement>> = HashMap::new();
    let mut report = ConflictReport::default();

    for parent in lineage.branch_points() {
        let children = lineage.children(parent);
        debug!(parent, children = children.len(), "Checking branch point");

        for (i, left) in children.iter().enumerate() {
            for right in &children[i + 1..] {
                let below_left = lineage.descendants(left);
                let below_right = lineage.descendants(right);
                let heads_a: Vec<&str> = lineage
                    .leaves(left)
                    .into_iter()
                    .filter(|l| !below_right.contains(l))
                    .collect();
                let heads_b: Vec<&str> = lineage
                    .leaves(right)
                    .into_iter()
                    .filter(|l| !below_left.contains(l))
                    .collect();

                for head_a in &heads_a {
                    for head_b in &heads_b {
                        let a = branch_diff(lineage, dialect, parent, head_a, &mut diffs).await?;
                        let b = branch_diff(lineage, dialect, parent, head_b, &mut diffs).await?;
                        if let Some(conflict) = compare(parent, head_a, &a, head_b, &b) {
                            report.conflicts.push(conflict);
                        }
                    }
                }
            }
        }
    }

    info!(conflicts = report.len(), "Commutativity analysis complete");
    Ok(report)
}

/// Diff from `parent` to `head`, replaying the renames recorded on the way.
async fn branch_diff(
    lineage: &Lineage,
    dialect: Dialect,
    parent: &str,
    head: &str,
    cache: &mut HashMap<(String, String), Vec<JsonStatement>>,
) -> MigrateResult<Vec<JsonStatement>> {
    let key = (parent.to_string(), head.to_string());
    if let Some(statements) = cache.get(&key) {
        return Ok(statements.clone());
    }

    let resolver = HintResolver::new(lineage.path_renames(parent, head));
    let DiffResult {
        statements, errors, ..
    } = diff(lineage.ddl(parent), lineage.ddl(head), dialect, &resolver).await?;
    if !errors.is_empty() {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(MigrationError::invalid_snapshot(
            format!("{} (from {})", head, parent),
            message,
        ));
    }

    cache.insert(key, statements.clone());
    Ok(statements)
}

fn compare(
    parent: &str,
    head_a: &str,
    a: &[JsonStatement],
    head_b: &str,
    b: &[JsonStatement],
) -> Option<Conflict> {
    let mut first: Option<(&JsonStatement, &JsonStatement)> = None;
    let mut reasons = Vec::new();
    for sa in a {
        for sb in b {
            if let Some(reason) = conflict_reason(sa, sb) {
                first.get_or_insert((sa, sb));
                reasons.push(reason);
            }
        }
    }

    let (sa, sb) = first?;
    Some(Conflict {
        parent_id: parent.to_string(),
        branch_a: BranchHead {
            head_id: head_a.to_string(),
            statement: sa.clone(),
        },
        branch_b: BranchHead {
            head_id: head_b.to_string(),
            statement: sb.clone(),
        },
        reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Column, Ddl, EntityKey, EntityKind, Privilege, PrivilegeType, Table};
    use crate::snapshot::{ORIGIN_ID, RenameHint};
    use crate::statement::{FieldChange, FullTable};

    fn table(name: &str) -> FullTable {
        let ddl = Ddl::builder().with(Table::new("public", name)).build();
        FullTable::from_ddl(&ddl, &ddl.tables()[0])
    }

    fn alter_email(not_null: bool) -> JsonStatement {
        let from = Column::new("public", "t", "email", "text");
        let to = if not_null { from.clone().not_null() } else { from.clone() };
        JsonStatement::AlterColumn {
            from,
            to,
            diff: vec![FieldChange::new(
                "notNull",
                Some("false".into()),
                Some(not_null.to_string()),
            )],
        }
    }

    #[test]
    fn test_drop_table_vs_alter_column() {
        let reasons = explain_conflicts(
            &[JsonStatement::DropTable { table: table("t") }],
            &[alter_email(true)],
        );
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("Dropping a table conflicts"));
    }

    #[test]
    fn test_same_alter_column_is_identical_operation() {
        let reasons = explain_conflicts(&[alter_email(true)], &[alter_email(true)]);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("identical operations"));
    }

    #[test]
    fn test_grant_vs_revoke_of_other_grantee_commutes() {
        let grant = JsonStatement::GrantPrivilege {
            privilege: Privilege::new("public", "t", "user1", PrivilegeType::Select),
        };
        let revoke = JsonStatement::RevokePrivilege {
            privilege: Privilege::new("public", "t", "user2", PrivilegeType::Select),
        };
        assert!(explain_conflicts(&[grant.clone()], &[revoke]).is_empty());

        let same = JsonStatement::RevokePrivilege {
            privilege: Privilege::new("public", "t", "user1", PrivilegeType::Select),
        };
        let reasons = explain_conflicts(&[grant], &[same]);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].starts_with("Granting and revoking SELECT"));
    }

    #[test]
    fn test_unrelated_statements_commute() {
        let a = [JsonStatement::CreateTable { table: table("users") }];
        let b = [JsonStatement::CreateTable { table: table("posts") }];
        assert!(explain_conflicts(&a, &b).is_empty());
        assert!(explain_conflicts(&b, &a).is_empty());
    }

    #[test]
    fn test_explain_is_symmetric() {
        let statements = vec![
            JsonStatement::DropTable { table: table("t") },
            alter_email(true),
            JsonStatement::CreateSchema { name: "auth".into() },
            JsonStatement::RenameTable {
                schema: "public".into(),
                from: "t".into(),
                to: "u".into(),
            },
            JsonStatement::CreateTable { table: table("u") },
        ];
        for a in &statements {
            for b in &statements {
                assert_eq!(
                    conflict_reason(a, b).is_some(),
                    conflict_reason(b, a).is_some(),
                    "{} vs {}",
                    a.type_name(),
                    b.type_name()
                );
            }
        }
    }

    #[test]
    fn test_report_summary() {
        assert_eq!(ConflictReport::default().summary(), "All branches commute");

        let report = ConflictReport {
            conflicts: vec![Conflict {
                parent_id: "p".into(),
                branch_a: BranchHead {
                    head_id: "a".into(),
                    statement: alter_email(true),
                },
                branch_b: BranchHead {
                    head_id: "b".into(),
                    statement: alter_email(true),
                },
                reasons: vec!["reason".into()],
            }],
        };
        assert!(report.summary().contains("a and b (branched from p)"));
        assert_eq!(report.len(), 1);
    }

    #[tokio::test]
    async fn test_column_rename_survives_later_table_rename() {
        let people = |table: &str, column: &str| {
            Ddl::builder()
                .with(Table::new("public", table))
                .with(Column::new("public", table, "id", "integer"))
                .with(Column::new("public", table, column, "text"))
                .build()
        };
        let lineage = Lineage::build(
            vec![
                Snapshot::new(Dialect::Postgresql, vec![ORIGIN_ID.into()], people("users", "email"))
                    .with_id("p"),
                Snapshot::new(Dialect::Postgresql, vec!["p".into()], people("users", "mail"))
                    .with_id("a1")
                    .with_renames(vec![RenameHint::new(
                        EntityKind::Column,
                        EntityKey::in_table("public", "users", "email"),
                        EntityKey::in_table("public", "users", "mail"),
                    )]),
                Snapshot::new(Dialect::Postgresql, vec!["a1".into()], people("people", "mail"))
                    .with_id("a2")
                    .with_renames(vec![RenameHint::new(
                        EntityKind::Table,
                        EntityKey::in_schema("public", "users"),
                        EntityKey::in_schema("public", "people"),
                    )]),
            ],
            Dialect::Postgresql,
        )
        .unwrap();

        let statements = branch_diff(&lineage, Dialect::Postgresql, "p", "a2", &mut HashMap::new())
            .await
            .unwrap();
        let types: Vec<_> = statements.iter().map(JsonStatement::type_name).collect();
        assert_eq!(types, vec!["rename_table", "rename_column"]);
        assert!(statements.iter().all(|s| s.data_loss_reason().is_none()));
    }

    #[tokio::test]
    async fn test_disjoint_branches_commute() {
        let users = Ddl::builder()
            .with(Table::new("public", "users"))
            .with(Column::new("public", "users", "id", "integer"))
            .build();
        let posts = Ddl::builder()
            .with(Table::new("public", "posts"))
            .with(Column::new("public", "posts", "id", "integer"))
            .build();
        let lineage = Lineage::build(
            vec![
                Snapshot::new(Dialect::Postgresql, vec![ORIGIN_ID.into()], Ddl::empty())
                    .with_id("p"),
                Snapshot::new(Dialect::Postgresql, vec!["p".into()], users).with_id("a"),
                Snapshot::new(Dialect::Postgresql, vec!["p".into()], posts).with_id("b"),
            ],
            Dialect::Postgresql,
        )
        .unwrap();

        let report = analyze_lineage(&lineage, Dialect::Postgresql).await.unwrap();
        assert!(report.is_empty());
    }
}
