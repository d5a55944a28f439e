//! MySQL constraint renames.
//!
//! Only unique constraints can be renamed in place, through their index.
//! Foreign keys and checks are dropped and added again under the new name.
//! Primary keys are always called `PRIMARY`, so renaming one is a no-op.

use std::collections::BTreeSet;

use tracing::debug;

use crate::ddl::{Ddl, EntityKind};
use crate::statement::JsonStatement;

use super::order;

type ConstraintRef = (EntityKind, String, String, String);

pub(super) fn lower_constraint_renames(
    statements: Vec<JsonStatement>,
    from: &Ddl,
    to: &Ddl,
) -> Vec<JsonStatement> {
    let lowered: BTreeSet<ConstraintRef> = statements
        .iter()
        .filter_map(|s| match s {
            JsonStatement::RenameConstraint {
                schema,
                table,
                kind: kind @ (EntityKind::Fk | EntityKind::Check),
                to,
                ..
            } => Some((*kind, schema.clone(), table.clone(), to.clone())),
            _ => None,
        })
        .collect();
    let is_lowered = |kind: EntityKind, schema: &str, table: &str, name: &str| {
        lowered.contains(&(kind, schema.to_string(), table.to_string(), name.to_string()))
    };

    let mut out = Vec::with_capacity(statements.len());
    for statement in statements {
        match statement {
            JsonStatement::RenameConstraint {
                kind: EntityKind::Pk,
                table,
                ..
            } => {
                debug!(table = %table, "Dropping primary key rename");
            }
            JsonStatement::RenameConstraint {
                schema,
                table,
                kind: EntityKind::Fk,
                from: old_name,
                to: new_name,
            } => {
                let find = |ddl: &Ddl| {
                    ddl.fks_of(&schema, &table)
                        .find(|fk| fk.name == new_name)
                        .cloned()
                };
                match (find(from), find(to)) {
                    (Some(mut old), Some(new)) => {
                        old.name = old_name;
                        out.push(JsonStatement::RecreateFk { from: old, to: new });
                    }
                    _ => out.push(JsonStatement::RenameConstraint {
                        schema,
                        table,
                        kind: EntityKind::Fk,
                        from: old_name,
                        to: new_name,
                    }),
                }
            }
            JsonStatement::RenameConstraint {
                schema,
                table,
                kind: EntityKind::Check,
                from: old_name,
                to: new_name,
            } => {
                let find = |ddl: &Ddl| {
                    ddl.checks_of(&schema, &table)
                        .find(|check| check.name == new_name)
                        .cloned()
                };
                match (find(from), find(to)) {
                    (Some(mut old), Some(new)) => {
                        old.name = old_name;
                        out.push(JsonStatement::AlterCheck { from: old, to: new });
                    }
                    _ => out.push(JsonStatement::RenameConstraint {
                        schema,
                        table,
                        kind: EntityKind::Check,
                        from: old_name,
                        to: new_name,
                    }),
                }
            }
            JsonStatement::RecreateFk { to: fk, .. }
                if is_lowered(EntityKind::Fk, &fk.schema, &fk.table, &fk.name) => {}
            JsonStatement::AlterCheck { to: check, .. }
                if is_lowered(EntityKind::Check, &check.schema, &check.table, &check.name) => {}
            other => out.push(other),
        }
    }
    order::sort(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Check, Column, ForeignKey, ReferentialAction, Table};
    use pretty_assertions::assert_eq;

    fn posts(fk_name: &str, check_name: &str) -> Ddl {
        Ddl::builder()
            .with(Table::new("public", "posts"))
            .with(Column::new("public", "posts", "author_id", "int"))
            .with(Check {
                schema: "public".into(),
                table: "posts".into(),
                name: check_name.into(),
                value: "author_id > 0".into(),
            })
            .with(ForeignKey {
                schema: "public".into(),
                table: "posts".into(),
                name: fk_name.into(),
                columns: vec!["author_id".into()],
                schema_to: "public".into(),
                table_to: "users".into(),
                columns_to: vec!["id".into()],
                on_update: ReferentialAction::NoAction,
                on_delete: ReferentialAction::Cascade,
            })
            .build()
    }

    fn rename(kind: EntityKind, from: &str, to: &str) -> JsonStatement {
        JsonStatement::RenameConstraint {
            schema: "public".into(),
            table: "posts".into(),
            kind,
            from: from.into(),
            to: to.into(),
        }
    }

    #[test]
    fn test_fk_and_check_renames_are_recreated() {
        // The working side already carries the new names.
        let work = posts("posts_author_fk", "author_positive");
        let statements = vec![
            rename(EntityKind::Check, "posts_check", "author_positive"),
            rename(EntityKind::Fk, "posts_fk", "posts_author_fk"),
        ];
        let out = lower_constraint_renames(statements, &work, &work);

        let types: Vec<_> = out.iter().map(JsonStatement::type_name).collect();
        assert_eq!(types, vec!["alter_check", "recreate_fk"]);
        match &out[1] {
            JsonStatement::RecreateFk { from, to } => {
                assert_eq!(from.name, "posts_fk");
                assert_eq!(to.name, "posts_author_fk");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pk_rename_is_dropped_and_unique_rename_kept() {
        let work = posts("posts_fk", "posts_check");
        let statements = vec![
            rename(EntityKind::Pk, "posts_pkey", "posts_id"),
            rename(EntityKind::Unique, "posts_u", "posts_author_u"),
        ];
        let out = lower_constraint_renames(statements, &work, &work);
        assert_eq!(out, vec![rename(EntityKind::Unique, "posts_u", "posts_author_u")]);
    }
}
