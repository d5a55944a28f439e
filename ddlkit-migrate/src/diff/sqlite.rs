//! SQLite statement collapsing.
//!
//! SQLite's `ALTER TABLE` covers table and column renames and plain column
//! additions only. Any other change to an existing table becomes one
//! `recreate_table`, and foreign keys of new tables move inline into
//! `create_table`. Index renames become a drop and a create.

use std::collections::BTreeSet;

use tracing::debug;

use crate::ddl::{Ddl, GeneratedKind};
use crate::statement::{FullTable, JsonStatement};

use super::order;

type TableRef = (String, String);
type IndexRef = (String, String, String);

pub(super) fn collapse(statements: Vec<JsonStatement>, from: &Ddl, to: &Ddl) -> Vec<JsonStatement> {
    let statements = inline_foreign_keys(split_index_renames(statements, from, to));

    let rebuild: BTreeSet<TableRef> = statements
        .iter()
        .filter(|s| needs_rebuild(s))
        .filter_map(|s| s.table().map(|(schema, table)| (schema.to_string(), table.to_string())))
        .filter(|(schema, table)| from.table(schema, table).is_some() && to.table(schema, table).is_some())
        .collect();
    if rebuild.is_empty() {
        return statements;
    }

    let mut out: Vec<JsonStatement> = statements
        .into_iter()
        .filter(|s| {
            !(is_table_body(s)
                && s.table()
                    .is_some_and(|(schema, table)| rebuild.contains(&(schema.to_string(), table.to_string()))))
        })
        .collect();

    for (schema, name) in &rebuild {
        let (Some(old), Some(new)) = (from.table(schema, name), to.table(schema, name)) else {
            continue;
        };
        debug!(table = %name, "Rebuilding table");
        out.push(JsonStatement::RecreateTable {
            from: FullTable::from_ddl(from, old).with_dependents(from),
            to: FullTable::from_ddl(to, new).with_dependents(to),
        });
    }
    order::sort(&mut out);
    out
}

/// Replace each `rename_index` with a drop under the old name and a create
/// of the target definition. A `recreate_index` of the same index is
/// subsumed by that create.
fn split_index_renames(statements: Vec<JsonStatement>, from: &Ddl, to: &Ddl) -> Vec<JsonStatement> {
    let renamed: BTreeSet<IndexRef> = statements
        .iter()
        .filter_map(|s| match s {
            JsonStatement::RenameIndex { schema, table, to, .. } => {
                Some((schema.clone(), table.clone(), to.clone()))
            }
            _ => None,
        })
        .collect();
    if renamed.is_empty() {
        return statements;
    }

    let mut out = Vec::with_capacity(statements.len() + renamed.len());
    for statement in statements {
        match statement {
            JsonStatement::RenameIndex {
                schema,
                table,
                from: old_name,
                to: new_name,
            } => {
                let find = |ddl: &Ddl| {
                    ddl.indexes_of(&schema, &table)
                        .find(|i| i.name == new_name)
                        .cloned()
                };
                match (find(from), find(to)) {
                    (Some(mut dropped), Some(created)) => {
                        debug!(from = %old_name, to = %new_name, "Splitting index rename");
                        dropped.name = old_name;
                        out.push(JsonStatement::DropIndex { index: dropped });
                        out.push(JsonStatement::CreateIndex { index: created });
                    }
                    _ => out.push(JsonStatement::RenameIndex {
                        schema,
                        table,
                        from: old_name,
                        to: new_name,
                    }),
                }
            }
            JsonStatement::RecreateIndex { to: index, .. }
                if renamed.contains(&(index.schema.clone(), index.table.clone(), index.name.clone())) => {}
            other => out.push(other),
        }
    }
    order::sort(&mut out);
    out
}

fn inline_foreign_keys(statements: Vec<JsonStatement>) -> Vec<JsonStatement> {
    let created: BTreeSet<TableRef> = statements
        .iter()
        .filter_map(|s| match s {
            JsonStatement::CreateTable { table } => Some((table.schema.clone(), table.name.clone())),
            _ => None,
        })
        .collect();

    let (inline, mut rest): (Vec<_>, Vec<_>) = statements.into_iter().partition(|s| {
        matches!(s, JsonStatement::CreateFk { fk } if created.contains(&(fk.schema.clone(), fk.table.clone())))
    });

    for statement in inline {
        let JsonStatement::CreateFk { fk } = statement else {
            continue;
        };
        let owner = rest.iter_mut().find_map(|s| match s {
            JsonStatement::CreateTable { table } if table.schema == fk.schema && table.name == fk.table => {
                Some(table)
            }
            _ => None,
        });
        if let Some(table) = owner {
            table.fks.push(fk);
        }
    }
    rest
}

fn needs_rebuild(statement: &JsonStatement) -> bool {
    use JsonStatement::*;

    match statement {
        AddColumn { column } => {
            (column.not_null && column.default.is_none())
                || column
                    .generated
                    .as_ref()
                    .is_some_and(|g| g.kind == GeneratedKind::Stored)
        }
        AlterColumn { .. }
        | RecreateColumn { .. }
        | AddPk { .. }
        | DropPk { .. }
        | AlterPk { .. }
        | AddUnique { .. }
        | DropUnique { .. }
        | AlterUnique { .. }
        | AddCheck { .. }
        | DropCheck { .. }
        | AlterCheck { .. }
        | CreateFk { .. }
        | DropFk { .. }
        | RecreateFk { .. }
        | RenameConstraint { .. } => true,
        _ => false,
    }
}

/// Statements subsumed by a rebuild of their table.
fn is_table_body(statement: &JsonStatement) -> bool {
    use JsonStatement::*;

    needs_rebuild(statement)
        || matches!(
            statement,
            AddColumn { .. }
                | DropColumn { .. }
                | CreateIndex { .. }
                | DropIndex { .. }
                | RecreateIndex { .. }
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Column, ForeignKey, ReferentialAction, Table};

    fn fk(table: &str, target: &str) -> ForeignKey {
        ForeignKey {
            schema: "public".into(),
            table: table.into(),
            name: format!("{}_{}_fk", table, target),
            columns: vec![format!("{}_id", target)],
            schema_to: "public".into(),
            table_to: target.into(),
            columns_to: vec!["id".into()],
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
        }
    }

    fn users(extra: Option<Column>) -> Ddl {
        let mut builder = Ddl::builder();
        builder
            .push(Table::new("public", "users"))
            .push(Column::new("public", "users", "id", "integer").not_null())
            .push(Column::new("public", "users", "name", "text"));
        if let Some(column) = extra {
            builder.push(column);
        }
        builder.build()
    }

    #[test]
    fn test_fk_of_new_table_is_inlined() {
        let ddl = Ddl::builder()
            .with(Table::new("public", "posts"))
            .with(Column::new("public", "posts", "users_id", "integer"))
            .build();
        let table = ddl.tables()[0].clone();
        let statements = vec![
            JsonStatement::CreateTable {
                table: FullTable::from_ddl(&ddl, &table),
            },
            JsonStatement::CreateFk {
                fk: fk("posts", "users"),
            },
        ];
        let out = collapse(statements, &Ddl::empty(), &ddl);
        assert_eq!(out.len(), 1);
        match &out[0] {
            JsonStatement::CreateTable { table } => assert_eq!(table.fks.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_alter_column_becomes_recreate() {
        let from = users(None);
        let to = users(Some(Column::new("public", "users", "age", "integer")));
        let name = from.columns()[1].clone();

        let statements = vec![
            JsonStatement::AddColumn {
                column: Column::new("public", "users", "age", "integer"),
            },
            JsonStatement::AlterColumn {
                from: name.clone(),
                to: name.not_null(),
                diff: vec![],
            },
        ];
        let out = collapse(statements, &from, &to);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].type_name(), "recreate_table");
    }

    #[test]
    fn test_nullable_add_column_stays() {
        let from = users(None);
        let to = users(Some(Column::new("public", "users", "age", "integer")));
        let statements = vec![JsonStatement::AddColumn {
            column: Column::new("public", "users", "age", "integer"),
        }];
        let out = collapse(statements.clone(), &from, &to);
        assert_eq!(out, statements);
    }
}
