//! Execution order of statements.
//!
//! Referents are created before their dependents, drops run innermost
//! first. Statements in the same phase keep their emission order.

use crate::statement::JsonStatement;

/// Priority bucket of a statement. Lower runs first.
pub fn phase(statement: &JsonStatement) -> u8 {
    use JsonStatement::*;

    match statement {
        CreateSchema { .. } => 0,
        RenameSchema { .. } => 1,

        CreateRole { .. } => 2,
        RenameRole { .. } => 3,
        AlterRole { .. } => 4,

        CreateEnum { .. } => 5,
        RenameEnum { .. } => 6,
        MoveEnum { .. } => 7,
        AlterEnum { .. } => 8,
        CreateSequence { .. } => 9,
        RenameSequence { .. } => 10,
        MoveSequence { .. } => 11,
        AlterSequence { .. } => 12,

        RenameTable { .. } => 13,
        MoveTable { .. } => 14,
        CreateTable { .. } => 15,

        RenameColumn { .. } => 17,
        AddColumn { .. } => 18,
        RecreateEnum { .. } => 19,
        AlterColumn { .. } => 20,
        RecreateColumn { .. } => 21,
        RecreateTable { .. } => 22,

        RenameIndex { .. } | RenameConstraint { .. } => 23,
        AddPk { .. } | AlterPk { .. } => 24,
        AddUnique { .. } | AlterUnique { .. } => 25,
        AddCheck { .. } | AlterCheck { .. } => 26,
        CreateIndex { .. } | RecreateIndex { .. } => 27,
        CreateFk { .. } | RecreateFk { .. } => 28,

        RenameView { .. } => 30,
        MoveView { .. } => 31,
        CreateView { .. } => 32,
        AlterView { .. } | RecreateView { .. } => 33,

        AlterRls { .. } => 35,
        RenamePolicy { .. } => 36,
        CreatePolicy { .. } => 37,
        AlterPolicy { .. } | RecreatePolicy { .. } => 38,

        RevokePrivilege { .. } => 40,
        GrantPrivilege { .. } => 41,

        DropPolicy { .. } => 50,
        DropView { .. } => 51,
        DropFk { .. } => 52,
        DropIndex { .. } => 53,
        DropUnique { .. } => 54,
        DropCheck { .. } => 55,
        DropPk { .. } => 56,
        DropColumn { .. } => 57,
        DropTable { .. } => 58,
        DropEnum { .. } => 59,
        DropSequence { .. } => 60,
        DropRole { .. } => 61,
        DropSchema { .. } => 62,
    }
}

/// Stable sort by [`phase`].
pub fn sort(statements: &mut [JsonStatement]) {
    statements.sort_by_key(phase);
}

/// Move every `drop_index` whose name is taken again by an earlier
/// `create_index` or `rename_index` in the same schema to just before the
/// first such statement. Only matters where index names are unique per
/// schema rather than per table.
pub fn release_index_names(statements: &mut Vec<JsonStatement>) {
    fn claimed(statement: &JsonStatement) -> Option<(&str, &str)> {
        match statement {
            JsonStatement::CreateIndex { index } => Some((index.schema.as_str(), index.name.as_str())),
            JsonStatement::RenameIndex { schema, to, .. } => Some((schema.as_str(), to.as_str())),
            _ => None,
        }
    }

    let mut i = 0;
    while i < statements.len() {
        let first = match &statements[i] {
            JsonStatement::DropIndex { index } => statements[..i]
                .iter()
                .position(|s| claimed(s) == Some((index.schema.as_str(), index.name.as_str()))),
            _ => None,
        };
        if let Some(first) = first {
            let drop = statements.remove(i);
            statements.insert(first, drop);
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Column, ForeignKey, Index, ReferentialAction, Table};
    use crate::statement::FullTable;

    fn fk() -> ForeignKey {
        ForeignKey {
            schema: "public".into(),
            table: "posts".into(),
            name: "posts_author_fk".into(),
            columns: vec!["author_id".into()],
            schema_to: "public".into(),
            table_to: "users".into(),
            columns_to: vec!["id".into()],
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::Cascade,
        }
    }

    #[test]
    fn test_creates_before_drops() {
        let table = FullTable::from_ddl(&Default::default(), &Table::new("public", "users"));
        let mut statements = vec![
            JsonStatement::DropSchema { name: "old".into() },
            JsonStatement::CreateFk { fk: fk() },
            JsonStatement::DropColumn {
                column: Column::new("public", "users", "legacy", "text"),
            },
            JsonStatement::CreateTable { table },
            JsonStatement::CreateSchema { name: "auth".into() },
        ];
        sort(&mut statements);

        let types: Vec<_> = statements.iter().map(JsonStatement::type_name).collect();
        assert_eq!(
            types,
            vec![
                "create_schema",
                "create_table",
                "create_fk",
                "drop_column",
                "drop_schema"
            ]
        );
    }

    #[test]
    fn test_ties_keep_emission_order() {
        let mut statements = vec![
            JsonStatement::CreateSchema { name: "b".into() },
            JsonStatement::CreateSchema { name: "a".into() },
        ];
        sort(&mut statements);
        assert_eq!(
            statements[0],
            JsonStatement::CreateSchema { name: "b".into() }
        );
    }

    #[test]
    fn test_reused_index_name_is_dropped_first() {
        let mut statements = vec![
            JsonStatement::CreateIndex {
                index: Index::new("public", "b", "x_idx", ["x"]),
            },
            JsonStatement::CreateIndex {
                index: Index::new("public", "b", "y_idx", ["y"]),
            },
            JsonStatement::DropIndex {
                index: Index::new("public", "a", "z_idx", ["z"]),
            },
            JsonStatement::DropIndex {
                index: Index::new("public", "a", "x_idx", ["x"]),
            },
        ];
        release_index_names(&mut statements);

        let order: Vec<_> = statements
            .iter()
            .map(|s| match s {
                JsonStatement::CreateIndex { index } => format!("+{}.{}", index.table, index.name),
                JsonStatement::DropIndex { index } => format!("-{}.{}", index.table, index.name),
                other => other.type_name().to_string(),
            })
            .collect();
        assert_eq!(order, vec!["-a.x_idx", "+b.x_idx", "+b.y_idx", "-a.z_idx"]);
    }

    #[test]
    fn test_same_name_in_other_schema_is_left_alone() {
        let mut statements = vec![
            JsonStatement::CreateIndex {
                index: Index::new("auth", "b", "x_idx", ["x"]),
            },
            JsonStatement::DropIndex {
                index: Index::new("public", "a", "x_idx", ["x"]),
            },
        ];
        let before = statements.clone();
        release_index_names(&mut statements);
        assert_eq!(statements, before);
    }

    #[test]
    fn test_fk_drop_precedes_table_drop() {
        let drop_fk = JsonStatement::DropFk { fk: fk() };
        let table = FullTable::from_ddl(&Default::default(), &Table::new("public", "users"));
        let drop_table = JsonStatement::DropTable { table };
        assert!(phase(&drop_fk) < phase(&drop_table));
    }
}
