use async_trait::async_trait;
use pretty_assertions::assert_eq;

use super::*;
use crate::ddl::{Column, EnumType, ForeignKey, Index, ReferentialAction, Schema, Table};
use crate::resolver::{HeuristicResolver, HintResolver, NoRenames, Renamed, ResolverOutput};

fn users() -> Ddl {
    Ddl::builder()
        .with(Table::new("public", "users"))
        .with(Column::new("public", "users", "id", "integer").not_null())
        .with(Column::new("public", "users", "email", "text"))
        .with(PrimaryKey {
            schema: "public".into(),
            table: "users".into(),
            name: "users_pkey".into(),
            columns: vec!["id".into()],
        })
        .build()
}

fn types(result: &DiffResult) -> Vec<&'static str> {
    result.statements.iter().map(JsonStatement::type_name).collect()
}

async fn pg(from: &Ddl, to: &Ddl, resolver: &dyn Resolver) -> DiffResult {
    diff(from, to, Dialect::Postgresql, resolver).await.unwrap()
}

#[tokio::test]
async fn test_identical_schemas_have_no_statements() {
    let result = pg(&users(), &users(), &NoRenames).await;
    assert!(result.is_empty());
    assert_eq!(result.summary(), "No changes");
}

#[tokio::test]
async fn test_create_table_folds_columns_and_pk() {
    let result = pg(&Ddl::empty(), &users(), &NoRenames).await;
    assert_eq!(types(&result), vec!["create_table"]);
    match &result.statements[0] {
        JsonStatement::CreateTable { table } => {
            assert_eq!(table.columns.len(), 2);
            assert!(table.pk.is_some());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_drop_table_has_no_column_drops() {
    let result = pg(&users(), &Ddl::empty(), &NoRenames).await;
    assert_eq!(types(&result), vec!["drop_table"]);
    assert_eq!(result.data_loss().len(), 1);
}

#[tokio::test]
async fn test_column_rename_with_heuristic() {
    let to = Ddl::builder()
        .with(Table::new("public", "users"))
        .with(Column::new("public", "users", "id", "integer").not_null())
        .with(Column::new("public", "users", "mail", "text"))
        .with(users().pks()[0].clone())
        .build();

    let renamed = pg(&users(), &to, &HeuristicResolver).await;
    assert_eq!(types(&renamed), vec!["rename_column"]);
    assert_eq!(renamed.renames.len(), 1);
    assert_eq!(renamed.renames[0].to.name, "mail");

    let plain = pg(&users(), &to, &NoRenames).await;
    assert_eq!(types(&plain), vec!["add_column", "drop_column"]);
}

#[tokio::test]
async fn test_table_rename_rewrites_children() {
    let to = Ddl::builder()
        .with(Table::new("public", "people"))
        .with(Column::new("public", "people", "id", "integer").not_null())
        .with(Column::new("public", "people", "email", "text"))
        .with(PrimaryKey {
            schema: "public".into(),
            table: "people".into(),
            name: "users_pkey".into(),
            columns: vec!["id".into()],
        })
        .build();
    let hints = HintResolver::new(vec![RenameHint::new(
        EntityKind::Table,
        EntityKey::in_schema("public", "users"),
        EntityKey::in_schema("public", "people"),
    )]);

    let result = pg(&users(), &to, &hints).await;
    assert_eq!(types(&result), vec!["rename_table"]);
}

#[tokio::test]
async fn test_rename_and_move_emit_both() {
    let from = Ddl::builder()
        .with(Schema::new("auth"))
        .with(Table::new("public", "users"))
        .build();
    let to = Ddl::builder()
        .with(Schema::new("auth"))
        .with(Table::new("auth", "accounts"))
        .build();
    let hints = HintResolver::new(vec![RenameHint::new(
        EntityKind::Table,
        EntityKey::in_schema("public", "users"),
        EntityKey::in_schema("auth", "accounts"),
    )]);

    let result = pg(&from, &to, &hints).await;
    assert_eq!(types(&result), vec!["rename_table", "move_table"]);
    assert_eq!(
        result.statements[1],
        JsonStatement::MoveTable {
            name: "accounts".into(),
            from_schema: "public".into(),
            to_schema: "auth".into(),
        }
    );
}

#[tokio::test]
async fn test_enum_value_appended() {
    let from = Ddl::builder()
        .with(EnumType::new("public", "mood", ["happy", "sad"]))
        .build();
    let to = Ddl::builder()
        .with(EnumType::new("public", "mood", ["happy", "sad", "ok"]))
        .build();

    let result = pg(&from, &to, &NoRenames).await;
    assert_eq!(types(&result), vec!["alter_enum"]);
    assert!(result.data_loss().is_empty());
}

#[tokio::test]
async fn test_fk_comes_after_both_tables() {
    let to = Ddl::builder()
        .with(Table::new("public", "posts"))
        .with(Column::new("public", "posts", "author_id", "integer"))
        .with(ForeignKey {
            schema: "public".into(),
            table: "posts".into(),
            name: "posts_author_fk".into(),
            columns: vec!["author_id".into()],
            schema_to: "public".into(),
            table_to: "users".into(),
            columns_to: vec!["id".into()],
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::Cascade,
        })
        .with_all(users().list())
        .build();

    let result = pg(&Ddl::empty(), &to, &NoRenames).await;
    assert_eq!(types(&result), vec!["create_table", "create_table", "create_fk"]);
}

#[tokio::test]
async fn test_invalid_input_yields_errors_only() {
    let broken = Ddl::builder()
        .with(Column::new("public", "ghost", "id", "integer"))
        .build();
    let result = pg(&Ddl::empty(), &broken, &NoRenames).await;
    assert!(!result.is_usable());
    assert!(result.statements.is_empty());
    assert_eq!(result.errors[0].side, DdlSide::To);
}

#[tokio::test]
async fn test_index_change_is_recreated() {
    let from = Ddl::builder()
        .with_all(users().list())
        .with(Index::new("public", "users", "users_email_idx", ["email"]))
        .build();
    let to = Ddl::builder()
        .with_all(users().list())
        .with(Index::new("public", "users", "users_email_idx", ["email"]).unique())
        .build();

    let result = pg(&from, &to, &NoRenames).await;
    assert_eq!(types(&result), vec!["recreate_index"]);
}

#[tokio::test]
async fn test_sqlite_collapses_into_recreate_table() {
    let to = Ddl::builder()
        .with(Table::new("public", "users"))
        .with(Column::new("public", "users", "id", "integer").not_null())
        .with(Column::new("public", "users", "email", "text").not_null())
        .with(users().pks()[0].clone())
        .build();

    let result = diff(&users(), &to, Dialect::Sqlite, &NoRenames).await.unwrap();
    assert_eq!(types(&result), vec!["recreate_table"]);
}

struct Liar;

#[async_trait]
impl Resolver for Liar {
    async fn resolve(&self, _kind: EntityKind, input: ResolverInput) -> MigrateResult<ResolverOutput> {
        // Claims a rename but forgets the remaining created entity.
        Ok(ResolverOutput {
            created: Vec::new(),
            deleted: Vec::new(),
            renamed: vec![Renamed {
                from: input.deleted[0].clone(),
                to: input.created[0].clone(),
            }],
        })
    }
}

#[tokio::test]
async fn test_resolver_contract_violation_fails() {
    let to = Ddl::builder()
        .with(Table::new("public", "users"))
        .with(Column::new("public", "users", "id", "integer").not_null())
        .with(Column::new("public", "users", "mail", "text"))
        .with(Column::new("public", "users", "age", "integer"))
        .with(users().pks()[0].clone())
        .build();

    let err = diff(&users(), &to, Dialect::Postgresql, &Liar)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::ResolverContract { .. }));
    assert!(err.to_string().contains("age"));
}
