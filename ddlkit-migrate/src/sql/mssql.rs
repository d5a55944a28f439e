//! Microsoft SQL Server.

use crate::ddl::{Column, DEFAULT_SCHEMA, Dialect, ForeignKey, GeneratedKind, Index, View};
use crate::error::MigrateResult;
use crate::statement::{FieldChange, FullTable, JsonStatement};

use super::{SqlGenerator, quote_literal, quote_with};

const DBO: &str = "dbo";

/// SQL generator for SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlGenerator;

impl MssqlGenerator {
    fn ident(&self, name: &str) -> String {
        quote_with(name, '[', ']')
    }

    fn is_default_schema(schema: &str) -> bool {
        schema == DEFAULT_SCHEMA || schema == DBO
    }

    fn name(&self, schema: &str, name: &str) -> String {
        if Self::is_default_schema(schema) {
            self.ident(name)
        } else {
            format!("{}.{}", self.ident(schema), self.ident(name))
        }
    }

    /// Dotted object path as `sp_rename` expects it.
    fn path<S: AsRef<str>>(&self, parts: &[S]) -> String {
        let mut parts: Vec<&str> = parts.iter().map(AsRef::as_ref).collect();
        if parts.len() > 1 && Self::is_default_schema(parts[0]) {
            parts.remove(0);
        }
        quote_literal(&parts.join("."))
    }

    fn idents(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.ident(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn default_name(column: &Column) -> String {
        format!("{}_{}_default", column.table, column.name)
    }

    fn column_definition(&self, column: &Column) -> String {
        if let Some(generated) = &column.generated {
            let persisted = if generated.kind == GeneratedKind::Stored {
                " PERSISTED"
            } else {
                ""
            };
            return format!(
                "{} AS ({}){}",
                self.ident(&column.name),
                generated.expression,
                persisted
            );
        }

        let mut sql = format!("{} {}", self.ident(&column.name), column.sql_type);
        if let Some(identity) = &column.identity {
            sql.push_str(&format!(
                " IDENTITY({}, {})",
                identity.start_with.as_deref().unwrap_or("1"),
                identity.increment.as_deref().unwrap_or("1")
            ));
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(&format!(
                " CONSTRAINT {} DEFAULT ({})",
                self.ident(&Self::default_name(column)),
                default
            ));
        }
        sql
    }

    fn create_table(&self, table: &FullTable) -> String {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        if let Some(pk) = &table.pk {
            lines.push(format!(
                "CONSTRAINT {} PRIMARY KEY({})",
                self.ident(&pk.name),
                self.idents(&pk.columns)
            ));
        }
        for unique in &table.uniques {
            lines.push(format!(
                "CONSTRAINT {} UNIQUE({})",
                self.ident(&unique.name),
                self.idents(&unique.columns)
            ));
        }
        for check in &table.checks {
            lines.push(format!(
                "CONSTRAINT {} CHECK ({})",
                self.ident(&check.name),
                check.value
            ));
        }
        format!(
            "CREATE TABLE {} (\n\t{}\n);",
            self.name(&table.schema, &table.name),
            lines.join(",\n\t")
        )
    }

    fn alter_table(&self, schema: &str, table: &str, action: String) -> String {
        format!("ALTER TABLE {} {};", self.name(schema, table), action)
    }

    fn add_constraint(&self, schema: &str, table: &str, name: &str, body: String) -> String {
        self.alter_table(
            schema,
            table,
            format!("ADD CONSTRAINT {} {}", self.ident(name), body),
        )
    }

    fn drop_constraint(&self, schema: &str, table: &str, name: &str) -> String {
        self.alter_table(schema, table, format!("DROP CONSTRAINT {}", self.ident(name)))
    }

    fn fk_body(&self, fk: &ForeignKey) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            self.idents(&fk.columns),
            self.name(&fk.schema_to, &fk.table_to),
            self.idents(&fk.columns_to),
            fk.on_delete.as_sql(),
            fk.on_update.as_sql()
        )
    }

    fn drop_column(&self, column: &Column) -> Vec<String> {
        let mut out = Vec::new();
        if column.default.is_some() {
            out.push(self.drop_constraint(
                &column.schema,
                &column.table,
                &Self::default_name(column),
            ));
        }
        out.push(self.alter_table(
            &column.schema,
            &column.table,
            format!("DROP COLUMN {}", self.ident(&column.name)),
        ));
        out
    }

    fn alter_column(
        &self,
        from: &Column,
        to: &Column,
        diff: &[FieldChange],
        statement: &JsonStatement,
    ) -> MigrateResult<Vec<String>> {
        let changed = |field: &str| diff.iter().any(|d| d.field == field);
        if changed("identity") {
            return Err(self.unsupported(statement));
        }

        let mut out = Vec::new();
        if changed("default") && from.default.is_some() {
            out.push(self.drop_constraint(&from.schema, &from.table, &Self::default_name(from)));
        }
        if changed("type") || changed("notNull") {
            out.push(self.alter_table(
                &to.schema,
                &to.table,
                format!(
                    "ALTER COLUMN {} {} {}",
                    self.ident(&to.name),
                    to.sql_type,
                    if to.not_null { "NOT NULL" } else { "NULL" }
                ),
            ));
        }
        if changed("default") {
            if let Some(default) = &to.default {
                out.push(self.add_constraint(
                    &to.schema,
                    &to.table,
                    &Self::default_name(to),
                    format!("DEFAULT ({}) FOR {}", default, self.ident(&to.name)),
                ));
            }
        }
        Ok(out)
    }

    fn create_index(&self, index: &Index) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| {
                let part = self.ident(&c.value);
                if c.asc { part } else { format!("{} DESC", part) }
            })
            .collect();
        let predicate = index
            .where_clause
            .as_deref()
            .map(|w| format!(" WHERE {}", w))
            .unwrap_or_default();
        format!(
            "CREATE {}INDEX {} ON {} ({}){};",
            if index.is_unique { "UNIQUE " } else { "" },
            self.ident(&index.name),
            self.name(&index.schema, &index.table),
            columns.join(", "),
            predicate
        )
    }

    fn drop_index(&self, index: &Index) -> String {
        format!(
            "DROP INDEX {} ON {};",
            self.ident(&index.name),
            self.name(&index.schema, &index.table)
        )
    }

    fn view_body(&self, view: &View) -> String {
        format!(
            "{} AS {}{}",
            self.name(&view.schema, &view.name),
            view.definition.as_deref().unwrap_or_default(),
            if view.check_option.is_some() {
                " WITH CHECK OPTION"
            } else {
                ""
            }
        )
    }

    fn create_view(&self, view: &View, statement: &JsonStatement) -> MigrateResult<String> {
        if view.materialized {
            return Err(self.unsupported(statement));
        }
        Ok(format!("CREATE VIEW {};", self.view_body(view)))
    }

    fn transfer(&self, name: &str, from_schema: &str, to_schema: &str) -> String {
        let to = if to_schema == DEFAULT_SCHEMA { DBO } else { to_schema };
        let from = if from_schema == DEFAULT_SCHEMA { DBO } else { from_schema };
        format!(
            "ALTER SCHEMA {} TRANSFER {}.{};",
            self.ident(to),
            self.ident(from),
            self.ident(name)
        )
    }
}

impl SqlGenerator for MssqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Mssql
    }

    fn statement(&self, statement: &JsonStatement) -> MigrateResult<Vec<String>> {
        use JsonStatement::*;

        let sql = match statement {
            CreateSchema { name } => vec![format!("CREATE SCHEMA {};", self.ident(name))],
            DropSchema { name } => vec![format!("DROP SCHEMA {};", self.ident(name))],

            CreateTable { table } => vec![self.create_table(table)],
            DropTable { table } => vec![format!(
                "DROP TABLE {};",
                self.name(&table.schema, &table.name)
            )],
            RenameTable { schema, from, to } => vec![format!(
                "EXEC sp_rename {}, {};",
                self.path(&[schema, from]),
                quote_literal(to)
            )],
            MoveTable {
                name,
                from_schema,
                to_schema,
            } => vec![self.transfer(name, from_schema, to_schema)],

            AddColumn { column } => vec![self.alter_table(
                &column.schema,
                &column.table,
                format!("ADD {}", self.column_definition(column)),
            )],
            DropColumn { column } => self.drop_column(column),
            RenameColumn {
                schema,
                table,
                from,
                to,
            } => vec![format!(
                "EXEC sp_rename {}, {}, 'COLUMN';",
                self.path(&[schema, table, from]),
                quote_literal(to)
            )],
            AlterColumn { from, to, diff } => self.alter_column(from, to, diff, statement)?,
            RecreateColumn { from, to } => {
                let mut out = self.drop_column(from);
                out.push(self.alter_table(
                    &to.schema,
                    &to.table,
                    format!("ADD {}", self.column_definition(to)),
                ));
                out
            }

            CreateIndex { index } => vec![self.create_index(index)],
            DropIndex { index } => vec![self.drop_index(index)],
            RenameIndex {
                schema,
                table,
                from,
                to,
            } => vec![format!(
                "EXEC sp_rename {}, {}, 'INDEX';",
                self.path(&[schema, table, from]),
                quote_literal(to)
            )],
            RecreateIndex { from, to } => vec![self.drop_index(from), self.create_index(to)],

            AddPk { pk } => vec![self.add_constraint(
                &pk.schema,
                &pk.table,
                &pk.name,
                format!("PRIMARY KEY({})", self.idents(&pk.columns)),
            )],
            DropPk { pk } => vec![self.drop_constraint(&pk.schema, &pk.table, &pk.name)],
            AlterPk { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_constraint(
                    &to.schema,
                    &to.table,
                    &to.name,
                    format!("PRIMARY KEY({})", self.idents(&to.columns)),
                ),
            ],
            AddUnique { unique } => vec![self.add_constraint(
                &unique.schema,
                &unique.table,
                &unique.name,
                format!("UNIQUE({})", self.idents(&unique.columns)),
            )],
            DropUnique { unique } => {
                vec![self.drop_constraint(&unique.schema, &unique.table, &unique.name)]
            }
            AlterUnique { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_constraint(
                    &to.schema,
                    &to.table,
                    &to.name,
                    format!("UNIQUE({})", self.idents(&to.columns)),
                ),
            ],
            AddCheck { check } => vec![self.add_constraint(
                &check.schema,
                &check.table,
                &check.name,
                format!("CHECK ({})", check.value),
            )],
            DropCheck { check } => {
                vec![self.drop_constraint(&check.schema, &check.table, &check.name)]
            }
            AlterCheck { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_constraint(&to.schema, &to.table, &to.name, format!("CHECK ({})", to.value)),
            ],
            CreateFk { fk } => {
                vec![self.add_constraint(&fk.schema, &fk.table, &fk.name, self.fk_body(fk))]
            }
            DropFk { fk } => vec![self.drop_constraint(&fk.schema, &fk.table, &fk.name)],
            RecreateFk { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_constraint(&to.schema, &to.table, &to.name, self.fk_body(to)),
            ],
            RenameConstraint { schema, from, to, .. } => vec![format!(
                "EXEC sp_rename {}, {}, 'OBJECT';",
                self.path(&[schema, from]),
                quote_literal(to)
            )],

            CreateView { view } => vec![self.create_view(view, statement)?],
            DropView { view } => vec![format!(
                "DROP VIEW {};",
                self.name(&view.schema, &view.name)
            )],
            RenameView {
                schema,
                from,
                to,
                materialized: false,
            } => vec![format!(
                "EXEC sp_rename {}, {};",
                self.path(&[schema, from]),
                quote_literal(to)
            )],
            MoveView {
                name,
                from_schema,
                to_schema,
                materialized: false,
            } => vec![self.transfer(name, from_schema, to_schema)],
            AlterView { view, .. } => vec![format!("ALTER VIEW {};", self.view_body(view))],
            RecreateView { from, to } => vec![
                format!("DROP VIEW {};", self.name(&from.schema, &from.name)),
                self.create_view(to, statement)?,
            ],

            _ => return Err(self.unsupported(statement)),
        };
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Ddl, Identity, IdentityKind, Table};

    #[test]
    fn test_create_table_with_identity_and_default() {
        let mut id = Column::new("dbo", "users", "id", "int").not_null();
        id.identity = Some(Identity::new(IdentityKind::Always));
        let ddl = Ddl::builder()
            .with(Table::new("dbo", "users"))
            .with(id)
            .with(Column::new("dbo", "users", "active", "bit").default_value("1"))
            .build();
        let table = FullTable::from_ddl(&ddl, &ddl.tables()[0]);

        let sql = MssqlGenerator
            .statement(&JsonStatement::CreateTable { table })
            .unwrap();
        assert_eq!(
            sql[0],
            "CREATE TABLE [users] (\n\t[id] int IDENTITY(1, 1) NOT NULL,\n\t[active] bit CONSTRAINT [users_active_default] DEFAULT (1)\n);"
        );
    }

    #[test]
    fn test_renames_use_sp_rename() {
        let sql = MssqlGenerator
            .statement(&JsonStatement::RenameColumn {
                schema: "dbo".into(),
                table: "users".into(),
                from: "mail".into(),
                to: "email".into(),
            })
            .unwrap();
        assert_eq!(sql, vec!["EXEC sp_rename 'users.mail', 'email', 'COLUMN';"]);

        let sql = MssqlGenerator
            .statement(&JsonStatement::RenameTable {
                schema: "sales".into(),
                from: "orders".into(),
                to: "purchases".into(),
            })
            .unwrap();
        assert_eq!(sql, vec!["EXEC sp_rename 'sales.orders', 'purchases';"]);
    }

    #[test]
    fn test_move_table_transfers_schema() {
        let sql = MssqlGenerator
            .statement(&JsonStatement::MoveTable {
                name: "users".into(),
                from_schema: "public".into(),
                to_schema: "auth".into(),
            })
            .unwrap();
        assert_eq!(sql, vec!["ALTER SCHEMA [auth] TRANSFER [dbo].[users];"]);
    }

    #[test]
    fn test_drop_column_drops_default_first() {
        let column = Column::new("dbo", "users", "active", "bit").default_value("1");
        let sql = MssqlGenerator
            .statement(&JsonStatement::DropColumn { column })
            .unwrap();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE [users] DROP CONSTRAINT [users_active_default];",
                "ALTER TABLE [users] DROP COLUMN [active];"
            ]
        );
    }
}
