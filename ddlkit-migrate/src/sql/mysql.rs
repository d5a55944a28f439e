//! MySQL.

use crate::ddl::{Column, Dialect, EntityKind, ForeignKey, GeneratedKind, Index, View};
use crate::error::MigrateResult;
use crate::statement::{FullTable, JsonStatement};

use super::{SqlGenerator, quote_with};

/// SQL generator for MySQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGenerator;

impl MySqlGenerator {
    fn ident(&self, name: &str) -> String {
        quote_with(name, '`', '`')
    }

    fn idents(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.ident(n))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn column_definition(&self, column: &Column) -> String {
        let mut sql = format!(
            "{} {}",
            self.ident(&column.name),
            column.sql_type
        );
        if let Some(generated) = &column.generated {
            let storage = match generated.kind {
                GeneratedKind::Stored => "STORED",
                GeneratedKind::Virtual => "VIRTUAL",
            };
            sql.push_str(&format!(
                " GENERATED ALWAYS AS ({}) {}",
                generated.expression, storage
            ));
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if column.identity.is_some() {
            sql.push_str(" AUTO_INCREMENT");
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
                "CONSTRAINT {} CHECK({})",
                self.ident(&check.name),
                check.value
            ));
        }
        for fk in &table.fks {
            lines.push(format!(
                "CONSTRAINT {} {}",
                self.ident(&fk.name),
                self.fk_body(fk)
            ));
        }
        format!(
            "CREATE TABLE {} (\n\t{}\n);",
            self.ident(&table.name),
            lines.join(",\n\t")
        )
    }

    fn fk_body(&self, fk: &ForeignKey) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            self.idents(&fk.columns),
            self.ident(&fk.table_to),
            self.idents(&fk.columns_to),
            fk.on_delete.as_sql(),
            fk.on_update.as_sql()
        )
    }

    fn alter_table(&self, table: &str, action: String) -> String {
        format!("ALTER TABLE {} {};", self.ident(table), action)
    }

    fn create_index(&self, index: &Index, statement: &JsonStatement) -> MigrateResult<String> {
        if index.where_clause.is_some() {
            return Err(self.unsupported(statement));
        }
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| {
                let part = if c.is_expression {
                    format!("({})", c.value)
                } else {
                    self.ident(&c.value)
                };
                if c.asc { part } else { format!("{} DESC", part) }
            })
            .collect();
        let using = if index.method.eq_ignore_ascii_case("hash") {
            " USING HASH"
        } else {
            ""
        };
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({}){};",
            if index.is_unique { "UNIQUE " } else { "" },
            self.ident(&index.name),
            self.ident(&index.table),
            columns.join(","),
            using
        ))
    }

    fn drop_index(&self, index: &Index) -> String {
        format!(
            "DROP INDEX {} ON {};",
            self.ident(&index.name),
            self.ident(&index.table)
        )
    }

    fn create_view(&self, view: &View, statement: &JsonStatement) -> MigrateResult<String> {
        if view.materialized {
            return Err(self.unsupported(statement));
        }
        let check = view
            .check_option
            .as_deref()
            .map(|o| format!(" WITH {} CHECK OPTION", o.to_ascii_uppercase()))
            .unwrap_or_default();
        Ok(format!(
            "CREATE VIEW {} AS ({}){};",
            self.ident(&view.name),
            view.definition.as_deref().unwrap_or_default(),
            check
        ))
    }
}

impl SqlGenerator for MySqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn statement(&self, statement: &JsonStatement) -> MigrateResult<Vec<String>> {
        use JsonStatement::*;

        let sql = match statement {
            CreateTable { table } => vec![self.create_table(table)],
            DropTable { table } => vec![format!("DROP TABLE {};", self.ident(&table.name))],
            RenameTable { from, to, .. } => vec![format!(
                "RENAME TABLE {} TO {};",
                self.ident(from),
                self.ident(to)
            )],

            AddColumn { column } => vec![self.alter_table(
                &column.table,
                format!("ADD {}", self.column_definition(column)),
            )],
            DropColumn { column } => vec![self.alter_table(
                &column.table,
                format!("DROP COLUMN {}", self.ident(&column.name)),
            )],
            RenameColumn { table, from, to, .. } => vec![self.alter_table(
                table,
                format!("RENAME COLUMN {} TO {}", self.ident(from), self.ident(to)),
            )],
            AlterColumn { to, .. } => vec![self.alter_table(
                &to.table,
                format!("MODIFY COLUMN {}", self.column_definition(to)),
            )],
            RecreateColumn { from, to } => vec![
                self.alter_table(&from.table, format!("DROP COLUMN {}", self.ident(&from.name))),
                self.alter_table(&to.table, format!("ADD {}", self.column_definition(to))),
            ],

            CreateIndex { index } => vec![self.create_index(index, statement)?],
            DropIndex { index } => vec![self.drop_index(index)],
            RenameIndex { table, from, to, .. } => vec![self.alter_table(
                table,
                format!("RENAME INDEX {} TO {}", self.ident(from), self.ident(to)),
            )],
            RecreateIndex { from, to } => {
                vec![self.drop_index(from), self.create_index(to, statement)?]
            }

            AddPk { pk } => vec![self.alter_table(
                &pk.table,
                format!("ADD PRIMARY KEY({})", self.idents(&pk.columns)),
            )],
            DropPk { pk } => vec![self.alter_table(&pk.table, "DROP PRIMARY KEY".to_string())],
            AlterPk { from, to } => vec![
                self.alter_table(&from.table, "DROP PRIMARY KEY".to_string()),
                self.alter_table(
                    &to.table,
                    format!("ADD PRIMARY KEY({})", self.idents(&to.columns)),
                ),
            ],
            AddUnique { unique } => vec![self.alter_table(
                &unique.table,
                format!(
                    "ADD CONSTRAINT {} UNIQUE({})",
                    self.ident(&unique.name),
                    self.idents(&unique.columns)
                ),
            )],
            DropUnique { unique } => vec![self.alter_table(
                &unique.table,
                format!("DROP INDEX {}", self.ident(&unique.name)),
            )],
            AlterUnique { from, to } => vec![
                self.alter_table(&from.table, format!("DROP INDEX {}", self.ident(&from.name))),
                self.alter_table(
                    &to.table,
                    format!(
                        "ADD CONSTRAINT {} UNIQUE({})",
                        self.ident(&to.name),
                        self.idents(&to.columns)
                    ),
                ),
            ],
            AddCheck { check } => vec![self.alter_table(
                &check.table,
                format!("ADD CONSTRAINT {} CHECK ({})", self.ident(&check.name), check.value),
            )],
            DropCheck { check } => vec![self.alter_table(
                &check.table,
                format!("DROP CHECK {}", self.ident(&check.name)),
            )],
            AlterCheck { from, to } => vec![
                self.alter_table(&from.table, format!("DROP CHECK {}", self.ident(&from.name))),
                self.alter_table(
                    &to.table,
                    format!("ADD CONSTRAINT {} CHECK ({})", self.ident(&to.name), to.value),
                ),
            ],
            CreateFk { fk } => vec![self.alter_table(
                &fk.table,
                format!("ADD CONSTRAINT {} {}", self.ident(&fk.name), self.fk_body(fk)),
            )],
            DropFk { fk } => vec![self.alter_table(
                &fk.table,
                format!("DROP FOREIGN KEY {}", self.ident(&fk.name)),
            )],
            RecreateFk { from, to } => vec![
                self.alter_table(&from.table, format!("DROP FOREIGN KEY {}", self.ident(&from.name))),
                self.alter_table(
                    &to.table,
                    format!("ADD CONSTRAINT {} {}", self.ident(&to.name), self.fk_body(to)),
                ),
            ],
            RenameConstraint {
                table,
                kind: EntityKind::Unique,
                from,
                to,
                ..
            } => vec![self.alter_table(
                table,
                format!("RENAME INDEX {} TO {}", self.ident(from), self.ident(to)),
            )],

            CreateView { view } => vec![self.create_view(view, statement)?],
            DropView { view } => vec![format!("DROP VIEW {};", self.ident(&view.name))],
            RenameView {
                from,
                to,
                materialized: false,
                ..
            } => vec![format!(
                "RENAME TABLE {} TO {};",
                self.ident(from),
                self.ident(to)
            )],
            AlterView { view, .. } => {
                let create = self.create_view(view, statement)?;
                vec![create.replacen("CREATE VIEW", "ALTER VIEW", 1)]
            }
            RecreateView { from, to } => vec![
                format!("DROP VIEW {};", self.ident(&from.name)),
                self.create_view(to, statement)?,
            ],

            _ => return Err(self.unsupported(statement)),
        };
        Ok(sql)
    }
}
