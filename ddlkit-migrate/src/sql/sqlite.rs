//! SQLite.

use crate::ddl::{Column, Dialect, GeneratedKind, Index, View};
use crate::error::MigrateResult;
use crate::statement::{FullTable, JsonStatement};

use super::{SqlGenerator, quote_with};

/// SQL generator for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGenerator;

impl SqliteGenerator {
    fn ident(&self, name: &str) -> String {
        quote_with(name, '"', '"')
    }

    fn idents(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.ident(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_definition(&self, column: &Column, inline_pk: bool) -> String {
        let mut sql = format!("{} {}", self.ident(&column.name), column.sql_type);
        if inline_pk {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
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
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    /// `CREATE TABLE` under `name`, which differs from the table name while
    /// rebuilding.
    fn create_table(&self, table: &FullTable, name: &str) -> String {
        // A single identity column key becomes `INTEGER PRIMARY KEY AUTOINCREMENT`.
        let autoincrement = table.pk.as_ref().and_then(|pk| match pk.columns.as_slice() {
            [only] => table
                .columns
                .iter()
                .find(|c| c.name == *only && c.identity.is_some())
                .map(|c| c.name.clone()),
            _ => None,
        });

        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c, autoincrement.as_deref() == Some(c.name.as_str())))
            .collect();
        if let Some(pk) = table.pk.as_ref().filter(|_| autoincrement.is_none()) {
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
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON UPDATE {} ON DELETE {}",
                self.ident(&fk.name),
                self.idents(&fk.columns),
                self.ident(&fk.table_to),
                self.idents(&fk.columns_to),
                fk.on_update.as_sql(),
                fk.on_delete.as_sql()
            ));
        }
        format!(
            "CREATE TABLE {} (\n\t{}\n);",
            self.ident(name),
            lines.join(",\n\t")
        )
    }

    fn recreate_table(&self, from: &FullTable, to: &FullTable) -> Vec<String> {
        let temp = format!("__new_{}", to.name);
        let copied: Vec<String> = to
            .columns
            .iter()
            .filter(|c| c.generated.is_none())
            .filter(|c| {
                from.columns
                    .iter()
                    .any(|f| f.name == c.name && f.generated.is_none())
            })
            .map(|c| c.name.clone())
            .collect();

        let mut out = vec![
            "PRAGMA foreign_keys=OFF;".to_string(),
            self.create_table(to, &temp),
        ];
        if !copied.is_empty() {
            let columns = self.idents(&copied);
            out.push(format!(
                "INSERT INTO {}({}) SELECT {} FROM {};",
                self.ident(&temp),
                columns,
                columns,
                self.ident(&from.name)
            ));
        }
        out.push(format!("DROP TABLE {};", self.ident(&from.name)));
        out.push(format!(
            "ALTER TABLE {} RENAME TO {};",
            self.ident(&temp),
            self.ident(&to.name)
        ));
        out.push("PRAGMA foreign_keys=ON;".to_string());
        out.extend(to.indexes.iter().map(|index| self.create_index(index)));
        out
    }

    fn create_index(&self, index: &Index) -> String {
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
        let predicate = index
            .where_clause
            .as_deref()
            .map(|w| format!(" WHERE {}", w))
            .unwrap_or_default();
        format!(
            "CREATE {}INDEX {} ON {} ({}){};",
            if index.is_unique { "UNIQUE " } else { "" },
            self.ident(&index.name),
            self.ident(&index.table),
            columns.join(", "),
            predicate
        )
    }

    fn create_view(&self, view: &View, statement: &JsonStatement) -> MigrateResult<String> {
        if view.materialized {
            return Err(self.unsupported(statement));
        }
        Ok(format!(
            "CREATE VIEW {} AS {};",
            self.ident(&view.name),
            view.definition.as_deref().unwrap_or_default()
        ))
    }
}

impl SqlGenerator for SqliteGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn statement(&self, statement: &JsonStatement) -> MigrateResult<Vec<String>> {
        use JsonStatement::*;

        let sql = match statement {
            CreateTable { table } => vec![self.create_table(table, &table.name)],
            DropTable { table } => vec![format!("DROP TABLE {};", self.ident(&table.name))],
            RenameTable { from, to, .. } => vec![format!(
                "ALTER TABLE {} RENAME TO {};",
                self.ident(from),
                self.ident(to)
            )],
            RecreateTable { from, to } => self.recreate_table(from, to),

            AddColumn { column } => vec![format!(
                "ALTER TABLE {} ADD {};",
                self.ident(&column.table),
                self.column_definition(column, false)
            )],
            DropColumn { column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {};",
                self.ident(&column.table),
                self.ident(&column.name)
            )],
            RenameColumn { table, from, to, .. } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                self.ident(table),
                self.ident(from),
                self.ident(to)
            )],

            CreateIndex { index } => vec![self.create_index(index)],
            DropIndex { index } => vec![format!("DROP INDEX {};", self.ident(&index.name))],
            RecreateIndex { from, to } => vec![
                format!("DROP INDEX {};", self.ident(&from.name)),
                self.create_index(to),
            ],

            CreateView { view } => vec![self.create_view(view, statement)?],
            DropView { view } => vec![format!("DROP VIEW {};", self.ident(&view.name))],
            RecreateView { from, to } => vec![
                format!("DROP VIEW {};", self.ident(&from.name)),
                self.create_view(to, statement)?,
            ],

            _ => return Err(self.unsupported(statement)),
        };
        Ok(sql)
    }
}
