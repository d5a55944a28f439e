//! SQL generation for migrations.
//!
//! Each dialect lowers [`JsonStatement`]s to SQL text in order. Generation is
//! pure: the same statements always give the same script.

mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MssqlGenerator;
pub use mysql::MySqlGenerator;
pub use postgres::PostgresSqlGenerator;
pub use sqlite::SqliteGenerator;

use crate::ddl::Dialect;
use crate::error::{MigrateResult, MigrationError};
use crate::statement::JsonStatement;

/// Separator between statements in a migration file.
pub const STATEMENT_BREAKPOINT: &str = "--> statement-breakpoint";

/// Generated SQL for one migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSql {
    /// Statements in execution order, each terminated by `;`.
    pub statements: Vec<String>,
}

impl MigrationSql {
    /// Check if the migration is empty.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Join into a migration script, optionally with breakpoint markers
    /// between statements.
    pub fn to_script(&self, breakpoints: bool) -> String {
        let separator = if breakpoints {
            format!("\n{}\n", STATEMENT_BREAKPOINT)
        } else {
            "\n".to_string()
        };
        let mut script = self.statements.join(&separator);
        if !script.is_empty() {
            script.push('\n');
        }
        script
    }
}

/// Lowers statements to one dialect.
pub trait SqlGenerator: Send + Sync {
    /// Target dialect.
    fn dialect(&self) -> Dialect;

    /// SQL for one statement. Fails with [`MigrationError::Unsupported`] when
    /// the dialect cannot express it.
    fn statement(&self, statement: &JsonStatement) -> MigrateResult<Vec<String>>;

    /// SQL for a statement list, order preserved.
    fn generate(&self, statements: &[JsonStatement]) -> MigrateResult<MigrationSql> {
        let mut sql = MigrationSql::default();
        for statement in statements {
            sql.statements.extend(self.statement(statement)?);
        }
        Ok(sql)
    }

    /// Shorthand for an unsupported statement.
    fn unsupported(&self, statement: &JsonStatement) -> MigrationError {
        MigrationError::unsupported(self.dialect(), statement.type_name())
    }
}

/// Pick the generator for a dialect.
pub fn generator_for(dialect: Dialect) -> Box<dyn SqlGenerator> {
    match dialect {
        Dialect::Postgresql => Box::new(PostgresSqlGenerator::new()),
        Dialect::Cockroach => Box::new(PostgresSqlGenerator::cockroach()),
        Dialect::Mysql => Box::new(MySqlGenerator),
        Dialect::Sqlite => Box::new(SqliteGenerator),
        Dialect::Mssql => Box::new(MssqlGenerator),
    }
}

/// Quote a string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier with `open`/`close`, doubling the closing character.
pub(crate) fn quote_with(name: &str, open: char, close: char) -> String {
    let escaped = name.replace(close, &format!("{}{}", close, close));
    format!("{}{}{}", open, escaped, close)
}

/// Column type with array suffixes.
pub(crate) fn array_type(base: String, dimensions: u32) -> String {
    format!("{}{}", base, "[]".repeat(dimensions as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_with_breakpoints() {
        let sql = MigrationSql {
            statements: vec!["CREATE SCHEMA \"a\";".into(), "CREATE SCHEMA \"b\";".into()],
        };
        assert_eq!(
            sql.to_script(true),
            "CREATE SCHEMA \"a\";\n--> statement-breakpoint\nCREATE SCHEMA \"b\";\n"
        );
        assert_eq!(
            sql.to_script(false),
            "CREATE SCHEMA \"a\";\nCREATE SCHEMA \"b\";\n"
        );
        assert_eq!(MigrationSql::default().to_script(true), "");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_with("we\"ird", '"', '"'), "\"we\"\"ird\"");
        assert_eq!(quote_with("a]b", '[', ']'), "[a]]b]");
    }

    #[test]
    fn test_generator_for_dialect() {
        for dialect in Dialect::ALL {
            assert_eq!(generator_for(dialect).dialect(), dialect);
        }
    }
}
