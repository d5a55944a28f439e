//! Structured fuzzing for the diff engine and SQL generators.
//!
//! Two small schemas are generated with `arbitrary`, diffed for every
//! dialect with the heuristic resolver, and the statements rendered to SQL.
//! Nothing may panic, and diffing a schema against itself must be empty.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_diff_structured
//! ```

#![no_main]

use arbitrary::Arbitrary;
use ddlkit_migrate::{
    Column, Ddl, Dialect, HeuristicResolver, Index, NoRenames, PrimaryKey, Table, diff,
    generator_for,
};
use libfuzzer_sys::fuzz_target;

/// A generated column type.
#[derive(Debug, Arbitrary)]
enum FuzzType {
    Integer,
    Bigint,
    Text,
    Varchar(u8),
    Boolean,
    Timestamp,
    Numeric(u8, u8),
}

impl FuzzType {
    fn sql(&self) -> String {
        match self {
            Self::Integer => "integer".into(),
            Self::Bigint => "bigint".into(),
            Self::Text => "text".into(),
            Self::Varchar(n) => format!("varchar({})", u16::from(*n) + 1),
            Self::Boolean => "boolean".into(),
            Self::Timestamp => "timestamp".into(),
            Self::Numeric(p, s) => format!("numeric({}, {})", p % 30 + 8, s % 8),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzColumn {
    name: u8,
    sql_type: FuzzType,
    not_null: bool,
    default: Option<i16>,
}

#[derive(Debug, Arbitrary)]
struct FuzzTable {
    name: u8,
    columns: Vec<FuzzColumn>,
    indexed: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzSchema {
    tables: Vec<FuzzTable>,
}

impl FuzzSchema {
    /// Names come from small integers so both sides share keys often.
    fn build(&self) -> Ddl {
        let mut builder = Ddl::builder();
        let mut tables = Vec::new();
        for table in self.tables.iter().take(8) {
            let name = format!("t{}", table.name % 6);
            if tables.contains(&name) {
                continue;
            }
            builder.push(Table::new("public", &name));
            builder.push(Column::new("public", &name, "id", "integer").not_null());
            builder.push(PrimaryKey {
                schema: "public".into(),
                table: name.clone(),
                name: format!("{}_pkey", name),
                columns: vec!["id".into()],
            });

            let mut columns = vec!["id".to_string()];
            for column in table.columns.iter().take(8) {
                let column_name = format!("c{}", column.name % 10);
                if columns.contains(&column_name) {
                    continue;
                }
                let mut entity = Column::new("public", &name, &column_name, column.sql_type.sql());
                if column.not_null {
                    entity = entity.not_null();
                }
                if let Some(value) = column.default {
                    entity = entity.default_value(value.to_string());
                }
                builder.push(entity);
                columns.push(column_name);
            }
            if table.indexed && columns.len() > 1 {
                builder.push(Index::new(
                    "public",
                    &name,
                    format!("{}_idx", name),
                    [columns[1].clone()],
                ));
            }
            tables.push(name);
        }
        builder.build()
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    from: FuzzSchema,
    to: FuzzSchema,
}

fuzz_target!(|input: Input| {
    let Ok(rt) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };
    let from = input.from.build();
    let to = input.to.build();

    for dialect in Dialect::ALL {
        let result = rt
            .block_on(diff(&from, &to, dialect, &HeuristicResolver))
            .expect("heuristic resolver keeps the partition contract");
        if result.errors.is_empty() {
            let _ = generator_for(dialect).generate(&result.statements);
        }

        let same = rt
            .block_on(diff(&to, &to, dialect, &NoRenames))
            .expect("no-op diff must succeed");
        assert!(same.statements.is_empty());
    }
});
