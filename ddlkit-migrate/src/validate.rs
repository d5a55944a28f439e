//! Structural checks run before diffing.
//!
//! Problems are collected, never thrown, so a caller can report every issue
//! in one pass.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ddl::{DEFAULT_SCHEMA, Ddl, DdlEntity, Dialect, EntityKey, EntityKind};

/// Category of a structural problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffErrorKind {
    /// Two entities of one kind share a natural key.
    DuplicateKey,
    /// A child names a schema or table that is not in the list.
    MissingParent,
    /// An index or constraint names a column the table does not have.
    MissingColumn,
    /// A foreign key points at a table that is not in the list.
    MissingReference,
    /// More than one primary key on a table.
    MultiplePrimaryKeys,
    /// The dialect has no such entity kind.
    UnsupportedEntity,
    /// Two indexes in one schema share a name.
    IndexNameCollision,
}

/// Which side of a diff an error was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DdlSide {
    From,
    To,
}

/// One structural problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffError {
    pub side: DdlSide,
    pub kind: DiffErrorKind,
    pub message: String,
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            DdlSide::From => "from",
            DdlSide::To => "to",
        };
        write!(f, "[{}] {}", side, self.message)
    }
}

struct Collector {
    side: DdlSide,
    errors: Vec<DiffError>,
}

impl Collector {
    fn push(&mut self, kind: DiffErrorKind, message: String) {
        self.errors.push(DiffError {
            side: self.side,
            kind,
            message,
        });
    }
}

/// Validate one entity list for a dialect.
pub fn validate(ddl: &Ddl, dialect: Dialect, side: DdlSide) -> Vec<DiffError> {
    let mut out = Collector {
        side,
        errors: Vec::new(),
    };

    unsupported_kinds(ddl, dialect, &mut out);

    duplicates(ddl.schemas(), &mut out);
    duplicates(ddl.enums(), &mut out);
    duplicates(ddl.sequences(), &mut out);
    duplicates(ddl.roles(), &mut out);
    duplicates(ddl.tables(), &mut out);
    duplicates(ddl.columns(), &mut out);
    duplicates(ddl.indexes(), &mut out);
    duplicates(ddl.pks(), &mut out);
    duplicates(ddl.uniques(), &mut out);
    duplicates(ddl.checks(), &mut out);
    duplicates(ddl.fks(), &mut out);
    duplicates(ddl.policies(), &mut out);
    duplicates(ddl.views(), &mut out);
    duplicates(ddl.privileges(), &mut out);

    references(ddl, dialect, &mut out);

    out.errors
}

fn unsupported_kinds(ddl: &Ddl, dialect: Dialect, out: &mut Collector) {
    let mut seen = HashSet::new();
    for entity in ddl.list() {
        let kind = entity.kind();
        if !dialect.supports(kind) && seen.insert(kind) {
            out.push(
                DiffErrorKind::UnsupportedEntity,
                format!("{} does not support {} ({})", dialect, kind.plural(), entity.key()),
            );
        }
    }
}

fn duplicates<E: DdlEntity>(entities: &[E], out: &mut Collector) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for entity in entities {
        let key = entity.key();
        if !seen.insert(key.clone()) && reported.insert(key.clone()) {
            out.push(
                DiffErrorKind::DuplicateKey,
                format!("two {} with identical name \"{}\"", E::KIND.plural(), key),
            );
        }
    }
}

fn references(ddl: &Ddl, dialect: Dialect, out: &mut Collector) {
    let schemas: HashSet<&str> = ddl.schemas().iter().map(|s| s.name.as_str()).collect();
    let tables: HashSet<(&str, &str)> = ddl
        .tables()
        .iter()
        .map(|t| (t.schema.as_str(), t.name.as_str()))
        .collect();
    let columns: HashSet<(&str, &str, &str)> = ddl
        .columns()
        .iter()
        .map(|c| (c.schema.as_str(), c.table.as_str(), c.name.as_str()))
        .collect();

    // Only dialects with schemas require them to be declared.
    let schema_missing = |schema: &str| {
        dialect.supports(EntityKind::Schema)
            && schema != DEFAULT_SCHEMA
            && schema != "dbo"
            && !schemas.contains(schema)
    };

    let schema_level = ddl
        .tables()
        .iter()
        .map(|t| (EntityKind::Table, t.key()))
        .chain(ddl.views().iter().map(|v| (EntityKind::View, v.key())))
        .chain(ddl.enums().iter().map(|e| (EntityKind::Enum, e.key())))
        .chain(ddl.sequences().iter().map(|s| (EntityKind::Sequence, s.key())));
    for (kind, key) in schema_level {
        if schema_missing(key.schema_or_default()) {
            out.push(
                DiffErrorKind::MissingParent,
                format!(
                    "{} \"{}\" references missing schema \"{}\"",
                    kind,
                    key,
                    key.schema_or_default()
                ),
            );
        }
    }

    let table_scoped = ddl
        .columns()
        .iter()
        .map(|e| (EntityKind::Column, e.key()))
        .chain(ddl.indexes().iter().map(|e| (EntityKind::Index, e.key())))
        .chain(ddl.pks().iter().map(|e| (EntityKind::Pk, e.key())))
        .chain(ddl.uniques().iter().map(|e| (EntityKind::Unique, e.key())))
        .chain(ddl.checks().iter().map(|e| (EntityKind::Check, e.key())))
        .chain(ddl.fks().iter().map(|e| (EntityKind::Fk, e.key())))
        .chain(ddl.policies().iter().map(|e| (EntityKind::Policy, e.key())))
        .chain(ddl.privileges().iter().map(|e| (EntityKind::Privilege, e.key())));
    for (kind, key) in table_scoped {
        if let Some(parent) = key.parent() {
            let table = (parent.schema_or_default(), parent.name.as_str());
            if !tables.contains(&table) {
                out.push(
                    DiffErrorKind::MissingParent,
                    format!("{} \"{}\" references missing table \"{}\"", kind, key, parent),
                );
            }
        }
    }

    let mut missing_column = |kind: EntityKind, key: EntityKey, schema: &str, table: &str, column: &str| {
        if tables.contains(&(schema, table)) && !columns.contains(&(schema, table, column)) {
            out.push(
                DiffErrorKind::MissingColumn,
                format!(
                    "{} \"{}\" references missing column \"{}.{}.{}\"",
                    kind, key, schema, table, column
                ),
            );
        }
    };

    for index in ddl.indexes() {
        for column in index.columns.iter().filter(|c| !c.is_expression) {
            missing_column(EntityKind::Index, index.key(), &index.schema, &index.table, &column.value);
        }
    }
    for pk in ddl.pks() {
        for column in &pk.columns {
            missing_column(EntityKind::Pk, pk.key(), &pk.schema, &pk.table, column);
        }
    }
    for unique in ddl.uniques() {
        for column in &unique.columns {
            missing_column(EntityKind::Unique, unique.key(), &unique.schema, &unique.table, column);
        }
    }
    for fk in ddl.fks() {
        for column in &fk.columns {
            missing_column(EntityKind::Fk, fk.key(), &fk.schema, &fk.table, column);
        }
        for column in &fk.columns_to {
            missing_column(EntityKind::Fk, fk.key(), &fk.schema_to, &fk.table_to, column);
        }
    }

    for fk in ddl.fks() {
        if !tables.contains(&(fk.schema_to.as_str(), fk.table_to.as_str())) {
            out.push(
                DiffErrorKind::MissingReference,
                format!(
                    "foreign key \"{}\" references missing table \"{}.{}\"",
                    fk.key(),
                    fk.schema_to,
                    fk.table_to
                ),
            );
        }
        if fk.columns.len() != fk.columns_to.len() {
            out.push(
                DiffErrorKind::MissingReference,
                format!(
                    "foreign key \"{}\" maps {} column(s) onto {}",
                    fk.key(),
                    fk.columns.len(),
                    fk.columns_to.len()
                ),
            );
        }
    }

    let mut pk_count: HashMap<(&str, &str), usize> = HashMap::new();
    for pk in ddl.pks() {
        *pk_count.entry((pk.schema.as_str(), pk.table.as_str())).or_default() += 1;
    }
    let mut multi: Vec<_> = pk_count.into_iter().filter(|(_, n)| *n > 1).collect();
    multi.sort();
    for ((schema, table), count) in multi {
        out.push(
            DiffErrorKind::MultiplePrimaryKeys,
            format!("table \"{}.{}\" has {} primary keys", schema, table, count),
        );
    }

    if dialect.schema_scoped_index_names() {
        let mut owners: HashMap<(&str, &str), &str> = HashMap::new();
        for index in ddl.indexes() {
            let slot = (index.schema.as_str(), index.name.as_str());
            match owners.get(&slot) {
                Some(owner) if *owner != index.table.as_str() => out.push(
                    DiffErrorKind::IndexNameCollision,
                    format!(
                        "index name \"{}\" is used by tables \"{}\" and \"{}\" in schema \"{}\"",
                        index.name, owner, index.table, index.schema
                    ),
                ),
                Some(_) => {}
                None => {
                    owners.insert(slot, index.table.as_str());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{Column, EnumType, ForeignKey, Index, PrimaryKey, ReferentialAction, Schema, Table};

    fn kinds(errors: &[DiffError]) -> Vec<DiffErrorKind> {
        errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_valid_schema_has_no_errors() {
        let ddl = Ddl::builder()
            .with(Table::new("public", "users"))
            .with(Column::new("public", "users", "id", "integer"))
            .with(PrimaryKey {
                schema: "public".into(),
                table: "users".into(),
                name: "users_pkey".into(),
                columns: vec!["id".into()],
            })
            .build();
        assert!(validate(&ddl, Dialect::Postgresql, DdlSide::To).is_empty());
    }

    #[test]
    fn test_duplicate_schema_names() {
        let ddl = Ddl::builder()
            .with(Schema::new("auth"))
            .with(Schema::new("auth"))
            .build();
        let errors = validate(&ddl, Dialect::Postgresql, DdlSide::To);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "two schemas with identical name \"auth\"");
    }

    #[test]
    fn test_column_on_missing_table() {
        let ddl = Ddl::builder()
            .with(Column::new("public", "ghost", "id", "integer"))
            .build();
        let errors = validate(&ddl, Dialect::Postgresql, DdlSide::From);
        assert_eq!(kinds(&errors), vec![DiffErrorKind::MissingParent]);
        assert!(errors[0].to_string().starts_with("[from]"));
    }

    #[test]
    fn test_fk_to_missing_table_and_column() {
        let ddl = Ddl::builder()
            .with(Table::new("public", "posts"))
            .with(Column::new("public", "posts", "author_id", "integer"))
            .with(ForeignKey {
                schema: "public".into(),
                table: "posts".into(),
                name: "posts_author_fk".into(),
                columns: vec!["author_id".into(), "missing".into()],
                schema_to: "public".into(),
                table_to: "users".into(),
                columns_to: vec!["id".into()],
                on_update: ReferentialAction::NoAction,
                on_delete: ReferentialAction::Cascade,
            })
            .build();
        let errors = validate(&ddl, Dialect::Postgresql, DdlSide::To);
        let kinds = kinds(&errors);
        assert!(kinds.contains(&DiffErrorKind::MissingColumn));
        assert!(kinds.contains(&DiffErrorKind::MissingReference));
    }

    #[test]
    fn test_unsupported_kind_for_dialect() {
        let ddl = Ddl::builder()
            .with(EnumType::new("public", "mood", ["happy", "sad"]))
            .build();
        let errors = validate(&ddl, Dialect::Sqlite, DdlSide::To);
        assert_eq!(kinds(&errors), vec![DiffErrorKind::UnsupportedEntity]);
    }

    #[test]
    fn test_index_name_collision_in_schema() {
        let ddl = Ddl::builder()
            .with(Table::new("public", "a"))
            .with(Table::new("public", "b"))
            .with(Column::new("public", "a", "x", "integer"))
            .with(Column::new("public", "b", "x", "integer"))
            .with(Index::new("public", "a", "x_idx", ["x"]))
            .with(Index::new("public", "b", "x_idx", ["x"]))
            .build();
        let errors = validate(&ddl, Dialect::Postgresql, DdlSide::To);
        assert_eq!(kinds(&errors), vec![DiffErrorKind::IndexNameCollision]);

        // MySQL scopes index names per table.
        assert!(validate(&ddl, Dialect::Mysql, DdlSide::To).is_empty());
    }

    #[test]
    fn test_missing_schema() {
        let ddl = Ddl::builder().with(Table::new("auth", "users")).build();
        let errors = validate(&ddl, Dialect::Postgresql, DdlSide::To);
        assert_eq!(kinds(&errors), vec![DiffErrorKind::MissingParent]);
    }
}
