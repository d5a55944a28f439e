//! Schema diffing.
//!
//! The differ compares two entity lists kind by kind in dependency order:
//!
//! 1. Both sides are validated. Structural problems come back as
//!    [`DiffError`] values and leave the statement list empty.
//! 2. For each kind, keys only on one side are offered to the [`Resolver`]
//!    (grouped by owning table for table-scoped kinds). Accepted renames are
//!    applied to a working copy of `from`, so later kinds see the new keys.
//! 3. The renamed `from` is compared with `to`, emitting creates, drops and
//!    alters.
//! 4. Statements are put in execution order (see [`order`]); SQLite then
//!    folds what it cannot alter in place into table rebuilds.
//!
//! ```rust,ignore
//! use ddlkit_migrate::{Dialect, SchemaDiffer, resolver::NoRenames};
//!
//! let result = SchemaDiffer::new(Dialect::Postgresql, &NoRenames)
//!     .diff(&from, &to)
//!     .await?;
//! if result.is_usable() {
//!     println!("{}", result.summary());
//! }
//! ```

mod compare;
mod mysql;
pub mod order;
mod sqlite;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::ddl::{
    Check, Column, DEFAULT_SCHEMA, Ddl, DdlEntity, Dialect, Entity, EntityKey, EntityKind,
    EnumType, ForeignKey, Index, Policy, PrimaryKey, Privilege, Role, Schema, Sequence, Table,
    Unique, View,
};
use crate::error::{MigrateResult, MigrationError};
use crate::resolver::{Resolver, ResolverInput, check_partition};
use crate::snapshot::RenameHint;
use crate::statement::JsonStatement;
use crate::validate::{DdlSide, DiffError, validate};

/// Outcome of a diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    /// Statements in execution order. Empty when `errors` is not.
    pub statements: Vec<JsonStatement>,
    /// Structural problems in either input.
    pub errors: Vec<DiffError>,
    /// Rename decisions taken, for recording in a snapshot.
    pub renames: Vec<RenameHint>,
}

impl DiffResult {
    /// Whether `statements` may be used.
    pub fn is_usable(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether the two sides are equivalent.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.errors.is_empty()
    }

    /// Reasons for every data-losing statement.
    pub fn data_loss(&self) -> Vec<String> {
        self.statements
            .iter()
            .filter_map(JsonStatement::data_loss_reason)
            .collect()
    }

    /// Count statements by type, in first-seen order.
    pub fn summary(&self) -> String {
        if !self.errors.is_empty() {
            return format!("{} error(s)", self.errors.len());
        }
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for statement in &self.statements {
            *counts.entry(statement.type_name()).or_default() += 1;
        }
        if counts.is_empty() {
            return "No changes".to_string();
        }
        counts
            .iter()
            .map(|(name, n)| format!("{} {}", n, name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Diffs two schemas of one dialect.
pub struct SchemaDiffer<'a> {
    dialect: Dialect,
    resolver: &'a dyn Resolver,
}

impl<'a> SchemaDiffer<'a> {
    /// Create a differ using `resolver` for rename decisions.
    pub fn new(dialect: Dialect, resolver: &'a dyn Resolver) -> Self {
        Self { dialect, resolver }
    }

    /// Compute the statements that turn `from` into `to`.
    #[instrument(skip_all, fields(dialect = %self.dialect))]
    pub async fn diff(&self, from: &Ddl, to: &Ddl) -> MigrateResult<DiffResult> {
        let mut errors = validate(from, self.dialect, DdlSide::From);
        errors.extend(validate(to, self.dialect, DdlSide::To));
        if !errors.is_empty() {
            debug!(errors = errors.len(), "Schema validation failed");
            return Ok(DiffResult {
                errors,
                ..Default::default()
            });
        }

        let mut work = Working {
            ddl: from.clone(),
            statements: Vec::new(),
            renames: Vec::new(),
        };

        self.resolve::<Schema>(&mut work, to).await?;
        self.resolve::<EnumType>(&mut work, to).await?;
        self.resolve::<Sequence>(&mut work, to).await?;
        self.resolve::<Role>(&mut work, to).await?;
        self.resolve::<Table>(&mut work, to).await?;
        self.resolve::<Column>(&mut work, to).await?;
        self.resolve::<Index>(&mut work, to).await?;
        self.resolve::<PrimaryKey>(&mut work, to).await?;
        self.resolve::<Unique>(&mut work, to).await?;
        self.resolve::<Check>(&mut work, to).await?;
        self.resolve::<ForeignKey>(&mut work, to).await?;
        self.resolve::<Policy>(&mut work, to).await?;
        self.resolve::<View>(&mut work, to).await?;

        compare::emit(&work.ddl, to, self.dialect, &mut work.statements);
        order::sort(&mut work.statements);

        let mut statements = match self.dialect {
            Dialect::Sqlite => sqlite::collapse(work.statements, &work.ddl, to),
            Dialect::Mysql => mysql::lower_constraint_renames(work.statements, &work.ddl, to),
            _ => work.statements,
        };
        if self.dialect.schema_scoped_index_names() || self.dialect == Dialect::Sqlite {
            order::release_index_names(&mut statements);
        }

        debug!(statements = statements.len(), renames = work.renames.len(), "Diff complete");
        Ok(DiffResult {
            statements,
            errors: Vec::new(),
            renames: work.renames,
        })
    }

    async fn resolve<E: DdlEntity>(&self, work: &mut Working, to: &Ddl) -> MigrateResult<()> {
        if !self.dialect.supports(E::KIND) {
            return Ok(());
        }

        let mut groups: IndexMap<Option<EntityKey>, ResolverInput> = IndexMap::new();
        {
            let from_keys: IndexMap<EntityKey, &E> =
                E::all(&work.ddl).iter().map(|e| (e.key(), e)).collect();
            let to_keys: IndexMap<EntityKey, &E> =
                E::all(to).iter().map(|e| (e.key(), e)).collect();

            let group_of = |key: &EntityKey| {
                if E::KIND.is_table_scoped() {
                    key.parent()
                } else {
                    None
                }
            };
            // The default schema always exists and is never renamed.
            let implicit = |key: &EntityKey| E::KIND == EntityKind::Schema && key.name == DEFAULT_SCHEMA;

            for (key, entity) in &to_keys {
                if !from_keys.contains_key(key) && !implicit(key) {
                    let group = groups.entry(group_of(key)).or_default();
                    group.created.push((*entity).clone().into());
                }
            }
            for (key, entity) in &from_keys {
                if !to_keys.contains_key(key) && !implicit(key) {
                    let group = groups.entry(group_of(key)).or_default();
                    group.deleted.push((*entity).clone().into());
                }
            }
        }

        for (parent, input) in groups {
            if input.created.is_empty() || input.deleted.is_empty() {
                continue;
            }
            debug!(
                kind = %E::KIND,
                parent = ?parent.map(|p| p.to_string()),
                created = input.created.len(),
                deleted = input.deleted.len(),
                "Resolving rename candidates"
            );
            let output = self.resolver.resolve(E::KIND, input.clone()).await?;
            check_partition(E::KIND, &input, &output)?;

            for renamed in output.renamed {
                let from = typed::<E>(renamed.from)?;
                let to = typed::<E>(renamed.to)?;
                work.rename(&from, &to);
            }
        }
        Ok(())
    }
}

fn typed<E: DdlEntity>(entity: Entity) -> MigrateResult<E> {
    let kind = entity.kind();
    E::from_entity(entity).ok_or_else(|| {
        MigrationError::resolver_contract(E::KIND, format!("returned a {} as a rename", kind))
    })
}

/// Diff with a one-off [`SchemaDiffer`].
pub async fn diff(
    from: &Ddl,
    to: &Ddl,
    dialect: Dialect,
    resolver: &dyn Resolver,
) -> MigrateResult<DiffResult> {
    SchemaDiffer::new(dialect, resolver).diff(from, to).await
}

/// Mutable state of one diff run.
struct Working {
    ddl: Ddl,
    statements: Vec<JsonStatement>,
    renames: Vec<RenameHint>,
}

impl Working {
    fn rename<E: DdlEntity>(&mut self, from: &E, to: &E) {
        let (old, new) = (from.key(), to.key());
        debug!(kind = %E::KIND, from = %old, to = %new, "Applying rename");
        self.renames
            .push(RenameHint::new(E::KIND, old.clone(), new.clone()));

        for entity in E::all_mut(&mut self.ddl) {
            if entity.key() == old {
                entity.set_key(&new);
            }
        }

        let old_schema = old.schema_or_default().to_string();
        let new_schema = new.schema_or_default().to_string();
        let table = old.table.clone().unwrap_or_default();

        match E::KIND {
            EntityKind::Schema => {
                self.statements.push(JsonStatement::RenameSchema {
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
                rewrite_schema(&mut self.ddl, &old.name, &new.name);
            }
            EntityKind::Enum => {
                self.schema_level(&old, &new, |schema, from, to| JsonStatement::RenameEnum {
                    schema,
                    from,
                    to,
                }, |name, from_schema, to_schema| JsonStatement::MoveEnum {
                    name,
                    from_schema,
                    to_schema,
                });
                for column in &mut self.ddl.columns {
                    if column.type_schema.as_deref() == Some(old_schema.as_str())
                        && column.sql_type == old.name
                    {
                        column.type_schema = Some(new_schema.clone());
                        column.sql_type = new.name.clone();
                    }
                }
            }
            EntityKind::Sequence => {
                self.schema_level(&old, &new, |schema, from, to| JsonStatement::RenameSequence {
                    schema,
                    from,
                    to,
                }, |name, from_schema, to_schema| JsonStatement::MoveSequence {
                    name,
                    from_schema,
                    to_schema,
                });
            }
            EntityKind::Role => {
                self.statements.push(JsonStatement::RenameRole {
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
                for policy in &mut self.ddl.policies {
                    for role in &mut policy.roles {
                        if *role == old.name {
                            *role = new.name.clone();
                        }
                    }
                }
                for privilege in &mut self.ddl.privileges {
                    if privilege.grantee == old.name {
                        privilege.grantee = new.name.clone();
                    }
                }
            }
            EntityKind::Table => {
                self.schema_level(&old, &new, |schema, from, to| JsonStatement::RenameTable {
                    schema,
                    from,
                    to,
                }, |name, from_schema, to_schema| JsonStatement::MoveTable {
                    name,
                    from_schema,
                    to_schema,
                });
                rewrite_table(
                    &mut self.ddl,
                    (&old_schema, &old.name),
                    (&new_schema, &new.name),
                );
            }
            EntityKind::View => {
                let materialized = self
                    .ddl
                    .views
                    .iter()
                    .find(|v| v.key() == new)
                    .is_some_and(|v| v.materialized);
                self.schema_level(&old, &new, |schema, from, to| JsonStatement::RenameView {
                    schema,
                    from,
                    to,
                    materialized,
                }, |name, from_schema, to_schema| JsonStatement::MoveView {
                    name,
                    from_schema,
                    to_schema,
                    materialized,
                });
            }
            EntityKind::Column => {
                self.statements.push(JsonStatement::RenameColumn {
                    schema: old_schema.clone(),
                    table: table.clone(),
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
                rewrite_column(&mut self.ddl, &old_schema, &table, &old.name, &new.name);
            }
            EntityKind::Index => {
                self.statements.push(JsonStatement::RenameIndex {
                    schema: old_schema,
                    table,
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
            }
            EntityKind::Pk | EntityKind::Unique | EntityKind::Check | EntityKind::Fk => {
                self.statements.push(JsonStatement::RenameConstraint {
                    schema: old_schema,
                    table,
                    kind: E::KIND,
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
            }
            EntityKind::Policy => {
                self.statements.push(JsonStatement::RenamePolicy {
                    schema: old_schema,
                    table,
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
            }
            EntityKind::Privilege => {}
        }
    }

    /// Emit `rename_*` within the old schema, then `move_*` if the schema
    /// changed too.
    fn schema_level(
        &mut self,
        old: &EntityKey,
        new: &EntityKey,
        rename: impl FnOnce(String, String, String) -> JsonStatement,
        moved: impl FnOnce(String, String, String) -> JsonStatement,
    ) {
        let (from_schema, to_schema) = (old.schema_or_default(), new.schema_or_default());
        if old.name != new.name {
            self.statements.push(rename(
                from_schema.to_string(),
                old.name.clone(),
                new.name.clone(),
            ));
        }
        if from_schema != to_schema {
            self.statements.push(moved(
                new.name.clone(),
                from_schema.to_string(),
                to_schema.to_string(),
            ));
        }
    }
}

fn rewrite_schema(ddl: &mut Ddl, from: &str, to: &str) {
    let fix = |schema: &mut String| {
        if schema == from {
            *schema = to.to_string();
        }
    };
    ddl.enums.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.sequences.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.tables.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.indexes.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.pks.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.uniques.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.checks.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.policies.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.views.iter_mut().for_each(|e| fix(&mut e.schema));
    ddl.privileges.iter_mut().for_each(|e| fix(&mut e.schema));
    for column in &mut ddl.columns {
        fix(&mut column.schema);
        if let Some(type_schema) = column.type_schema.as_mut() {
            fix(type_schema);
        }
    }
    for fk in &mut ddl.fks {
        fix(&mut fk.schema);
        fix(&mut fk.schema_to);
    }
}

fn rewrite_table(ddl: &mut Ddl, from: (&str, &str), to: (&str, &str)) {
    let fix = |schema: &mut String, table: &mut String| {
        if schema == from.0 && table == from.1 {
            *schema = to.0.to_string();
            *table = to.1.to_string();
        }
    };
    ddl.columns.iter_mut().for_each(|e| fix(&mut e.schema, &mut e.table));
    ddl.indexes.iter_mut().for_each(|e| fix(&mut e.schema, &mut e.table));
    ddl.pks.iter_mut().for_each(|e| fix(&mut e.schema, &mut e.table));
    ddl.uniques.iter_mut().for_each(|e| fix(&mut e.schema, &mut e.table));
    ddl.checks.iter_mut().for_each(|e| fix(&mut e.schema, &mut e.table));
    ddl.policies.iter_mut().for_each(|e| fix(&mut e.schema, &mut e.table));
    ddl.privileges.iter_mut().for_each(|e| fix(&mut e.schema, &mut e.table));
    for fk in &mut ddl.fks {
        fix(&mut fk.schema, &mut fk.table);
        fix(&mut fk.schema_to, &mut fk.table_to);
    }
}

fn rewrite_column(ddl: &mut Ddl, schema: &str, table: &str, from: &str, to: &str) {
    let on_table = |s: &str, t: &str| s == schema && t == table;
    let fix = |columns: &mut Vec<String>| {
        for column in columns.iter_mut() {
            if column == from {
                *column = to.to_string();
            }
        }
    };

    for index in ddl.indexes.iter_mut().filter(|i| on_table(&i.schema, &i.table)) {
        for column in index.columns.iter_mut().filter(|c| !c.is_expression) {
            if column.value == from {
                column.value = to.to_string();
            }
        }
    }
    for pk in ddl.pks.iter_mut().filter(|p| on_table(&p.schema, &p.table)) {
        fix(&mut pk.columns);
    }
    for unique in ddl.uniques.iter_mut().filter(|u| on_table(&u.schema, &u.table)) {
        fix(&mut unique.columns);
    }
    for fk in &mut ddl.fks {
        if on_table(&fk.schema, &fk.table) {
            fix(&mut fk.columns);
        }
        if on_table(&fk.schema_to, &fk.table_to) {
            fix(&mut fk.columns_to);
        }
    }
}

#[cfg(test)]
mod tests;
