//! Typed, dialect-agnostic schema change statements.
//!
//! The diff engine emits [`JsonStatement`]s; SQL generators lower them to
//! text and the commutativity analyzer compares them across branches. Each
//! variant carries enough of the affected entities to do both without going
//! back to the schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ddl::{
    Check, Column, Ddl, EntityKind, EnumType, ForeignKey, Index, Policy, PrimaryKey, Privilege,
    Role, Sequence, Table, Unique, View, normalize_type,
};

/// One changed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl FieldChange {
    pub fn new(field: &str, from: Option<String>, to: Option<String>) -> Self {
        Self {
            field: field.to_string(),
            from,
            to,
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.field,
            self.from.as_deref().unwrap_or("∅"),
            self.to.as_deref().unwrap_or("∅")
        )
    }
}

/// A table together with everything created or dropped with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTable {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub is_rls_enabled: bool,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<PrimaryKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uniques: Vec<Unique>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Check>,
    /// Only populated where foreign keys must be declared inline (SQLite).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fks: Vec<ForeignKey>,
    /// Only populated for table recreation, which loses the indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
}

impl FullTable {
    /// Gather a table and its inline parts from a schema.
    pub fn from_ddl(ddl: &Ddl, table: &Table) -> Self {
        let (schema, name) = (table.schema.as_str(), table.name.as_str());
        Self {
            schema: table.schema.clone(),
            name: table.name.clone(),
            is_rls_enabled: table.is_rls_enabled,
            columns: ddl.columns_of(schema, name).cloned().collect(),
            pk: ddl.pk_of(schema, name).cloned(),
            uniques: ddl.uniques_of(schema, name).cloned().collect(),
            checks: ddl.checks_of(schema, name).cloned().collect(),
            fks: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Also carry foreign keys and indexes, for a full rebuild.
    pub fn with_dependents(mut self, ddl: &Ddl) -> Self {
        self.fks = ddl.fks_of(&self.schema, &self.name).cloned().collect();
        self.indexes = ddl.indexes_of(&self.schema, &self.name).cloned().collect();
        self
    }
}

/// Added enum value and the existing value it goes before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueAddition {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JsonStatement {
    CreateSchema { name: String },
    DropSchema { name: String },
    RenameSchema { from: String, to: String },

    CreateEnum { enum_type: EnumType },
    DropEnum { enum_type: EnumType },
    RenameEnum { schema: String, from: String, to: String },
    MoveEnum { name: String, from_schema: String, to_schema: String },
    AlterEnum { enum_type: EnumType, added: Vec<EnumValueAddition> },
    /// Values were removed or reordered; columns using the type are
    /// converted through text.
    RecreateEnum { from: EnumType, to: EnumType, columns: Vec<Column> },

    CreateSequence { sequence: Sequence },
    DropSequence { sequence: Sequence },
    RenameSequence { schema: String, from: String, to: String },
    MoveSequence { name: String, from_schema: String, to_schema: String },
    AlterSequence { sequence: Sequence, diff: Vec<FieldChange> },

    CreateRole { role: Role },
    DropRole { role: Role },
    RenameRole { from: String, to: String },
    AlterRole { role: Role, diff: Vec<FieldChange> },

    CreateTable { table: FullTable },
    DropTable { table: FullTable },
    RenameTable { schema: String, from: String, to: String },
    MoveTable { name: String, from_schema: String, to_schema: String },
    RecreateTable { from: FullTable, to: FullTable },

    AddColumn { column: Column },
    DropColumn { column: Column },
    RenameColumn { schema: String, table: String, from: String, to: String },
    AlterColumn { from: Column, to: Column, diff: Vec<FieldChange> },
    RecreateColumn { from: Column, to: Column },

    CreateIndex { index: Index },
    DropIndex { index: Index },
    RenameIndex { schema: String, table: String, from: String, to: String },
    RecreateIndex { from: Index, to: Index },

    AddPk { pk: PrimaryKey },
    DropPk { pk: PrimaryKey },
    AlterPk { from: PrimaryKey, to: PrimaryKey },
    AddUnique { unique: Unique },
    DropUnique { unique: Unique },
    AlterUnique { from: Unique, to: Unique },
    AddCheck { check: Check },
    DropCheck { check: Check },
    AlterCheck { from: Check, to: Check },
    CreateFk { fk: ForeignKey },
    DropFk { fk: ForeignKey },
    RecreateFk { from: ForeignKey, to: ForeignKey },
    RenameConstraint { schema: String, table: String, kind: EntityKind, from: String, to: String },

    CreateView { view: View },
    DropView { view: View },
    RenameView { schema: String, from: String, to: String, materialized: bool },
    MoveView { name: String, from_schema: String, to_schema: String, materialized: bool },
    AlterView { view: View, diff: Vec<FieldChange> },
    RecreateView { from: View, to: View },

    CreatePolicy { policy: Policy },
    DropPolicy { policy: Policy },
    RenamePolicy { schema: String, table: String, from: String, to: String },
    AlterPolicy { policy: Policy, diff: Vec<FieldChange> },
    RecreatePolicy { from: Policy, to: Policy },
    AlterRls { schema: String, table: String, is_rls_enabled: bool },

    GrantPrivilege { privilege: Privilege },
    RevokePrivilege { privilege: Privilege },
}

impl JsonStatement {
    /// The `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CreateSchema { .. } => "create_schema",
            Self::DropSchema { .. } => "drop_schema",
            Self::RenameSchema { .. } => "rename_schema",
            Self::CreateEnum { .. } => "create_enum",
            Self::DropEnum { .. } => "drop_enum",
            Self::RenameEnum { .. } => "rename_enum",
            Self::MoveEnum { .. } => "move_enum",
            Self::AlterEnum { .. } => "alter_enum",
            Self::RecreateEnum { .. } => "recreate_enum",
            Self::CreateSequence { .. } => "create_sequence",
            Self::DropSequence { .. } => "drop_sequence",
            Self::RenameSequence { .. } => "rename_sequence",
            Self::MoveSequence { .. } => "move_sequence",
            Self::AlterSequence { .. } => "alter_sequence",
            Self::CreateRole { .. } => "create_role",
            Self::DropRole { .. } => "drop_role",
            Self::RenameRole { .. } => "rename_role",
            Self::AlterRole { .. } => "alter_role",
            Self::CreateTable { .. } => "create_table",
            Self::DropTable { .. } => "drop_table",
            Self::RenameTable { .. } => "rename_table",
            Self::MoveTable { .. } => "move_table",
            Self::RecreateTable { .. } => "recreate_table",
            Self::AddColumn { .. } => "add_column",
            Self::DropColumn { .. } => "drop_column",
            Self::RenameColumn { .. } => "rename_column",
            Self::AlterColumn { .. } => "alter_column",
            Self::RecreateColumn { .. } => "recreate_column",
            Self::CreateIndex { .. } => "create_index",
            Self::DropIndex { .. } => "drop_index",
            Self::RenameIndex { .. } => "rename_index",
            Self::RecreateIndex { .. } => "recreate_index",
            Self::AddPk { .. } => "add_pk",
            Self::DropPk { .. } => "drop_pk",
            Self::AlterPk { .. } => "alter_pk",
            Self::AddUnique { .. } => "add_unique",
            Self::DropUnique { .. } => "drop_unique",
            Self::AlterUnique { .. } => "alter_unique",
            Self::AddCheck { .. } => "add_check",
            Self::DropCheck { .. } => "drop_check",
            Self::AlterCheck { .. } => "alter_check",
            Self::CreateFk { .. } => "create_fk",
            Self::DropFk { .. } => "drop_fk",
            Self::RecreateFk { .. } => "recreate_fk",
            Self::RenameConstraint { .. } => "rename_constraint",
            Self::CreateView { .. } => "create_view",
            Self::DropView { .. } => "drop_view",
            Self::RenameView { .. } => "rename_view",
            Self::MoveView { .. } => "move_view",
            Self::AlterView { .. } => "alter_view",
            Self::RecreateView { .. } => "recreate_view",
            Self::CreatePolicy { .. } => "create_policy",
            Self::DropPolicy { .. } => "drop_policy",
            Self::RenamePolicy { .. } => "rename_policy",
            Self::AlterPolicy { .. } => "alter_policy",
            Self::RecreatePolicy { .. } => "recreate_policy",
            Self::AlterRls { .. } => "alter_rls",
            Self::GrantPrivilege { .. } => "grant_privilege",
            Self::RevokePrivilege { .. } => "revoke_privilege",
        }
    }

    /// `(schema, table)` the statement operates inside, if any.
    pub fn table(&self) -> Option<(&str, &str)> {
        match self {
            Self::CreateTable { table } | Self::DropTable { table } => {
                pair(&table.schema, &table.name)
            }
            Self::RecreateTable { to, .. } => pair(&to.schema, &to.name),
            Self::AddColumn { column } | Self::DropColumn { column } => {
                pair(&column.schema, &column.table)
            }
            Self::AlterColumn { to, .. } | Self::RecreateColumn { to, .. } => {
                pair(&to.schema, &to.table)
            }
            Self::RenameColumn { schema, table, .. }
            | Self::RenameIndex { schema, table, .. }
            | Self::RenameConstraint { schema, table, .. }
            | Self::RenamePolicy { schema, table, .. }
            | Self::AlterRls { schema, table, .. } => pair(schema, table),
            Self::CreateIndex { index } | Self::DropIndex { index } => {
                pair(&index.schema, &index.table)
            }
            Self::RecreateIndex { to, .. } => pair(&to.schema, &to.table),
            Self::AddPk { pk } | Self::DropPk { pk } => pair(&pk.schema, &pk.table),
            Self::AlterPk { to, .. } => pair(&to.schema, &to.table),
            Self::AddUnique { unique } | Self::DropUnique { unique } => {
                pair(&unique.schema, &unique.table)
            }
            Self::AlterUnique { to, .. } => pair(&to.schema, &to.table),
            Self::AddCheck { check } | Self::DropCheck { check } => {
                pair(&check.schema, &check.table)
            }
            Self::AlterCheck { to, .. } => pair(&to.schema, &to.table),
            Self::CreateFk { fk } | Self::DropFk { fk } => pair(&fk.schema, &fk.table),
            Self::RecreateFk { to, .. } => pair(&to.schema, &to.table),
            Self::CreatePolicy { policy }
            | Self::DropPolicy { policy }
            | Self::AlterPolicy { policy, .. } => pair(&policy.schema, &policy.table),
            Self::RecreatePolicy { to, .. } => pair(&to.schema, &to.table),
            Self::GrantPrivilege { privilege } | Self::RevokePrivilege { privilege } => {
                pair(&privilege.schema, &privilege.table)
            }
            _ => None,
        }
    }

    /// Whether applying the statement can destroy stored data.
    pub fn data_loss(&self) -> bool {
        self.data_loss_reason().is_some()
    }

    /// Why the statement loses data, if it does.
    pub fn data_loss_reason(&self) -> Option<String> {
        match self {
            Self::DropSchema { name } => Some(format!("drops schema \"{}\"", name)),
            Self::DropTable { table } => Some(format!(
                "drops table \"{}.{}\" and all of its rows",
                table.schema, table.name
            )),
            Self::DropColumn { column } => Some(format!(
                "drops column \"{}.{}.{}\"",
                column.schema, column.table, column.name
            )),
            Self::DropEnum { enum_type } => Some(format!(
                "drops enum \"{}.{}\"",
                enum_type.schema, enum_type.name
            )),
            Self::RecreateEnum { from, to, .. } => {
                let removed: Vec<&str> = from
                    .values
                    .iter()
                    .filter(|v| !to.values.contains(v))
                    .map(String::as_str)
                    .collect();
                (!removed.is_empty()).then(|| {
                    format!(
                        "removes value(s) {} from enum \"{}.{}\"",
                        removed.join(", "),
                        to.schema,
                        to.name
                    )
                })
            }
            Self::RecreateColumn { from, .. } => Some(format!(
                "recreates column \"{}.{}.{}\"",
                from.schema, from.table, from.name
            )),
            Self::RecreateTable { from, to } => {
                let dropped: Vec<&str> = from
                    .columns
                    .iter()
                    .filter(|c| !to.columns.iter().any(|t| t.name == c.name))
                    .map(|c| c.name.as_str())
                    .collect();
                (!dropped.is_empty()).then(|| {
                    format!(
                        "recreates table \"{}.{}\" without column(s) {}",
                        to.schema,
                        to.name,
                        dropped.join(", ")
                    )
                })
            }
            Self::AlterColumn { from, to, .. } => narrowing(from, to).then(|| {
                format!(
                    "changes type of \"{}.{}.{}\" from {} to {}",
                    to.schema, to.table, to.name, from.sql_type, to.sql_type
                )
            }),
            _ => None,
        }
    }

    /// One-line human description.
    pub fn summary(&self) -> String {
        match self {
            Self::CreateSchema { name } => format!("create schema \"{}\"", name),
            Self::DropSchema { name } => format!("drop schema \"{}\"", name),
            Self::RenameSchema { from, to } => format!("rename schema \"{}\" to \"{}\"", from, to),
            Self::CreateEnum { enum_type } => {
                format!("create enum \"{}.{}\"", enum_type.schema, enum_type.name)
            }
            Self::DropEnum { enum_type } => {
                format!("drop enum \"{}.{}\"", enum_type.schema, enum_type.name)
            }
            Self::RenameEnum { schema, from, to } => {
                format!("rename enum \"{}.{}\" to \"{}\"", schema, from, to)
            }
            Self::MoveEnum {
                name,
                from_schema,
                to_schema,
            } => format!(
                "move enum \"{}.{}\" to schema \"{}\"",
                from_schema, name, to_schema
            ),
            Self::AlterEnum { enum_type, added } => format!(
                "add {} value(s) to enum \"{}.{}\"",
                added.len(),
                enum_type.schema,
                enum_type.name
            ),
            Self::RecreateEnum { to, .. } => {
                format!("recreate enum \"{}.{}\"", to.schema, to.name)
            }
            Self::CreateSequence { sequence } => {
                format!("create sequence \"{}.{}\"", sequence.schema, sequence.name)
            }
            Self::DropSequence { sequence } => {
                format!("drop sequence \"{}.{}\"", sequence.schema, sequence.name)
            }
            Self::RenameSequence { schema, from, to } => {
                format!("rename sequence \"{}.{}\" to \"{}\"", schema, from, to)
            }
            Self::MoveSequence {
                name,
                from_schema,
                to_schema,
            } => format!(
                "move sequence \"{}.{}\" to schema \"{}\"",
                from_schema, name, to_schema
            ),
            Self::AlterSequence { sequence, .. } => {
                format!("alter sequence \"{}.{}\"", sequence.schema, sequence.name)
            }
            Self::CreateRole { role } => format!("create role \"{}\"", role.name),
            Self::DropRole { role } => format!("drop role \"{}\"", role.name),
            Self::RenameRole { from, to } => format!("rename role \"{}\" to \"{}\"", from, to),
            Self::AlterRole { role, .. } => format!("alter role \"{}\"", role.name),
            Self::CreateTable { table } => {
                format!("create table \"{}.{}\"", table.schema, table.name)
            }
            Self::DropTable { table } => format!("drop table \"{}.{}\"", table.schema, table.name),
            Self::RenameTable { schema, from, to } => {
                format!("rename table \"{}.{}\" to \"{}\"", schema, from, to)
            }
            Self::MoveTable {
                name,
                from_schema,
                to_schema,
            } => format!(
                "move table \"{}.{}\" to schema \"{}\"",
                from_schema, name, to_schema
            ),
            Self::RecreateTable { to, .. } => {
                format!("recreate table \"{}.{}\"", to.schema, to.name)
            }
            Self::AddColumn { column } => format!(
                "add column \"{}.{}.{}\"",
                column.schema, column.table, column.name
            ),
            Self::DropColumn { column } => format!(
                "drop column \"{}.{}.{}\"",
                column.schema, column.table, column.name
            ),
            Self::RenameColumn {
                schema,
                table,
                from,
                to,
            } => format!(
                "rename column \"{}.{}.{}\" to \"{}\"",
                schema, table, from, to
            ),
            Self::AlterColumn { to, diff, .. } => format!(
                "alter column \"{}.{}.{}\" ({})",
                to.schema,
                to.table,
                to.name,
                diff.iter()
                    .map(|d| d.field.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::RecreateColumn { to, .. } => format!(
                "recreate column \"{}.{}.{}\"",
                to.schema, to.table, to.name
            ),
            Self::CreateIndex { index } => format!(
                "create index \"{}\" on \"{}.{}\"",
                index.name, index.schema, index.table
            ),
            Self::DropIndex { index } => format!(
                "drop index \"{}\" on \"{}.{}\"",
                index.name, index.schema, index.table
            ),
            Self::RenameIndex {
                schema,
                table,
                from,
                to,
            } => format!(
                "rename index \"{}\" on \"{}.{}\" to \"{}\"",
                from, schema, table, to
            ),
            Self::RecreateIndex { to, .. } => format!(
                "recreate index \"{}\" on \"{}.{}\"",
                to.name, to.schema, to.table
            ),
            Self::AddPk { pk } => constraint("add", EntityKind::Pk, &pk.name, &pk.schema, &pk.table),
            Self::DropPk { pk } => {
                constraint("drop", EntityKind::Pk, &pk.name, &pk.schema, &pk.table)
            }
            Self::AlterPk { to, .. } => {
                constraint("alter", EntityKind::Pk, &to.name, &to.schema, &to.table)
            }
            Self::AddUnique { unique } => constraint(
                "add",
                EntityKind::Unique,
                &unique.name,
                &unique.schema,
                &unique.table,
            ),
            Self::DropUnique { unique } => constraint(
                "drop",
                EntityKind::Unique,
                &unique.name,
                &unique.schema,
                &unique.table,
            ),
            Self::AlterUnique { to, .. } => {
                constraint("alter", EntityKind::Unique, &to.name, &to.schema, &to.table)
            }
            Self::AddCheck { check } => constraint(
                "add",
                EntityKind::Check,
                &check.name,
                &check.schema,
                &check.table,
            ),
            Self::DropCheck { check } => constraint(
                "drop",
                EntityKind::Check,
                &check.name,
                &check.schema,
                &check.table,
            ),
            Self::AlterCheck { to, .. } => {
                constraint("alter", EntityKind::Check, &to.name, &to.schema, &to.table)
            }
            Self::CreateFk { fk } => {
                constraint("create", EntityKind::Fk, &fk.name, &fk.schema, &fk.table)
            }
            Self::DropFk { fk } => constraint("drop", EntityKind::Fk, &fk.name, &fk.schema, &fk.table),
            Self::RecreateFk { to, .. } => {
                constraint("recreate", EntityKind::Fk, &to.name, &to.schema, &to.table)
            }
            Self::RenameConstraint {
                schema,
                table,
                kind,
                from,
                to,
            } => format!(
                "rename {} \"{}\" on \"{}.{}\" to \"{}\"",
                kind, from, schema, table, to
            ),
            Self::CreateView { view } => format!("create view \"{}.{}\"", view.schema, view.name),
            Self::DropView { view } => format!("drop view \"{}.{}\"", view.schema, view.name),
            Self::RenameView {
                schema, from, to, ..
            } => format!("rename view \"{}.{}\" to \"{}\"", schema, from, to),
            Self::MoveView {
                name,
                from_schema,
                to_schema,
                ..
            } => format!(
                "move view \"{}.{}\" to schema \"{}\"",
                from_schema, name, to_schema
            ),
            Self::AlterView { view, .. } => format!("alter view \"{}.{}\"", view.schema, view.name),
            Self::RecreateView { to, .. } => {
                format!("recreate view \"{}.{}\"", to.schema, to.name)
            }
            Self::CreatePolicy { policy } => format!(
                "create policy \"{}\" on \"{}.{}\"",
                policy.name, policy.schema, policy.table
            ),
            Self::DropPolicy { policy } => format!(
                "drop policy \"{}\" on \"{}.{}\"",
                policy.name, policy.schema, policy.table
            ),
            Self::RenamePolicy {
                schema,
                table,
                from,
                to,
            } => format!(
                "rename policy \"{}\" on \"{}.{}\" to \"{}\"",
                from, schema, table, to
            ),
            Self::AlterPolicy { policy, .. } => format!(
                "alter policy \"{}\" on \"{}.{}\"",
                policy.name, policy.schema, policy.table
            ),
            Self::RecreatePolicy { to, .. } => format!(
                "recreate policy \"{}\" on \"{}.{}\"",
                to.name, to.schema, to.table
            ),
            Self::AlterRls {
                schema,
                table,
                is_rls_enabled,
            } => format!(
                "{} row level security on \"{}.{}\"",
                if *is_rls_enabled { "enable" } else { "disable" },
                schema,
                table
            ),
            Self::GrantPrivilege { privilege } => format!(
                "grant {} on \"{}.{}\" to \"{}\"",
                privilege.kind.as_sql(),
                privilege.schema,
                privilege.table,
                privilege.grantee
            ),
            Self::RevokePrivilege { privilege } => format!(
                "revoke {} on \"{}.{}\" from \"{}\"",
                privilege.kind.as_sql(),
                privilege.schema,
                privilege.table,
                privilege.grantee
            ),
        }
    }
}

impl fmt::Display for JsonStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

fn pair<'a>(schema: &'a str, table: &'a str) -> Option<(&'a str, &'a str)> {
    Some((schema, table))
}

fn constraint(verb: &str, kind: EntityKind, name: &str, schema: &str, table: &str) -> String {
    format!("{} {} \"{}\" on \"{}.{}\"", verb, kind, name, schema, table)
}

/// Whether a column type change may not fit existing values.
fn narrowing(from: &Column, to: &Column) -> bool {
    let (a, b) = (normalize_type(&from.sql_type), normalize_type(&to.sql_type));
    if a == b && from.dimensions == to.dimensions && from.type_schema == to.type_schema {
        return false;
    }
    if from.dimensions != to.dimensions || from.type_schema != to.type_schema {
        return true;
    }
    !widens(&a, &b)
}

fn widens(from: &str, to: &str) -> bool {
    const INT_RANK: [&str; 3] = ["smallint", "integer", "bigint"];
    let rank = |t: &str| INT_RANK.iter().position(|r| *r == t);
    if let (Some(a), Some(b)) = (rank(from), rank(to)) {
        return a <= b;
    }
    if from == "real" && to == "double precision" {
        return true;
    }
    let (from_base, from_args) = split_args(from);
    let (to_base, to_args) = split_args(to);
    match (from_base, to_base) {
        ("varchar" | "char", "text") => true,
        ("varchar", "varchar") | ("char", "char") => match (from_args.first(), to_args.first()) {
            (Some(a), Some(b)) => a <= b,
            (Some(_), None) => true,
            _ => false,
        },
        ("numeric", "numeric") => match (from_args.as_slice(), to_args.as_slice()) {
            ([p1], [p2]) => p1 <= p2,
            ([p1, s1], [p2, s2]) => p1 <= p2 && s1 <= s2 && p1 - s1 <= p2 - s2,
            (_, []) => true,
            _ => false,
        },
        _ => false,
    }
}

fn split_args(ty: &str) -> (&str, Vec<i64>) {
    match ty.split_once('(') {
        Some((base, rest)) => {
            let args = rest
                .trim_end_matches(')')
                .split(',')
                .filter_map(|a| a.trim().parse().ok())
                .collect();
            (base.trim(), args)
        }
        None => (ty, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alter(from: &str, to: &str) -> JsonStatement {
        JsonStatement::AlterColumn {
            from: Column::new("public", "t", "c", from),
            to: Column::new("public", "t", "c", to),
            diff: vec![FieldChange::new(
                "type",
                Some(from.to_string()),
                Some(to.to_string()),
            )],
        }
    }

    #[test]
    fn test_type_tag_wire_format() {
        let statement = JsonStatement::RenameColumn {
            schema: "public".into(),
            table: "users".into(),
            from: "email".into(),
            to: "mail".into(),
        };
        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(json["type"], "rename_column");
        assert_eq!(json["table"], "users");
        assert_eq!(statement.type_name(), "rename_column");

        let moved = JsonStatement::MoveTable {
            name: "users".into(),
            from_schema: "public".into(),
            to_schema: "auth".into(),
        };
        let json = serde_json::to_value(&moved).unwrap();
        assert_eq!(json["fromSchema"], "public");
        let back: JsonStatement = serde_json::from_value(json).unwrap();
        assert_eq!(back, moved);
    }

    #[test]
    fn test_widening_is_not_data_loss() {
        assert!(!alter("integer", "bigint").data_loss());
        assert!(!alter("varchar(20)", "varchar(255)").data_loss());
        assert!(!alter("varchar(20)", "text").data_loss());
        assert!(!alter("numeric(10,2)", "numeric(12,2)").data_loss());
        assert!(!alter("real", "double precision").data_loss());
    }

    #[test]
    fn test_narrowing_is_data_loss() {
        assert!(alter("bigint", "integer").data_loss());
        assert!(alter("varchar(255)", "varchar(20)").data_loss());
        assert!(alter("text", "integer").data_loss());
        let reason = alter("text", "varchar(10)").data_loss_reason().unwrap();
        assert!(reason.contains("from text to varchar(10)"));
    }

    #[test]
    fn test_drops_are_data_loss() {
        let drop = JsonStatement::DropColumn {
            column: Column::new("public", "users", "email", "text"),
        };
        assert!(drop.data_loss());
        assert!(!JsonStatement::CreateSchema { name: "auth".into() }.data_loss());
    }

    #[test]
    fn test_recreate_enum_only_loses_removed_values() {
        let from = EnumType::new("public", "mood", ["happy", "sad"]);
        let reordered = EnumType::new("public", "mood", ["sad", "happy"]);
        let shrunk = EnumType::new("public", "mood", ["happy"]);
        let keep = JsonStatement::RecreateEnum {
            from: from.clone(),
            to: reordered,
            columns: vec![],
        };
        let lose = JsonStatement::RecreateEnum {
            from,
            to: shrunk,
            columns: vec![],
        };
        assert!(!keep.data_loss());
        assert!(lose.data_loss_reason().unwrap().contains("sad"));
    }

    #[test]
    fn test_summary() {
        let statement = alter("integer", "bigint");
        assert_eq!(statement.summary(), "alter column \"public.t.c\" (type)");
    }
}
