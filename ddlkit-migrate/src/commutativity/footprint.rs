//! What a statement touches.
//!
//! A footprint lists the resources a statement writes, each with the kind of
//! write, and the resources it only depends on. Conflict rules are phrased
//! entirely in terms of footprints.

use std::fmt;

use crate::ddl::{Column, DdlEntity, EntityKey, EntityKind, ForeignKey, split_array_type};
use crate::statement::JsonStatement;

/// A named schema object a statement can address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource {
    pub kind: EntityKind,
    pub key: EntityKey,
}

impl Resource {
    pub fn new(kind: EntityKind, key: EntityKey) -> Self {
        Self { kind, key }
    }

    fn of<E: DdlEntity>(entity: &E) -> Self {
        Self::new(E::KIND, entity.key())
    }

    fn schema(name: &str) -> Self {
        Self::new(EntityKind::Schema, EntityKey::named(name))
    }

    fn role(name: &str) -> Self {
        Self::new(EntityKind::Role, EntityKey::named(name))
    }

    fn in_schema(kind: EntityKind, schema: &str, name: &str) -> Self {
        Self::new(kind, EntityKey::in_schema(schema, name))
    }

    fn table(schema: &str, name: &str) -> Self {
        Self::in_schema(EntityKind::Table, schema, name)
    }

    fn in_table(kind: EntityKind, schema: &str, table: &str, name: &str) -> Self {
        Self::new(kind, EntityKey::in_table(schema, table, name))
    }

    fn column(schema: &str, table: &str, name: &str) -> Self {
        Self::in_table(EntityKind::Column, schema, table, name)
    }

    /// Whether a statement touching `other` addresses this resource: the
    /// resource itself, anything inside a table or view, anything inside a
    /// schema.
    pub fn covers(&self, other: &Resource) -> bool {
        if self == other {
            return true;
        }
        match self.kind {
            EntityKind::Schema => other.key.schema.as_deref() == Some(self.key.name.as_str()),
            EntityKind::Table | EntityKind::View => {
                other.key.schema == self.key.schema
                    && other.key.table.as_deref() == Some(self.key.name.as_str())
            }
            _ => false,
        }
    }

    fn article(&self) -> &'static str {
        match self.kind.label().chars().next() {
            Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
            _ => "a",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.kind, self.key)
    }
}

/// How a statement writes a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Create,
    Drop,
    Alter,
    /// The resource is renamed or moved away.
    RenameFrom,
    /// The resource is the destination of a rename or move.
    RenameTo,
}

/// Resources written and read by one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footprint {
    pub writes: Vec<(Resource, Access)>,
    pub reads: Vec<Resource>,
}

impl Footprint {
    /// Compute the footprint of a statement.
    pub fn of(statement: &JsonStatement) -> Self {
        use Access::*;
        use JsonStatement::*;

        let mut fp = Footprint::default();
        match statement {
            CreateSchema { name } => fp.write(Resource::schema(name), Create),
            DropSchema { name } => fp.write(Resource::schema(name), Drop),
            RenameSchema { from, to } => fp.rename(Resource::schema(from), Resource::schema(to)),

            CreateEnum { enum_type } => fp.write(Resource::of(enum_type), Create),
            DropEnum { enum_type } => fp.write(Resource::of(enum_type), Drop),
            RenameEnum { schema, from, to } => fp.rename(
                Resource::in_schema(EntityKind::Enum, schema, from),
                Resource::in_schema(EntityKind::Enum, schema, to),
            ),
            MoveEnum {
                name,
                from_schema,
                to_schema,
            } => fp.rename(
                Resource::in_schema(EntityKind::Enum, from_schema, name),
                Resource::in_schema(EntityKind::Enum, to_schema, name),
            ),
            AlterEnum { enum_type, .. } => fp.write(Resource::of(enum_type), Alter),
            RecreateEnum { to, columns, .. } => {
                fp.write(Resource::of(to), Alter);
                for column in columns {
                    fp.read(Resource::of(column));
                }
            }

            CreateSequence { sequence } => fp.write(Resource::of(sequence), Create),
            DropSequence { sequence } => fp.write(Resource::of(sequence), Drop),
            RenameSequence { schema, from, to } => fp.rename(
                Resource::in_schema(EntityKind::Sequence, schema, from),
                Resource::in_schema(EntityKind::Sequence, schema, to),
            ),
            MoveSequence {
                name,
                from_schema,
                to_schema,
            } => fp.rename(
                Resource::in_schema(EntityKind::Sequence, from_schema, name),
                Resource::in_schema(EntityKind::Sequence, to_schema, name),
            ),
            AlterSequence { sequence, .. } => fp.write(Resource::of(sequence), Alter),

            CreateRole { role } => fp.write(Resource::of(role), Create),
            DropRole { role } => fp.write(Resource::of(role), Drop),
            RenameRole { from, to } => fp.rename(Resource::role(from), Resource::role(to)),
            AlterRole { role, .. } => fp.write(Resource::of(role), Alter),

            CreateTable { table } => {
                fp.write(Resource::table(&table.schema, &table.name), Create);
                for column in &table.columns {
                    fp.column_type(column);
                }
                for fk in &table.fks {
                    fp.fk_target(fk);
                }
            }
            DropTable { table } => fp.write(Resource::table(&table.schema, &table.name), Drop),
            RenameTable { schema, from, to } => {
                fp.rename(Resource::table(schema, from), Resource::table(schema, to))
            }
            MoveTable {
                name,
                from_schema,
                to_schema,
            } => fp.rename(
                Resource::table(from_schema, name),
                Resource::table(to_schema, name),
            ),
            RecreateTable { to, .. } => {
                fp.write(Resource::table(&to.schema, &to.name), Alter);
                for column in &to.columns {
                    fp.column_type(column);
                }
                for fk in &to.fks {
                    fp.fk_target(fk);
                }
            }

            AddColumn { column } => fp.column(column, Create),
            DropColumn { column } => {
                fp.write(Resource::of(column), Drop);
                fp.read(Resource::table(&column.schema, &column.table));
            }
            RenameColumn {
                schema,
                table,
                from,
                to,
            } => {
                fp.rename(
                    Resource::column(schema, table, from),
                    Resource::column(schema, table, to),
                );
                fp.read(Resource::table(schema, table));
            }
            AlterColumn { to, .. } | RecreateColumn { to, .. } => fp.column(to, Alter),

            CreateIndex { index } => {
                fp.write(Resource::of(index), Create);
                fp.columns_of(
                    &index.schema,
                    &index.table,
                    index
                        .columns
                        .iter()
                        .filter(|c| !c.is_expression)
                        .map(|c| c.value.as_str()),
                );
            }
            DropIndex { index } => fp.table_child(Resource::of(index), Drop),
            RenameIndex {
                schema,
                table,
                from,
                to,
            } => {
                fp.rename(
                    Resource::in_table(EntityKind::Index, schema, table, from),
                    Resource::in_table(EntityKind::Index, schema, table, to),
                );
                fp.read(Resource::table(schema, table));
            }
            RecreateIndex { to, .. } => {
                fp.write(Resource::of(to), Alter);
                fp.columns_of(
                    &to.schema,
                    &to.table,
                    to.columns
                        .iter()
                        .filter(|c| !c.is_expression)
                        .map(|c| c.value.as_str()),
                );
            }

            AddPk { pk } => {
                fp.write(Resource::of(pk), Create);
                fp.columns_of(&pk.schema, &pk.table, pk.columns.iter().map(String::as_str));
            }
            DropPk { pk } => fp.table_child(Resource::of(pk), Drop),
            AlterPk { to, .. } => {
                fp.write(Resource::of(to), Alter);
                fp.columns_of(&to.schema, &to.table, to.columns.iter().map(String::as_str));
            }
            AddUnique { unique } => {
                fp.write(Resource::of(unique), Create);
                fp.columns_of(
                    &unique.schema,
                    &unique.table,
                    unique.columns.iter().map(String::as_str),
                );
            }
            DropUnique { unique } => fp.table_child(Resource::of(unique), Drop),
            AlterUnique { to, .. } => {
                fp.write(Resource::of(to), Alter);
                fp.columns_of(&to.schema, &to.table, to.columns.iter().map(String::as_str));
            }
            AddCheck { check } => fp.table_child(Resource::of(check), Create),
            DropCheck { check } => fp.table_child(Resource::of(check), Drop),
            AlterCheck { to, .. } => fp.table_child(Resource::of(to), Alter),
            CreateFk { fk } => fp.fk(fk, Create),
            DropFk { fk } => fp.table_child(Resource::of(fk), Drop),
            RecreateFk { to, .. } => fp.fk(to, Alter),
            RenameConstraint {
                schema,
                table,
                kind,
                from,
                to,
            } => {
                fp.rename(
                    Resource::in_table(*kind, schema, table, from),
                    Resource::in_table(*kind, schema, table, to),
                );
                fp.read(Resource::table(schema, table));
            }

            CreateView { view } => fp.write(Resource::of(view), Create),
            DropView { view } => fp.write(Resource::of(view), Drop),
            RenameView {
                schema, from, to, ..
            } => fp.rename(
                Resource::in_schema(EntityKind::View, schema, from),
                Resource::in_schema(EntityKind::View, schema, to),
            ),
            MoveView {
                name,
                from_schema,
                to_schema,
                ..
            } => fp.rename(
                Resource::in_schema(EntityKind::View, from_schema, name),
                Resource::in_schema(EntityKind::View, to_schema, name),
            ),
            AlterView { view, .. } => fp.write(Resource::of(view), Alter),
            RecreateView { to, .. } => fp.write(Resource::of(to), Alter),

            CreatePolicy { policy } => {
                fp.table_child(Resource::of(policy), Create);
                for role in &policy.roles {
                    fp.read(Resource::role(role));
                }
            }
            DropPolicy { policy } => fp.table_child(Resource::of(policy), Drop),
            RenamePolicy {
                schema,
                table,
                from,
                to,
            } => {
                fp.rename(
                    Resource::in_table(EntityKind::Policy, schema, table, from),
                    Resource::in_table(EntityKind::Policy, schema, table, to),
                );
                fp.read(Resource::table(schema, table));
            }
            AlterPolicy { policy, .. } | RecreatePolicy { to: policy, .. } => {
                fp.table_child(Resource::of(policy), Alter);
                for role in &policy.roles {
                    fp.read(Resource::role(role));
                }
            }
            AlterRls { schema, table, .. } => fp.write(Resource::table(schema, table), Alter),

            GrantPrivilege { privilege } => {
                fp.table_child(Resource::of(privilege), Create);
                fp.read(Resource::role(&privilege.grantee));
            }
            RevokePrivilege { privilege } => fp.table_child(Resource::of(privilege), Drop),
        }
        fp
    }

    /// Every resource the statement addresses, written or read.
    pub fn touched(&self) -> impl Iterator<Item = &Resource> {
        self.writes.iter().map(|(r, _)| r).chain(self.reads.iter())
    }

    /// How the statement writes `resource`, if it does.
    pub fn access(&self, resource: &Resource) -> Option<Access> {
        self.writes
            .iter()
            .find(|(r, _)| r == resource)
            .map(|(_, a)| *a)
    }

    /// Whether the statement addresses `target` or anything it contains.
    pub fn addresses(&self, target: &Resource) -> bool {
        self.touched().any(|r| target.covers(r))
    }

    fn write(&mut self, resource: Resource, access: Access) {
        self.writes.push((resource, access));
    }

    fn read(&mut self, resource: Resource) {
        if !self.reads.contains(&resource) {
            self.reads.push(resource);
        }
    }

    fn rename(&mut self, from: Resource, to: Resource) {
        self.write(from, Access::RenameFrom);
        self.write(to, Access::RenameTo);
    }

    fn table_child(&mut self, resource: Resource, access: Access) {
        if let Some(parent) = resource.key.parent() {
            self.read(Resource::new(EntityKind::Table, parent));
        }
        self.write(resource, access);
    }

    fn column(&mut self, column: &Column, access: Access) {
        self.table_child(Resource::of(column), access);
        self.column_type(column);
    }

    fn column_type(&mut self, column: &Column) {
        if let Some(type_schema) = &column.type_schema {
            let (base, _) = split_array_type(&column.sql_type);
            self.read(Resource::in_schema(EntityKind::Enum, type_schema, base));
        }
    }

    fn columns_of<'a>(&mut self, schema: &str, table: &str, columns: impl Iterator<Item = &'a str>) {
        self.read(Resource::table(schema, table));
        for column in columns {
            self.read(Resource::column(schema, table, column));
        }
    }

    fn fk_target(&mut self, fk: &ForeignKey) {
        self.columns_of(
            &fk.schema_to,
            &fk.table_to,
            fk.columns_to.iter().map(String::as_str),
        );
    }

    fn fk(&mut self, fk: &ForeignKey, access: Access) {
        self.write(Resource::of(fk), access);
        self.columns_of(&fk.schema, &fk.table, fk.columns.iter().map(String::as_str));
        self.fk_target(fk);
    }
}

/// Why `a` and `b`, taken from different branches, do not commute. `None`
/// when no rule applies.
pub fn conflict_reason(a: &JsonStatement, b: &JsonStatement) -> Option<String> {
    let (fa, fb) = (Footprint::of(a), Footprint::of(b));

    grant_revoke(a, b)
        .or_else(|| dropped(&fa, b, &fb))
        .or_else(|| dropped(&fb, a, &fa))
        .or_else(|| renamed(a, &fa, b, &fb))
        .or_else(|| renamed(b, &fb, a, &fa))
        .or_else(|| same_resource(a, &fa, b, &fb))
}

fn grant_revoke(a: &JsonStatement, b: &JsonStatement) -> Option<String> {
    use JsonStatement::{GrantPrivilege, RevokePrivilege};

    match (a, b) {
        (GrantPrivilege { privilege: g }, RevokePrivilege { privilege: r })
        | (RevokePrivilege { privilege: r }, GrantPrivilege { privilege: g })
            if g.key() == r.key() =>
        {
            Some(format!(
                "Granting and revoking {} to \"{}\" on \"{}.{}\" conflict across branches",
                g.kind.as_sql(),
                g.grantee,
                g.schema,
                g.table
            ))
        }
        _ => None,
    }
}

/// `dropper` drops something the other statement still addresses.
fn dropped(dropper: &Footprint, other: &JsonStatement, fo: &Footprint) -> Option<String> {
    dropper
        .writes
        .iter()
        .filter(|(_, access)| *access == Access::Drop)
        .find(|(target, _)| fo.addresses(target) && fo.access(target) != Some(Access::Drop))
        .map(|(target, _)| {
            format!(
                "Dropping {} {} conflicts with {} on the other branch ({} is gone)",
                target.article(),
                target.kind,
                other.summary(),
                quoted(target)
            )
        })
}

fn quoted(resource: &Resource) -> String {
    format!("\"{}\"", resource.key)
}

/// `renamer` renames or moves something the other statement addresses under
/// its old or new name.
fn renamed(
    renamer: &JsonStatement,
    fr: &Footprint,
    other: &JsonStatement,
    fo: &Footprint,
) -> Option<String> {
    if renamer == other {
        return None;
    }
    let verb = if renamer.type_name().starts_with("move_") {
        "Moving"
    } else {
        "Renaming"
    };
    fr.writes
        .iter()
        .filter(|(_, access)| matches!(access, Access::RenameFrom | Access::RenameTo))
        .find(|(target, _)| fo.addresses(target))
        .map(|(target, _)| {
            format!(
                "{} {} {} conflicts with {}, which addresses {}",
                verb,
                target.kind,
                quoted(target),
                other.summary(),
                if fr.access(target) == Some(Access::RenameFrom) {
                    "the old name"
                } else {
                    "the new name"
                }
            )
        })
}

fn same_resource(
    a: &JsonStatement,
    fa: &Footprint,
    b: &JsonStatement,
    fb: &Footprint,
) -> Option<String> {
    fa.writes.iter().find_map(|(resource, access)| {
        let other = fb.access(resource)?;
        if other == *access && a.type_name() == b.type_name() {
            Some(format!(
                "Both branches perform identical operations ({}) on {}",
                a.type_name(),
                resource
            ))
        } else {
            Some(format!(
                "Conflicting operations on {}: {} on one branch, {} on the other",
                resource,
                a.type_name(),
                b.type_name()
            ))
        }
    })
}
