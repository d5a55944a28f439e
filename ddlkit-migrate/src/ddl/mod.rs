//! Normalized DDL entity model.
//!
//! A schema is a flat list of entities. Each entity has a kind, a natural key
//! that is unique within that kind, and kind-specific attributes. Parents are
//! referenced by natural key (a column names its `{schema, table}`), never by
//! pointer, so two entity lists can be compared key by key.
//!
//! Lists are assembled with [`DdlBuilder`] and frozen into a [`Ddl`]. The
//! container performs no validation; see [`crate::validate`].

mod entities;
mod normalize;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateResult, MigrationError};

pub use entities::{
    Check, Column, EnumType, ForeignKey, Generated, GeneratedKind, Identity, IdentityKind, Index,
    IndexColumn, Policy, PolicyAs, PolicyFor, PrimaryKey, Privilege, PrivilegeType,
    ReferentialAction, Role, Schema, Sequence, Table, Unique, View,
};
pub use normalize::{normalize_expression, normalize_type, split_array_type};

/// Schema assumed when an entity does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL.
    Postgresql,
    /// CockroachDB (PostgreSQL wire compatible).
    Cockroach,
    /// MySQL.
    Mysql,
    /// SQLite.
    Sqlite,
    /// Microsoft SQL Server.
    Mssql,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 5] = [
        Self::Postgresql,
        Self::Cockroach,
        Self::Mysql,
        Self::Sqlite,
        Self::Mssql,
    ];

    /// Name as written in snapshots and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Cockroach => "cockroach",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Mssql => "mssql",
        }
    }

    /// Whether the dialect has the concept behind an entity kind.
    pub fn supports(&self, kind: EntityKind) -> bool {
        match self {
            Self::Postgresql | Self::Cockroach => true,
            Self::Mssql => !matches!(
                kind,
                EntityKind::Enum
                    | EntityKind::Sequence
                    | EntityKind::Role
                    | EntityKind::Policy
                    | EntityKind::Privilege
            ),
            Self::Mysql | Self::Sqlite => matches!(
                kind,
                EntityKind::Table
                    | EntityKind::Column
                    | EntityKind::Index
                    | EntityKind::Unique
                    | EntityKind::Check
                    | EntityKind::Pk
                    | EntityKind::Fk
                    | EntityKind::View
            ),
        }
    }

    /// Whether index names share one namespace per schema.
    pub fn schema_scoped_index_names(&self) -> bool {
        matches!(self, Self::Postgresql | Self::Cockroach)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Self::Postgresql),
            "cockroach" | "cockroachdb" => Ok(Self::Cockroach),
            "mysql" => Ok(Self::Mysql),
            "sqlite" => Ok(Self::Sqlite),
            "mssql" | "sqlserver" => Ok(Self::Mssql),
            other => Err(MigrationError::other(format!("unknown dialect '{}'", other))),
        }
    }
}

/// Entity discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Schema,
    Enum,
    Sequence,
    Role,
    Table,
    Column,
    Index,
    Pk,
    Unique,
    Check,
    Fk,
    Policy,
    View,
    Privilege,
}

impl EntityKind {
    /// Kinds in dependency order. Diffing and [`Ddl::list`] follow it.
    pub const ALL: [EntityKind; 14] = [
        Self::Schema,
        Self::Enum,
        Self::Sequence,
        Self::Role,
        Self::Table,
        Self::Column,
        Self::Index,
        Self::Pk,
        Self::Unique,
        Self::Check,
        Self::Fk,
        Self::Policy,
        Self::View,
        Self::Privilege,
    ];

    /// The `entityType` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Enum => "enum",
            Self::Sequence => "sequence",
            Self::Role => "role",
            Self::Table => "table",
            Self::Column => "column",
            Self::Index => "index",
            Self::Pk => "pk",
            Self::Unique => "unique",
            Self::Check => "check",
            Self::Fk => "fk",
            Self::Policy => "policy",
            Self::View => "view",
            Self::Privilege => "privilege",
        }
    }

    /// Human readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pk => "primary key",
            Self::Fk => "foreign key",
            Self::Unique => "unique constraint",
            Self::Check => "check constraint",
            other => other.as_str(),
        }
    }

    /// Plural of [`label`](Self::label).
    pub fn plural(&self) -> String {
        match self {
            Self::Index => "indexes".to_string(),
            Self::Privilege => "privileges".to_string(),
            other => format!("{}s", other.label()),
        }
    }

    /// Whether entities of this kind live inside a table.
    pub fn is_table_scoped(&self) -> bool {
        matches!(
            self,
            Self::Column
                | Self::Index
                | Self::Pk
                | Self::Unique
                | Self::Check
                | Self::Fk
                | Self::Policy
                | Self::Privilege
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Natural key of an entity, unique within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub name: String,
}

impl EntityKey {
    /// Key of a top-level entity (schema, role).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: None,
            name: name.into(),
        }
    }

    /// Key of a schema-level entity (table, view, enum, sequence).
    pub fn in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: None,
            name: name.into(),
        }
    }

    /// Key of a table-level entity.
    pub fn in_table(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: Some(schema.into()),
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Key of the owning table, for table-scoped entities.
    pub fn parent(&self) -> Option<EntityKey> {
        match (&self.schema, &self.table) {
            (Some(schema), Some(table)) => Some(Self::in_schema(schema.clone(), table.clone())),
            _ => None,
        }
    }

    pub(crate) fn schema_or_default(&self) -> &str {
        self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        if let Some(table) = &self.table {
            write!(f, "{}.", table)?;
        }
        f.write_str(&self.name)
    }
}

/// Any DDL entity, tagged by `entityType` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", rename_all = "lowercase")]
pub enum Entity {
    Schema(Schema),
    Enum(EnumType),
    Sequence(Sequence),
    Role(Role),
    Table(Table),
    Column(Column),
    Index(Index),
    Pk(PrimaryKey),
    Unique(Unique),
    Check(Check),
    Fk(ForeignKey),
    Policy(Policy),
    View(View),
    Privilege(Privilege),
}

impl Entity {
    /// Discriminant of the entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Schema(_) => EntityKind::Schema,
            Self::Enum(_) => EntityKind::Enum,
            Self::Sequence(_) => EntityKind::Sequence,
            Self::Role(_) => EntityKind::Role,
            Self::Table(_) => EntityKind::Table,
            Self::Column(_) => EntityKind::Column,
            Self::Index(_) => EntityKind::Index,
            Self::Pk(_) => EntityKind::Pk,
            Self::Unique(_) => EntityKind::Unique,
            Self::Check(_) => EntityKind::Check,
            Self::Fk(_) => EntityKind::Fk,
            Self::Policy(_) => EntityKind::Policy,
            Self::View(_) => EntityKind::View,
            Self::Privilege(_) => EntityKind::Privilege,
        }
    }

    /// Natural key of the entity.
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Schema(e) => e.key(),
            Self::Enum(e) => e.key(),
            Self::Sequence(e) => e.key(),
            Self::Role(e) => e.key(),
            Self::Table(e) => e.key(),
            Self::Column(e) => e.key(),
            Self::Index(e) => e.key(),
            Self::Pk(e) => e.key(),
            Self::Unique(e) => e.key(),
            Self::Check(e) => e.key(),
            Self::Fk(e) => e.key(),
            Self::Policy(e) => e.key(),
            Self::View(e) => e.key(),
            Self::Privilege(e) => e.key(),
        }
    }
}

/// Behaviour shared by every entity struct.
pub trait DdlEntity:
    Clone + fmt::Debug + PartialEq + Serialize + Send + Sync + Into<Entity> + 'static
{
    /// Kind of this entity type.
    const KIND: EntityKind;

    /// Natural key.
    fn key(&self) -> EntityKey;

    /// Re-home the entity under another natural key.
    fn set_key(&mut self, key: &EntityKey);

    /// Extract from the tagged form.
    fn from_entity(entity: Entity) -> Option<Self>;

    /// Entities of this kind in a container.
    fn all(ddl: &Ddl) -> &[Self];

    #[doc(hidden)]
    fn all_mut(ddl: &mut Ddl) -> &mut Vec<Self>;

    /// Structural equality ignoring the natural key.
    fn same_shape(&self, other: &Self) -> bool {
        let mut moved = self.clone();
        moved.set_key(&other.key());
        moved == *other
    }
}

macro_rules! ddl_entity {
    ($ty:ty, $variant:ident, $field:ident) => {
        impl From<$ty> for Entity {
            fn from(value: $ty) -> Self {
                Entity::$variant(value)
            }
        }

        impl DdlEntity for $ty {
            const KIND: EntityKind = EntityKind::$variant;

            fn key(&self) -> EntityKey {
                key_of!(self, $variant)
            }

            fn set_key(&mut self, key: &EntityKey) {
                set_key_of!(self, key, $variant)
            }

            fn from_entity(entity: Entity) -> Option<Self> {
                match entity {
                    Entity::$variant(value) => Some(value),
                    _ => None,
                }
            }

            fn all(ddl: &Ddl) -> &[Self] {
                &ddl.$field
            }

            fn all_mut(ddl: &mut Ddl) -> &mut Vec<Self> {
                &mut ddl.$field
            }
        }
    };
}

macro_rules! key_of {
    ($e:expr, Schema) => {
        EntityKey::named($e.name.clone())
    };
    ($e:expr, Role) => {
        EntityKey::named($e.name.clone())
    };
    ($e:expr, Privilege) => {
        EntityKey::in_table(
            $e.schema.clone(),
            $e.table.clone(),
            format!("{}:{}", $e.grantee, $e.kind.as_sql()),
        )
    };
    ($e:expr, Table) => {
        EntityKey::in_schema($e.schema.clone(), $e.name.clone())
    };
    ($e:expr, Enum) => {
        EntityKey::in_schema($e.schema.clone(), $e.name.clone())
    };
    ($e:expr, Sequence) => {
        EntityKey::in_schema($e.schema.clone(), $e.name.clone())
    };
    ($e:expr, View) => {
        EntityKey::in_schema($e.schema.clone(), $e.name.clone())
    };
    ($e:expr, $other:ident) => {
        EntityKey::in_table($e.schema.clone(), $e.table.clone(), $e.name.clone())
    };
}

macro_rules! set_key_of {
    (@schema $e:expr, $key:expr) => {{
        $e.schema = $key.schema_or_default().to_string();
        $e.name = $key.name.clone();
    }};
    ($e:expr, $key:expr, Schema) => {
        $e.name = $key.name.clone()
    };
    ($e:expr, $key:expr, Role) => {
        $e.name = $key.name.clone()
    };
    ($e:expr, $key:expr, Privilege) => {{
        $e.schema = $key.schema_or_default().to_string();
        $e.table = $key.table.clone().unwrap_or_default();
        if let Some((grantee, _)) = $key.name.split_once(':') {
            $e.grantee = grantee.to_string();
        }
    }};
    ($e:expr, $key:expr, Table) => {
        set_key_of!(@schema $e, $key)
    };
    ($e:expr, $key:expr, Enum) => {
        set_key_of!(@schema $e, $key)
    };
    ($e:expr, $key:expr, Sequence) => {
        set_key_of!(@schema $e, $key)
    };
    ($e:expr, $key:expr, View) => {
        set_key_of!(@schema $e, $key)
    };
    ($e:expr, $key:expr, $other:ident) => {{
        $e.schema = $key.schema_or_default().to_string();
        $e.table = $key.table.clone().unwrap_or_default();
        $e.name = $key.name.clone();
    }};
}

ddl_entity!(Schema, Schema, schemas);
ddl_entity!(EnumType, Enum, enums);
ddl_entity!(Sequence, Sequence, sequences);
ddl_entity!(Role, Role, roles);
ddl_entity!(Table, Table, tables);
ddl_entity!(Column, Column, columns);
ddl_entity!(Index, Index, indexes);
ddl_entity!(PrimaryKey, Pk, pks);
ddl_entity!(Unique, Unique, uniques);
ddl_entity!(Check, Check, checks);
ddl_entity!(ForeignKey, Fk, fks);
ddl_entity!(Policy, Policy, policies);
ddl_entity!(View, View, views);
ddl_entity!(Privilege, Privilege, privileges);

/// Immutable, per-kind ordered collection of entities.
///
/// Serializes as the flattened [`list`](Ddl::list).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Entity>", into = "Vec<Entity>")]
pub struct Ddl {
    pub(crate) schemas: Vec<Schema>,
    pub(crate) enums: Vec<EnumType>,
    pub(crate) sequences: Vec<Sequence>,
    pub(crate) roles: Vec<Role>,
    pub(crate) tables: Vec<Table>,
    pub(crate) columns: Vec<Column>,
    pub(crate) indexes: Vec<Index>,
    pub(crate) pks: Vec<PrimaryKey>,
    pub(crate) uniques: Vec<Unique>,
    pub(crate) checks: Vec<Check>,
    pub(crate) fks: Vec<ForeignKey>,
    pub(crate) policies: Vec<Policy>,
    pub(crate) views: Vec<View>,
    pub(crate) privileges: Vec<Privilege>,
}

impl Ddl {
    /// An empty schema.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a schema.
    pub fn builder() -> DdlBuilder {
        DdlBuilder::new()
    }

    /// Rebuild from a flattened list.
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut builder = DdlBuilder::new();
        builder.extend(entities);
        builder.build()
    }

    /// Flatten into one list, kind groups in dependency order, insertion
    /// order within a kind.
    pub fn list(&self) -> Vec<Entity> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.schemas.iter().cloned().map(Entity::from));
        out.extend(self.enums.iter().cloned().map(Entity::from));
        out.extend(self.sequences.iter().cloned().map(Entity::from));
        out.extend(self.roles.iter().cloned().map(Entity::from));
        out.extend(self.tables.iter().cloned().map(Entity::from));
        out.extend(self.columns.iter().cloned().map(Entity::from));
        out.extend(self.indexes.iter().cloned().map(Entity::from));
        out.extend(self.pks.iter().cloned().map(Entity::from));
        out.extend(self.uniques.iter().cloned().map(Entity::from));
        out.extend(self.checks.iter().cloned().map(Entity::from));
        out.extend(self.fks.iter().cloned().map(Entity::from));
        out.extend(self.policies.iter().cloned().map(Entity::from));
        out.extend(self.views.iter().cloned().map(Entity::from));
        out.extend(self.privileges.iter().cloned().map(Entity::from));
        out
    }

    /// Total number of entities.
    pub fn len(&self) -> usize {
        self.schemas.len()
            + self.enums.len()
            + self.sequences.len()
            + self.roles.len()
            + self.tables.len()
            + self.columns.len()
            + self.indexes.len()
            + self.pks.len()
            + self.uniques.len()
            + self.checks.len()
            + self.fks.len()
            + self.policies.len()
            + self.views.len()
            + self.privileges.len()
    }

    /// Whether there are no entities at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entities of one kind.
    pub fn entities<E: DdlEntity>(&self) -> &[E] {
        E::all(self)
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn enums(&self) -> &[EnumType] {
        &self.enums
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn pks(&self) -> &[PrimaryKey] {
        &self.pks
    }

    pub fn uniques(&self) -> &[Unique] {
        &self.uniques
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn fks(&self) -> &[ForeignKey] {
        &self.fks
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn privileges(&self) -> &[Privilege] {
        &self.privileges
    }

    /// Look up a table.
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// Columns of a table in declaration order.
    pub fn columns_of<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> impl Iterator<Item = &'a Column> + 'a {
        self.columns
            .iter()
            .filter(move |c| c.schema == schema && c.table == table)
    }

    /// Indexes of a table.
    pub fn indexes_of<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> impl Iterator<Item = &'a Index> + 'a {
        self.indexes
            .iter()
            .filter(move |i| i.schema == schema && i.table == table)
    }

    /// Primary key of a table.
    pub fn pk_of(&self, schema: &str, table: &str) -> Option<&PrimaryKey> {
        self.pks
            .iter()
            .find(|pk| pk.schema == schema && pk.table == table)
    }

    /// Unique constraints of a table.
    pub fn uniques_of<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> impl Iterator<Item = &'a Unique> + 'a {
        self.uniques
            .iter()
            .filter(move |u| u.schema == schema && u.table == table)
    }

    /// Check constraints of a table.
    pub fn checks_of<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> impl Iterator<Item = &'a Check> + 'a {
        self.checks
            .iter()
            .filter(move |c| c.schema == schema && c.table == table)
    }

    /// Foreign keys owned by a table.
    pub fn fks_of<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.fks
            .iter()
            .filter(move |fk| fk.schema == schema && fk.table == table)
    }

    /// Look up an enum type.
    pub fn enum_type(&self, schema: &str, name: &str) -> Option<&EnumType> {
        self.enums
            .iter()
            .find(|e| e.schema == schema && e.name == name)
    }

    /// Three-way merge: start from `ours`, then apply every change `theirs`
    /// made relative to `base`. On a key changed by both sides `theirs` wins;
    /// callers run the commutativity check first so that does not happen for
    /// branches they accept.
    pub fn three_way_merge(base: &Ddl, ours: &Ddl, theirs: &Ddl) -> Ddl {
        Ddl {
            schemas: merge_kind(base, ours, theirs),
            enums: merge_kind(base, ours, theirs),
            sequences: merge_kind(base, ours, theirs),
            roles: merge_kind(base, ours, theirs),
            tables: merge_kind(base, ours, theirs),
            columns: merge_kind(base, ours, theirs),
            indexes: merge_kind(base, ours, theirs),
            pks: merge_kind(base, ours, theirs),
            uniques: merge_kind(base, ours, theirs),
            checks: merge_kind(base, ours, theirs),
            fks: merge_kind(base, ours, theirs),
            policies: merge_kind(base, ours, theirs),
            views: merge_kind(base, ours, theirs),
            privileges: merge_kind(base, ours, theirs),
        }
    }
}

fn merge_kind<E: DdlEntity>(base: &Ddl, ours: &Ddl, theirs: &Ddl) -> Vec<E> {
    let base: IndexMap<EntityKey, &E> = E::all(base).iter().map(|e| (e.key(), e)).collect();
    let theirs_map: IndexMap<EntityKey, &E> =
        E::all(theirs).iter().map(|e| (e.key(), e)).collect();

    let mut merged: IndexMap<EntityKey, E> = E::all(ours)
        .iter()
        .map(|e| (e.key(), e.clone()))
        .collect();

    for (key, entity) in &theirs_map {
        if base.get(key).is_none_or(|b| *b != *entity) {
            merged.insert(key.clone(), (*entity).clone());
        }
    }
    for key in base.keys() {
        if !theirs_map.contains_key(key) {
            merged.shift_remove(key);
        }
    }

    merged.into_values().collect()
}

impl From<Vec<Entity>> for Ddl {
    fn from(entities: Vec<Entity>) -> Self {
        Ddl::from_entities(entities)
    }
}

impl From<Ddl> for Vec<Entity> {
    fn from(ddl: Ddl) -> Self {
        ddl.list()
    }
}

/// Mutable accumulator, frozen with [`build`](DdlBuilder::build).
#[derive(Debug, Default)]
pub struct DdlBuilder {
    ddl: Ddl,
}

impl DdlBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity.
    pub fn push(&mut self, entity: impl Into<Entity>) -> &mut Self {
        let ddl = &mut self.ddl;
        match entity.into() {
            Entity::Schema(e) => ddl.schemas.push(e),
            Entity::Enum(e) => ddl.enums.push(e),
            Entity::Sequence(e) => ddl.sequences.push(e),
            Entity::Role(e) => ddl.roles.push(e),
            Entity::Table(e) => ddl.tables.push(e),
            Entity::Column(e) => ddl.columns.push(e),
            Entity::Index(e) => ddl.indexes.push(e),
            Entity::Pk(e) => ddl.pks.push(e),
            Entity::Unique(e) => ddl.uniques.push(e),
            Entity::Check(e) => ddl.checks.push(e),
            Entity::Fk(e) => ddl.fks.push(e),
            Entity::Policy(e) => ddl.policies.push(e),
            Entity::View(e) => ddl.views.push(e),
            Entity::Privilege(e) => ddl.privileges.push(e),
        }
        self
    }

    /// Append an entity, consuming the builder.
    pub fn with(mut self, entity: impl Into<Entity>) -> Self {
        self.push(entity);
        self
    }

    /// Append many entities, consuming the builder.
    pub fn with_all(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.extend(entities);
        self
    }

    /// Append many entities.
    pub fn extend(&mut self, entities: impl IntoIterator<Item = Entity>) -> &mut Self {
        for entity in entities {
            self.push(entity);
        }
        self
    }

    /// Freeze into an immutable [`Ddl`].
    pub fn build(self) -> Ddl {
        self.ddl
    }
}

/// A declared schema as handed over by a schema DSL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdlDocument {
    /// Target dialect.
    pub dialect: Dialect,
    /// Entities.
    pub ddl: Ddl,
}

impl DdlDocument {
    /// Read a declared-schema document (`{ "dialect": ..., "ddl": [...] }`).
    pub async fn load(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| {
            MigrationError::other(format!("failed to parse schema {}: {}", path.display(), e))
        })
    }

    /// Write the document as pretty JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> MigrateResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
