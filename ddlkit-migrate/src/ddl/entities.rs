//! One struct per entity kind.
//!
//! Field names serialize in camelCase; optional attributes are omitted when
//! unset so snapshots stay small and stable across releases.

use serde::{Deserialize, Serialize};

use super::DEFAULT_SCHEMA;

pub(crate) fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "btree".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// A database schema (namespace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Schema name.
    pub name: String,
}

impl Schema {
    /// Create a schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A table. Columns and constraints are separate entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Owning schema.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Whether row level security is enabled.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_rls_enabled: bool,
}

impl Table {
    /// Create a table in a schema.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            is_rls_enabled: false,
        }
    }

    /// Enable row level security.
    pub fn with_rls(mut self) -> Self {
        self.is_rls_enabled = true;
        self
    }
}

/// Storage of a generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedKind {
    /// Computed on write.
    Stored,
    /// Computed on read.
    Virtual,
}

/// `GENERATED ALWAYS AS (...)` definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    /// Storage kind.
    #[serde(rename = "type")]
    pub kind: GeneratedKind,
    /// Generation expression.
    #[serde(rename = "as")]
    pub expression: String,
}

/// Identity column flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityKind {
    /// `GENERATED ALWAYS AS IDENTITY`.
    Always,
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    ByDefault,
}

/// Identity column options. Unset options use the database defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Identity flavour.
    #[serde(rename = "type")]
    pub kind: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cycle: bool,
}

impl Identity {
    /// Identity with default options.
    pub fn new(kind: IdentityKind) -> Self {
        Self {
            kind,
            increment: None,
            min_value: None,
            max_value: None,
            start_with: None,
            cache: None,
            cycle: false,
        }
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub name: String,
    /// SQL type without array brackets, e.g. `varchar(255)`.
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Schema of a user-defined type (enum). `None` for builtin types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_schema: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_null: bool,
    /// Array depth; 0 for scalars.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dimensions: u32,
    /// Default expression, already normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Generated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

impl Column {
    /// Create a nullable column of a builtin type.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        sql_type: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            sql_type: sql_type.into(),
            type_schema: None,
            not_null: false,
            dimensions: 0,
            default: None,
            generated: None,
            identity: None,
        }
    }

    /// Mark the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Set the default expression.
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Use an enum type living in `schema`.
    pub fn enum_type(mut self, schema: impl Into<String>) -> Self {
        self.type_schema = Some(schema.into());
        self
    }

    /// Whether the column type is a user-defined type.
    pub fn is_user_type(&self) -> bool {
        self.type_schema.is_some()
    }
}

/// One key part of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexColumn {
    /// Column name, or expression text when `is_expression`.
    pub value: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_expression: bool,
    #[serde(default = "default_true")]
    pub asc: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nulls_first: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opclass: Option<String>,
}

impl IndexColumn {
    /// Ascending column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            value: name.into(),
            is_expression: false,
            asc: true,
            nulls_first: false,
            opclass: None,
        }
    }

    /// Ascending expression key.
    pub fn expression(expr: impl Into<String>) -> Self {
        Self {
            is_expression: true,
            ..Self::column(expr)
        }
    }
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<IndexColumn>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_unique: bool,
    /// Access method, `btree` unless stated.
    #[serde(default = "default_method")]
    pub method: String,
    /// Partial index predicate.
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    /// Create with `CONCURRENTLY`. Not part of the index shape.
    #[serde(default, skip_serializing_if = "is_false")]
    pub concurrently: bool,
    /// Storage parameters, e.g. `fillfactor=70`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with: Option<String>,
}

impl Index {
    /// Create a btree index over plain columns.
    pub fn new<I, S>(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            columns: columns.into_iter().map(IndexColumn::column).collect(),
            is_unique: false,
            method: default_method(),
            where_clause: None,
            concurrently: false,
            with: None,
        }
    }

    /// Make the index unique.
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unique {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nulls_not_distinct: bool,
}

/// A check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Normalized boolean expression.
    pub value: String,
}

/// A primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKey {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
}

/// `ON UPDATE` / `ON DELETE` action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    #[serde(rename = "no action")]
    NoAction,
    #[serde(rename = "restrict")]
    Restrict,
    #[serde(rename = "cascade")]
    Cascade,
    #[serde(rename = "set null")]
    SetNull,
    #[serde(rename = "set default")]
    SetDefault,
}

impl ReferentialAction {
    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default = "default_schema")]
    pub schema_to: String,
    pub table_to: String,
    pub columns_to: Vec<String>,
    #[serde(default)]
    pub on_update: ReferentialAction,
    #[serde(default)]
    pub on_delete: ReferentialAction,
}

/// A view or materialized view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    /// Query text. `None` marks a view managed outside ddlkit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub materialized: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub with_no_data: bool,
    /// `local` or `cascaded` for updatable views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_option: Option<String>,
}

/// A user-defined enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumType {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    pub values: Vec<String>,
}

impl EnumType {
    /// Create an enum type.
    pub fn new<I, S>(schema: impl Into<String>, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A standalone sequence. Numeric options are kept as text to avoid
/// overflow on `bigint` bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cycle: bool,
}

/// A database role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_db: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_role: bool,
    #[serde(default = "default_true")]
    pub inherit: bool,
}

impl Role {
    /// Role with default attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            create_db: false,
            create_role: false,
            inherit: true,
        }
    }
}

/// `AS PERMISSIVE | RESTRICTIVE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAs {
    #[default]
    Permissive,
    Restrictive,
}

/// `FOR ALL | SELECT | INSERT | UPDATE | DELETE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyFor {
    #[default]
    All,
    Select,
    Insert,
    Update,
    Delete,
}

/// A row level security policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub name: String,
    #[serde(rename = "as", default)]
    pub kind: PolicyAs,
    #[serde(rename = "for", default)]
    pub command: PolicyFor,
    /// Target roles; empty means `public`.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check: Option<String>,
}

impl Policy {
    /// Permissive `FOR ALL TO public` policy.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            kind: PolicyAs::Permissive,
            command: PolicyFor::All,
            roles: Vec::new(),
            using: None,
            with_check: None,
        }
    }
}

/// Table privilege type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrivilegeType {
    All,
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    References,
    Trigger,
}

impl PrivilegeType {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::References => "REFERENCES",
            Self::Trigger => "TRIGGER",
        }
    }

    /// Parse the keyword reported by `information_schema`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ALL" => Some(Self::All),
            "SELECT" => Some(Self::Select),
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "TRUNCATE" => Some(Self::Truncate),
            "REFERENCES" => Some(Self::References),
            "TRIGGER" => Some(Self::Trigger),
            _ => None,
        }
    }
}

/// A table-level grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Privilege {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub grantee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grantor: Option<String>,
    #[serde(rename = "type")]
    pub kind: PrivilegeType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_grantable: bool,
}

impl Privilege {
    /// Grant `kind` on a table to `grantee`.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        grantee: impl Into<String>,
        kind: PrivilegeType,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            grantee: grantee.into(),
            grantor: None,
            kind,
            is_grantable: false,
        }
    }
}
