//! Database introspection.
//!
//! An introspector reads a live catalog and produces the same [`Ddl`] shape
//! a schema DSL declares, so the two can be diffed with the ordinary diff
//! engine. Introspecting a database built from generated SQL and diffing it
//! against the declaration must give no statements; [`detect_drift`] checks
//! exactly that.
//!
//! The core never opens connections. Callers hand in a [`CatalogQuery`],
//! which runs one catalog query and returns its rows as JSON objects.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::ddl::{
    Check, Column, DEFAULT_SCHEMA, Ddl, DdlBuilder, Dialect, EnumType, ForeignKey, Generated,
    GeneratedKind, Identity, IdentityKind, Index, IndexColumn, Policy, PolicyAs, PolicyFor,
    PrimaryKey, Privilege, PrivilegeType, ReferentialAction, Role, Schema, Sequence, Table,
    Unique, View, normalize_expression, normalize_type, split_array_type,
};
use crate::diff::{DiffResult, diff};
use crate::error::{MigrateResult, MigrationError};
use crate::resolver::NoRenames;
use crate::sql::quote_literal;

/// Runs one catalog query. Each row comes back as a JSON object keyed by
/// column name.
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    async fn query(&self, sql: &str) -> MigrateResult<Vec<Value>>;
}

/// Reads a live schema.
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Dialect of the inspected database.
    fn dialect(&self) -> Dialect;

    /// Read everything `config` selects.
    async fn introspect(&self, config: &IntrospectionConfig) -> MigrateResult<IntrospectionResult>;
}

/// Result of introspecting a database.
#[derive(Debug, Clone)]
pub struct IntrospectionResult {
    /// Entities found.
    pub ddl: Ddl,
    /// Tables left out, with the reason.
    pub skipped_tables: Vec<SkippedTable>,
    /// Things that could not be represented faithfully.
    pub warnings: Vec<String>,
}

/// A table that was skipped during introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTable {
    pub schema: String,
    pub name: String,
    pub reason: String,
}

/// Configuration for introspection.
#[derive(Debug, Clone)]
pub struct IntrospectionConfig {
    /// Schemas to read (default: `public`).
    pub schemas: Vec<String>,
    /// Tables to include (empty = all).
    pub include_tables: Vec<String>,
    /// Tables to exclude.
    pub exclude_tables: Vec<String>,
    /// Whether to read views.
    pub include_views: bool,
    /// Whether to read roles.
    pub include_roles: bool,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            schemas: vec![DEFAULT_SCHEMA.to_string()],
            include_tables: Vec::new(),
            exclude_tables: vec!["__ddlkit_migrations".to_string()],
            include_views: true,
            include_roles: false,
        }
    }
}

impl IntrospectionConfig {
    /// Create a new introspection config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schemas to read.
    pub fn schemas(mut self, schemas: Vec<String>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Include only these tables.
    pub fn include_tables(mut self, tables: Vec<String>) -> Self {
        self.include_tables = tables;
        self
    }

    /// Exclude these tables.
    pub fn exclude_tables(mut self, tables: Vec<String>) -> Self {
        self.exclude_tables = tables;
        self
    }

    /// Whether to read views.
    pub fn include_views(mut self, include: bool) -> Self {
        self.include_views = include;
        self
    }

    /// Whether to read roles.
    pub fn include_roles(mut self, include: bool) -> Self {
        self.include_roles = include;
        self
    }

    /// Check if a table should be included.
    pub fn should_include_table(&self, name: &str) -> bool {
        if self.exclude_tables.iter().any(|t| t == name) {
            return false;
        }
        self.include_tables.is_empty() || self.include_tables.iter().any(|t| t == name)
    }

    fn schema_list(&self) -> String {
        self.schemas
            .iter()
            .map(|s| quote_literal(s))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Raw table row.
#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub rls_enabled: bool,
}

/// Raw column row.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// `format_type` output, array brackets included.
    pub data_type: String,
    /// Schema of an enum type, `None` for builtin types.
    pub enum_schema: Option<String>,
    /// Enum type name when `enum_schema` is set.
    pub enum_name: Option<String>,
    pub not_null: bool,
    pub default: Option<String>,
    /// `a` (always), `d` (by default) or empty.
    #[serde(default)]
    pub identity: String,
    /// `s` for stored generated columns.
    #[serde(default)]
    pub generated: String,
    pub identity_increment: Option<String>,
    pub identity_min: Option<String>,
    pub identity_max: Option<String>,
    pub identity_start: Option<String>,
    pub identity_cache: Option<String>,
    #[serde(default)]
    pub identity_cycle: bool,
}

/// Raw enum row.
#[derive(Debug, Clone, Deserialize)]
pub struct EnumInfo {
    pub schema: String,
    pub name: String,
    pub values: Vec<String>,
}

/// Raw sequence row; numbers come back as text.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceInfo {
    pub schema: String,
    pub name: String,
    pub data_type: String,
    pub increment_by: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub start_with: Option<String>,
    pub cache_size: Option<String>,
    #[serde(default)]
    pub cycle: bool,
}

/// Raw index row. Key parts are `pg_get_indexdef` output per position.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub descending: Vec<bool>,
    #[serde(default)]
    pub nulls_first: Vec<bool>,
    pub is_unique: bool,
    pub method: String,
    pub where_clause: Option<String>,
}

/// Raw constraint row.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// `p`, `u`, `c` or `f`.
    pub kind: String,
    #[serde(default)]
    pub columns: Vec<String>,
    pub schema_to: Option<String>,
    pub table_to: Option<String>,
    #[serde(default)]
    pub columns_to: Vec<String>,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
    /// `pg_get_constraintdef` output.
    pub definition: String,
    #[serde(default)]
    pub nulls_not_distinct: bool,
}

/// Raw view row.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewInfo {
    pub schema: String,
    pub name: String,
    pub definition: Option<String>,
    pub materialized: bool,
    #[serde(default = "populated")]
    pub populated: bool,
    pub check_option: Option<String>,
}

fn populated() -> bool {
    true
}

/// Raw role row.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleInfo {
    pub name: String,
    pub create_db: bool,
    pub create_role: bool,
    pub inherit: bool,
}

/// Raw policy row.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// `PERMISSIVE` or `RESTRICTIVE`.
    pub permissive: String,
    pub command: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub using: Option<String>,
    pub with_check: Option<String>,
}

/// Raw grant row.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivilegeInfo {
    pub schema: String,
    pub table: String,
    pub grantee: String,
    pub grantor: Option<String>,
    pub privilege_type: String,
    pub is_grantable: bool,
}

/// Introspector for PostgreSQL-compatible catalogs.
pub struct PostgresIntrospector<Q> {
    query: Q,
    dialect: Dialect,
}

impl<Q: CatalogQuery> PostgresIntrospector<Q> {
    /// Introspect PostgreSQL through `query`.
    pub fn new(query: Q) -> Self {
        Self {
            query,
            dialect: Dialect::Postgresql,
        }
    }

    /// Introspect CockroachDB through `query`.
    pub fn cockroach(query: Q) -> Self {
        Self {
            query,
            dialect: Dialect::Cockroach,
        }
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        template: &str,
        config: &IntrospectionConfig,
    ) -> MigrateResult<Vec<T>> {
        let sql = template.replace("$SCHEMAS", &config.schema_list());
        let tag = template.lines().next().unwrap_or_default();
        let rows = self.query.query(&sql).await?;
        debug!(query = tag, rows = rows.len(), "Catalog query");
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    MigrationError::database(format!("unexpected row for {}: {}", tag, e))
                })
            })
            .collect()
    }
}

#[async_trait]
impl<Q: CatalogQuery> Introspector for PostgresIntrospector<Q> {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[instrument(skip(self, config), fields(dialect = %self.dialect))]
    async fn introspect(&self, config: &IntrospectionConfig) -> MigrateResult<IntrospectionResult> {
        let mut state = Assembly::default();

        let schemas: Vec<String> = self
            .rows::<Value>(queries::SCHEMAS, config)
            .await?
            .into_iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str).map(str::to_string))
            .collect();
        for schema in schemas.iter().filter(|s| *s != DEFAULT_SCHEMA) {
            state.ddl.push(Schema::new(schema.clone()));
        }

        for info in self.rows::<EnumInfo>(queries::ENUMS, config).await? {
            state.ddl.push(EnumType::new(info.schema, info.name, info.values));
        }
        for info in self.rows::<SequenceInfo>(queries::SEQUENCES, config).await? {
            state.ddl.push(sequence(info));
        }
        if config.include_roles {
            for info in self.rows::<RoleInfo>(queries::ROLES, config).await? {
                state.ddl.push(Role {
                    name: info.name,
                    create_db: info.create_db,
                    create_role: info.create_role,
                    inherit: info.inherit,
                });
            }
        }

        for info in self.rows::<TableInfo>(queries::TABLES, config).await? {
            if !config.should_include_table(&info.name) {
                state.skipped.push(SkippedTable {
                    schema: info.schema,
                    name: info.name,
                    reason: "excluded by configuration".to_string(),
                });
                continue;
            }
            state.tables.insert((info.schema.clone(), info.name.clone()));
            let mut table = Table::new(info.schema, info.name);
            table.is_rls_enabled = info.rls_enabled;
            state.ddl.push(table);
        }

        for info in self.rows::<ColumnInfo>(queries::COLUMNS, config).await? {
            if state.has_table(&info.schema, &info.table) {
                state.ddl.push(column(info));
            }
        }
        for info in self.rows::<ConstraintInfo>(queries::CONSTRAINTS, config).await? {
            if state.has_table(&info.schema, &info.table) {
                state.constraint(info);
            }
        }
        for info in self.rows::<IndexInfo>(queries::INDEXES, config).await? {
            if state.has_table(&info.schema, &info.table) {
                state.ddl.push(index(info));
            }
        }
        for info in self.rows::<PolicyInfo>(queries::POLICIES, config).await? {
            if state.has_table(&info.schema, &info.table) {
                state.policy(info);
            }
        }
        for info in self.rows::<PrivilegeInfo>(queries::PRIVILEGES, config).await? {
            if state.has_table(&info.schema, &info.table) {
                state.privilege(info);
            }
        }
        if config.include_views {
            for info in self.rows::<ViewInfo>(queries::VIEWS, config).await? {
                state.ddl.push(view(info));
            }
        }

        let result = IntrospectionResult {
            ddl: state.ddl.build(),
            skipped_tables: state.skipped,
            warnings: state.warnings,
        };
        info!(
            entities = result.ddl.len(),
            skipped = result.skipped_tables.len(),
            warnings = result.warnings.len(),
            "Introspection complete"
        );
        Ok(result)
    }
}

/// Accumulates entities while rows arrive.
#[derive(Default)]
struct Assembly {
    ddl: DdlBuilder,
    tables: HashSet<(String, String)>,
    skipped: Vec<SkippedTable>,
    warnings: Vec<String>,
}

impl Assembly {
    fn has_table(&self, schema: &str, table: &str) -> bool {
        self.tables.contains(&(schema.to_string(), table.to_string()))
    }

    fn constraint(&mut self, info: ConstraintInfo) {
        match info.kind.as_str() {
            "p" => {
                self.ddl.push(PrimaryKey {
                    schema: info.schema,
                    table: info.table,
                    name: info.name,
                    columns: info.columns,
                });
            }
            "u" => {
                self.ddl.push(Unique {
                    schema: info.schema,
                    table: info.table,
                    name: info.name,
                    columns: info.columns,
                    nulls_not_distinct: info.nulls_not_distinct,
                });
            }
            "c" => {
                let body = info
                    .definition
                    .trim()
                    .strip_prefix("CHECK")
                    .unwrap_or(&info.definition);
                self.ddl.push(Check {
                    schema: info.schema,
                    table: info.table,
                    name: info.name,
                    value: normalize_expression(body),
                });
            }
            "f" => {
                let (Some(schema_to), Some(table_to)) = (info.schema_to, info.table_to) else {
                    self.warnings.push(format!(
                        "foreign key {} on {}.{} has no target",
                        info.name, info.schema, info.table
                    ));
                    return;
                };
                if !self.has_table(&schema_to, &table_to) {
                    self.warnings.push(format!(
                        "foreign key {} on {}.{} references {}.{}, which was not introspected",
                        info.name, info.schema, info.table, schema_to, table_to
                    ));
                    return;
                }
                self.ddl.push(ForeignKey {
                    schema: info.schema,
                    table: info.table,
                    name: info.name,
                    columns: info.columns,
                    schema_to,
                    table_to,
                    columns_to: info.columns_to,
                    on_update: action(info.on_update.as_deref()),
                    on_delete: action(info.on_delete.as_deref()),
                });
            }
            other => {
                warn!(kind = other, name = %info.name, "Skipping constraint");
                self.warnings.push(format!(
                    "constraint {} on {}.{} has unsupported type '{}'",
                    info.name, info.schema, info.table, other
                ));
            }
        }
    }

    fn policy(&mut self, info: PolicyInfo) {
        let command = match info.command.to_ascii_uppercase().as_str() {
            "ALL" => PolicyFor::All,
            "SELECT" => PolicyFor::Select,
            "INSERT" => PolicyFor::Insert,
            "UPDATE" => PolicyFor::Update,
            "DELETE" => PolicyFor::Delete,
            other => {
                self.warnings.push(format!(
                    "policy {} on {}.{} has unknown command '{}'",
                    info.name, info.schema, info.table, other
                ));
                return;
            }
        };
        let kind = if info.permissive.eq_ignore_ascii_case("RESTRICTIVE") {
            PolicyAs::Restrictive
        } else {
            PolicyAs::Permissive
        };
        // `{public}` is how the catalog spells "no explicit roles".
        let roles = if info.roles == ["public"] {
            Vec::new()
        } else {
            info.roles
        };
        self.ddl.push(Policy {
            schema: info.schema,
            table: info.table,
            name: info.name,
            kind,
            command,
            roles,
            using: info.using.as_deref().map(normalize_expression),
            with_check: info.with_check.as_deref().map(normalize_expression),
        });
    }

    fn privilege(&mut self, info: PrivilegeInfo) {
        let Some(kind) = PrivilegeType::parse(&info.privilege_type) else {
            self.warnings.push(format!(
                "unknown privilege '{}' on {}.{}",
                info.privilege_type, info.schema, info.table
            ));
            return;
        };
        let mut privilege = Privilege::new(info.schema, info.table, info.grantee, kind);
        privilege.grantor = info.grantor;
        privilege.is_grantable = info.is_grantable;
        self.ddl.push(privilege);
    }
}

fn column(info: ColumnInfo) -> Column {
    let (base, dimensions) = split_array_type(&info.data_type);
    let sql_type = match (&info.enum_schema, &info.enum_name) {
        (Some(_), Some(name)) => name.clone(),
        _ => normalize_type(base),
    };
    let mut column = Column::new(info.schema, info.table, info.name, sql_type);
    column.type_schema = info.enum_schema;
    column.dimensions = dimensions;
    column.not_null = info.not_null;

    match info.generated.as_str() {
        "s" => {
            column.generated = info.default.as_deref().map(|expr| Generated {
                kind: GeneratedKind::Stored,
                expression: normalize_expression(expr),
            });
        }
        _ => column.default = info.default.as_deref().map(normalize_expression),
    }

    let kind = match info.identity.as_str() {
        "a" => Some(IdentityKind::Always),
        "d" => Some(IdentityKind::ByDefault),
        _ => None,
    };
    if let Some(kind) = kind {
        let bounds = SequenceBounds::for_type(&column.sql_type);
        column.identity = Some(Identity {
            kind,
            increment: non_default(info.identity_increment, "1"),
            min_value: non_default(info.identity_min, "1"),
            max_value: non_default(info.identity_max, bounds.max),
            start_with: non_default(info.identity_start, "1"),
            cache: non_default(info.identity_cache, "1"),
            cycle: info.identity_cycle,
        });
    }
    column
}

fn sequence(info: SequenceInfo) -> Sequence {
    let bounds = SequenceBounds::for_type(&info.data_type);
    Sequence {
        schema: info.schema,
        name: info.name,
        increment_by: non_default(info.increment_by, "1"),
        min_value: non_default(info.min_value, "1"),
        max_value: non_default(info.max_value, bounds.max),
        start_with: non_default(info.start_with, "1"),
        cache_size: non_default(info.cache_size, "1"),
        cycle: info.cycle,
    }
}

fn index(info: IndexInfo) -> Index {
    let columns = info
        .columns
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let descending = info.descending.get(i).copied().unwrap_or(false);
            let nulls_first = info.nulls_first.get(i).copied().unwrap_or(false);
            let mut column = match plain_identifier(part) {
                Some(name) => IndexColumn::column(name),
                None => IndexColumn::expression(normalize_expression(part)),
            };
            column.asc = !descending;
            // Descending keys sort nulls first unless told otherwise.
            column.nulls_first = nulls_first && !descending;
            column
        })
        .collect();

    Index {
        schema: info.schema,
        table: info.table,
        name: info.name,
        columns,
        is_unique: info.is_unique,
        method: info.method,
        where_clause: info.where_clause.as_deref().map(normalize_expression),
        concurrently: false,
        with: None,
    }
}

fn view(info: ViewInfo) -> View {
    View {
        schema: info.schema,
        name: info.name,
        definition: info
            .definition
            .map(|d| d.trim().trim_end_matches(';').trim().to_string()),
        materialized: info.materialized,
        with_no_data: info.materialized && !info.populated,
        check_option: info.check_option,
    }
}

/// Column name if `part` is a bare or quoted identifier.
fn plain_identifier(part: &str) -> Option<String> {
    let part = part.trim();
    if let Some(inner) = part.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        if !inner.contains('"') || inner.contains("\"\"") {
            return Some(inner.replace("\"\"", "\""));
        }
        return None;
    }
    let mut chars = part.chars();
    let first = chars.next()?;
    let valid = (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');
    valid.then(|| part.to_string())
}

fn action(code: Option<&str>) -> ReferentialAction {
    match code {
        Some("r") => ReferentialAction::Restrict,
        Some("c") => ReferentialAction::Cascade,
        Some("n") => ReferentialAction::SetNull,
        Some("d") => ReferentialAction::SetDefault,
        _ => ReferentialAction::NoAction,
    }
}

/// Catalog defaults for a sequence data type.
struct SequenceBounds {
    max: &'static str,
}

impl SequenceBounds {
    fn for_type(data_type: &str) -> Self {
        let max = match normalize_type(data_type).as_str() {
            "smallint" | "smallserial" => "32767",
            "integer" | "serial" => "2147483647",
            _ => "9223372036854775807",
        };
        Self { max }
    }
}

fn non_default(value: Option<String>, default: &str) -> Option<String> {
    value.filter(|v| v != default)
}

/// Diff an introspected schema against the declared one. No statements means
/// the database matches the declaration; otherwise the statements are what
/// it would take to converge.
pub async fn detect_drift(
    declared: &Ddl,
    introspected: &Ddl,
    dialect: Dialect,
) -> MigrateResult<DiffResult> {
    let result = diff(introspected, declared, dialect, &NoRenames).await?;
    if !result.statements.is_empty() {
        info!(statements = result.statements.len(), "Schema drift detected");
    }
    Ok(result)
}

/// Catalog queries for PostgreSQL. `$SCHEMAS` is replaced by the quoted
/// schema list; the first line tags the query.
pub mod queries {
    pub const SCHEMAS: &str = r#"-- ddlkit:schemas
        SELECT nspname AS name
        FROM pg_catalog.pg_namespace
        WHERE nspname IN ($SCHEMAS)
        ORDER BY nspname
    "#;

    pub const ENUMS: &str = r#"-- ddlkit:enums
        SELECT n.nspname AS schema,
               t.typname AS name,
               array_agg(e.enumlabel ORDER BY e.enumsortorder) AS values
        FROM pg_catalog.pg_type t
        JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
        JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
        WHERE n.nspname IN ($SCHEMAS)
        GROUP BY n.nspname, t.typname
        ORDER BY n.nspname, t.typname
    "#;

    pub const SEQUENCES: &str = r#"-- ddlkit:sequences
        SELECT s.schemaname AS schema,
               s.sequencename AS name,
               s.data_type::text AS data_type,
               s.increment_by::text AS increment_by,
               s.min_value::text AS min_value,
               s.max_value::text AS max_value,
               s.start_value::text AS start_with,
               s.cache_size::text AS cache_size,
               s.cycle
        FROM pg_catalog.pg_sequences s
        WHERE s.schemaname IN ($SCHEMAS)
          AND NOT EXISTS (
              SELECT 1 FROM pg_catalog.pg_depend d
              JOIN pg_catalog.pg_class c ON c.oid = d.objid
              WHERE c.relname = s.sequencename AND d.deptype IN ('a', 'i')
          )
        ORDER BY s.schemaname, s.sequencename
    "#;

    pub const ROLES: &str = r#"-- ddlkit:roles
        SELECT rolname AS name,
               rolcreatedb AS create_db,
               rolcreaterole AS create_role,
               rolinherit AS inherit
        FROM pg_catalog.pg_roles
        WHERE rolname !~ '^pg_' AND NOT rolsuper
        ORDER BY rolname
    "#;

    pub const TABLES: &str = r#"-- ddlkit:tables
        SELECT n.nspname AS schema,
               c.relname AS name,
               c.relrowsecurity AS rls_enabled
        FROM pg_catalog.pg_class c
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('r', 'p') AND n.nspname IN ($SCHEMAS)
        ORDER BY n.nspname, c.relname
    "#;

    pub const COLUMNS: &str = r#"-- ddlkit:columns
        SELECT n.nspname AS schema,
               c.relname AS "table",
               a.attname AS name,
               pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
               CASE WHEN et.typtype = 'e' THEN en.nspname END AS enum_schema,
               CASE WHEN et.typtype = 'e' THEN et.typname END AS enum_name,
               a.attnotnull AS not_null,
               pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) AS "default",
               a.attidentity::text AS identity,
               a.attgenerated::text AS generated,
               seq.seqincrement::text AS identity_increment,
               seq.seqmin::text AS identity_min,
               seq.seqmax::text AS identity_max,
               seq.seqstart::text AS identity_start,
               seq.seqcache::text AS identity_cache,
               coalesce(seq.seqcycle, false) AS identity_cycle
        FROM pg_catalog.pg_attribute a
        JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
        LEFT JOIN pg_catalog.pg_type et
               ON et.oid = CASE WHEN t.typelem <> 0 THEN t.typelem ELSE t.oid END
        LEFT JOIN pg_catalog.pg_namespace en ON en.oid = et.typnamespace
        LEFT JOIN pg_catalog.pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
        LEFT JOIN pg_catalog.pg_sequence seq
               ON seq.seqrelid = pg_catalog.pg_get_serial_sequence(
                      quote_ident(n.nspname) || '.' || quote_ident(c.relname), a.attname
                  )::regclass
              AND a.attidentity <> ''
        WHERE c.relkind IN ('r', 'p') AND a.attnum > 0 AND NOT a.attisdropped
          AND n.nspname IN ($SCHEMAS)
        ORDER BY n.nspname, c.relname, a.attnum
    "#;

    pub const CONSTRAINTS: &str = r#"-- ddlkit:constraints
        SELECT n.nspname AS schema,
               t.relname AS "table",
               con.conname AS name,
               con.contype::text AS kind,
               array(
                   SELECT a.attname FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
                   JOIN pg_catalog.pg_attribute a
                     ON a.attrelid = con.conrelid AND a.attnum = k.attnum
                   ORDER BY k.ord
               ) AS columns,
               fn.nspname AS schema_to,
               ft.relname AS table_to,
               array(
                   SELECT a.attname FROM unnest(con.confkey) WITH ORDINALITY AS k(attnum, ord)
                   JOIN pg_catalog.pg_attribute a
                     ON a.attrelid = con.confrelid AND a.attnum = k.attnum
                   ORDER BY k.ord
               ) AS columns_to,
               nullif(con.confupdtype::text, ' ') AS on_update,
               nullif(con.confdeltype::text, ' ') AS on_delete,
               pg_catalog.pg_get_constraintdef(con.oid, true) AS definition
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        LEFT JOIN pg_catalog.pg_class ft ON ft.oid = con.confrelid
        LEFT JOIN pg_catalog.pg_namespace fn ON fn.oid = ft.relnamespace
        WHERE con.contype IN ('p', 'u', 'c', 'f') AND n.nspname IN ($SCHEMAS)
        ORDER BY n.nspname, t.relname, con.conname
    "#;

    pub const INDEXES: &str = r#"-- ddlkit:indexes
        SELECT n.nspname AS schema,
               t.relname AS "table",
               i.relname AS name,
               array(
                   SELECT pg_catalog.pg_get_indexdef(ix.indexrelid, k + 1, true)
                   FROM generate_subscripts(ix.indkey, 1) AS k
                   WHERE k < ix.indnkeyatts ORDER BY k
               ) AS columns,
               array(
                   SELECT (ix.indoption[k] & 1) = 1
                   FROM generate_subscripts(ix.indoption, 1) AS k
                   WHERE k < ix.indnkeyatts ORDER BY k
               ) AS descending,
               array(
                   SELECT (ix.indoption[k] & 2) = 2
                   FROM generate_subscripts(ix.indoption, 1) AS k
                   WHERE k < ix.indnkeyatts ORDER BY k
               ) AS nulls_first,
               ix.indisunique AS is_unique,
               am.amname AS method,
               pg_catalog.pg_get_expr(ix.indpred, ix.indrelid) AS where_clause
        FROM pg_catalog.pg_index ix
        JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
        JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_catalog.pg_am am ON am.oid = i.relam
        WHERE n.nspname IN ($SCHEMAS)
          AND NOT EXISTS (
              SELECT 1 FROM pg_catalog.pg_constraint con WHERE con.conindid = ix.indexrelid
          )
        ORDER BY n.nspname, t.relname, i.relname
    "#;

    pub const POLICIES: &str = r#"-- ddlkit:policies
        SELECT schemaname AS schema,
               tablename AS "table",
               policyname AS name,
               permissive,
               cmd AS command,
               roles::text[] AS roles,
               qual AS using,
               with_check
        FROM pg_catalog.pg_policies
        WHERE schemaname IN ($SCHEMAS)
        ORDER BY schemaname, tablename, policyname
    "#;

    pub const PRIVILEGES: &str = r#"-- ddlkit:privileges
        SELECT table_schema AS schema,
               table_name AS "table",
               grantee,
               grantor,
               privilege_type,
               is_grantable = 'YES' AS is_grantable
        FROM information_schema.role_table_grants
        WHERE table_schema IN ($SCHEMAS) AND grantee <> grantor
        ORDER BY table_schema, table_name, grantee, privilege_type
    "#;

    pub const VIEWS: &str = r#"-- ddlkit:views
        SELECT n.nspname AS schema,
               c.relname AS name,
               pg_catalog.pg_get_viewdef(c.oid, true) AS definition,
               c.relkind = 'm' AS materialized,
               c.relispopulated AS populated,
               (
                   SELECT option_value FROM pg_catalog.pg_options_to_table(c.reloptions)
                   WHERE option_name = 'check_option'
               ) AS check_option
        FROM pg_catalog.pg_class c
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('v', 'm') AND n.nspname IN ($SCHEMAS)
        ORDER BY n.nspname, c.relname
    "#;
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    /// Answers queries by their tag line.
    struct FixtureCatalog {
        rows: HashMap<&'static str, Vec<Value>>,
    }

    #[async_trait]
    impl CatalogQuery for FixtureCatalog {
        async fn query(&self, sql: &str) -> MigrateResult<Vec<Value>> {
            let tag = sql.lines().next().unwrap_or_default().trim();
            Ok(self.rows.get(tag).cloned().unwrap_or_default())
        }
    }

    fn catalog() -> FixtureCatalog {
        let mut rows = HashMap::new();
        rows.insert("-- ddlkit:schemas", vec![json!({"name": "public"})]);
        rows.insert(
            "-- ddlkit:enums",
            vec![json!({"schema": "public", "name": "mood", "values": ["sad", "happy"]})],
        );
        rows.insert(
            "-- ddlkit:tables",
            vec![
                json!({"schema": "public", "name": "users", "rls_enabled": false}),
                json!({"schema": "public", "name": "__ddlkit_migrations", "rls_enabled": false}),
            ],
        );
        rows.insert(
            "-- ddlkit:columns",
            vec![
                json!({
                    "schema": "public", "table": "users", "name": "id",
                    "data_type": "integer", "enum_schema": null, "enum_name": null,
                    "not_null": true, "default": null, "identity": "a", "generated": "",
                    "identity_increment": "1", "identity_min": "1",
                    "identity_max": "2147483647", "identity_start": "1",
                    "identity_cache": "1", "identity_cycle": false
                }),
                json!({
                    "schema": "public", "table": "users", "name": "email",
                    "data_type": "character varying(255)", "enum_schema": null,
                    "enum_name": null, "not_null": true,
                    "default": "'none'::character varying", "identity": "", "generated": ""
                }),
                json!({
                    "schema": "public", "table": "users", "name": "moods",
                    "data_type": "mood[]", "enum_schema": "public", "enum_name": "mood",
                    "not_null": false, "default": null, "identity": "", "generated": ""
                }),
            ],
        );
        rows.insert(
            "-- ddlkit:constraints",
            vec![json!({
                "schema": "public", "table": "users", "name": "users_pkey", "kind": "p",
                "columns": ["id"], "schema_to": null, "table_to": null, "columns_to": [],
                "on_update": null, "on_delete": null, "definition": "PRIMARY KEY (id)"
            })],
        );
        rows.insert(
            "-- ddlkit:indexes",
            vec![json!({
                "schema": "public", "table": "users", "name": "users_email_idx",
                "columns": ["lower((email)::text)"], "descending": [false],
                "nulls_first": [false], "is_unique": true, "method": "btree",
                "where_clause": null
            })],
        );
        FixtureCatalog { rows }
    }

    fn declared() -> Ddl {
        let mut id = Column::new("public", "users", "id", "integer").not_null();
        id.identity = Some(Identity::new(IdentityKind::Always));
        let mut moods = Column::new("public", "users", "moods", "mood").enum_type("public");
        moods.dimensions = 1;
        let mut email_idx = Index::new("public", "users", "users_email_idx", Vec::<String>::new())
            .unique();
        email_idx.columns = vec![IndexColumn::expression("lower((email)::text)")];

        Ddl::builder()
            .with(EnumType::new("public", "mood", ["sad", "happy"]))
            .with(Table::new("public", "users"))
            .with(id)
            .with(
                Column::new("public", "users", "email", "varchar(255)")
                    .not_null()
                    .default_value("'none'"),
            )
            .with(moods)
            .with(PrimaryKey {
                schema: "public".into(),
                table: "users".into(),
                name: "users_pkey".into(),
                columns: vec!["id".into()],
            })
            .with(email_idx)
            .build()
    }

    #[tokio::test]
    async fn test_introspect_skips_excluded_tables() {
        let result = PostgresIntrospector::new(catalog())
            .introspect(&IntrospectionConfig::default())
            .await
            .unwrap();
        assert_eq!(result.ddl.tables().len(), 1);
        assert_eq!(result.skipped_tables.len(), 1);
        assert_eq!(result.skipped_tables[0].name, "__ddlkit_migrations");
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_introspect_normalizes_columns() {
        let result = PostgresIntrospector::new(catalog())
            .introspect(&IntrospectionConfig::default())
            .await
            .unwrap();
        let columns = result.ddl.columns();
        assert_eq!(columns[0].identity, Some(Identity::new(IdentityKind::Always)));
        assert_eq!(columns[1].sql_type, "varchar(255)");
        assert_eq!(columns[2].sql_type, "mood");
        assert_eq!(columns[2].dimensions, 1);
        assert_eq!(columns[2].type_schema.as_deref(), Some("public"));
        assert!(result.ddl.indexes()[0].columns[0].is_expression);
    }

    #[tokio::test]
    async fn test_round_trip_has_no_drift() {
        let result = PostgresIntrospector::new(catalog())
            .introspect(&IntrospectionConfig::default())
            .await
            .unwrap();
        let drift = detect_drift(&declared(), &result.ddl, Dialect::Postgresql)
            .await
            .unwrap();
        assert!(drift.errors.is_empty(), "{:?}", drift.errors);
        assert!(drift.statements.is_empty(), "{:?}", drift.statements);
    }

    #[test]
    fn test_plain_identifier() {
        assert_eq!(plain_identifier("email").as_deref(), Some("email"));
        assert_eq!(plain_identifier("\"Email\"").as_deref(), Some("Email"));
        assert_eq!(plain_identifier("lower(email)"), None);
    }

    #[test]
    fn test_config_should_include_table() {
        let config = IntrospectionConfig::new().include_tables(vec!["users".into()]);
        assert!(config.should_include_table("users"));
        assert!(!config.should_include_table("posts"));
        assert!(!IntrospectionConfig::default().should_include_table("__ddlkit_migrations"));
    }
}
