//! PostgreSQL and CockroachDB.

use crate::ddl::{
    Check, Column, DEFAULT_SCHEMA, Dialect, EnumType, ForeignKey, GeneratedKind, Identity,
    IdentityKind, Index, Policy, PolicyAs, PolicyFor, PrimaryKey, Privilege, Role, Sequence,
    Unique, View,
};
use crate::error::MigrateResult;
use crate::statement::{FieldChange, FullTable, JsonStatement};

use super::{SqlGenerator, array_type, quote_literal, quote_with};

/// SQL generator for PostgreSQL, also used for CockroachDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresSqlGenerator {
    cockroach: bool,
}

impl PostgresSqlGenerator {
    /// Generator for PostgreSQL.
    pub fn new() -> Self {
        Self { cockroach: false }
    }

    /// Generator for CockroachDB: no `USING` on type changes, default index
    /// method left implicit.
    pub fn cockroach() -> Self {
        Self { cockroach: true }
    }

    fn ident(&self, name: &str) -> String {
        quote_with(name, '"', '"')
    }

    /// Schema-qualified name. The default schema is left implicit.
    fn name(&self, schema: &str, name: &str) -> String {
        if schema == DEFAULT_SCHEMA {
            self.ident(name)
        } else {
            format!("{}.{}", self.ident(schema), self.ident(name))
        }
    }

    fn idents(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.ident(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_type(&self, column: &Column) -> String {
        let base = match &column.type_schema {
            Some(schema) => self.name(schema, &column.sql_type),
            None => column.sql_type.clone(),
        };
        array_type(base, column.dimensions)
    }

    fn column_definition(&self, column: &Column) -> String {
        let mut sql = format!("{} {}", self.ident(&column.name), self.column_type(column));
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(generated) = &column.generated {
            sql.push_str(&format!(" GENERATED ALWAYS AS ({})", generated.expression));
            if generated.kind == GeneratedKind::Stored {
                sql.push_str(" STORED");
            }
        }
        if let Some(identity) = &column.identity {
            sql.push(' ');
            sql.push_str(&self.identity(identity));
        }
        sql
    }

    fn identity(&self, identity: &Identity) -> String {
        let kind = match identity.kind {
            IdentityKind::Always => "ALWAYS",
            IdentityKind::ByDefault => "BY DEFAULT",
        };
        let mut options = Vec::new();
        if let Some(v) = &identity.increment {
            options.push(format!("INCREMENT BY {}", v));
        }
        if let Some(v) = &identity.min_value {
            options.push(format!("MINVALUE {}", v));
        }
        if let Some(v) = &identity.max_value {
            options.push(format!("MAXVALUE {}", v));
        }
        if let Some(v) = &identity.start_with {
            options.push(format!("START WITH {}", v));
        }
        if let Some(v) = &identity.cache {
            options.push(format!("CACHE {}", v));
        }
        if identity.cycle {
            options.push("CYCLE".to_string());
        }
        if options.is_empty() {
            format!("GENERATED {} AS IDENTITY", kind)
        } else {
            format!("GENERATED {} AS IDENTITY ({})", kind, options.join(" "))
        }
    }

    fn create_table(&self, table: &FullTable) -> Vec<String> {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        if let Some(pk) = &table.pk {
            lines.push(format!(
                "CONSTRAINT {} PRIMARY KEY({})",
                self.ident(&pk.name),
                self.idents(&pk.columns)
            ));
        }
        for unique in &table.uniques {
            lines.push(format!(
                "CONSTRAINT {} {}",
                self.ident(&unique.name),
                self.unique_body(unique)
            ));
        }
        for check in &table.checks {
            lines.push(format!(
                "CONSTRAINT {} CHECK ({})",
                self.ident(&check.name),
                check.value
            ));
        }
        for fk in &table.fks {
            lines.push(format!(
                "CONSTRAINT {} {}",
                self.ident(&fk.name),
                self.fk_body(fk)
            ));
        }

        let name = self.name(&table.schema, &table.name);
        let mut out = vec![format!(
            "CREATE TABLE {} (\n\t{}\n);",
            name,
            lines.join(",\n\t")
        )];
        if table.is_rls_enabled {
            out.push(format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY;", name));
        }
        out
    }

    fn unique_body(&self, unique: &Unique) -> String {
        let nulls = if unique.nulls_not_distinct {
            " NULLS NOT DISTINCT"
        } else {
            ""
        };
        format!("UNIQUE{}({})", nulls, self.idents(&unique.columns))
    }

    fn fk_body(&self, fk: &ForeignKey) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            self.idents(&fk.columns),
            self.name(&fk.schema_to, &fk.table_to),
            self.idents(&fk.columns_to),
            fk.on_delete.as_sql(),
            fk.on_update.as_sql()
        )
    }

    fn alter_table(&self, schema: &str, table: &str, action: String) -> String {
        format!("ALTER TABLE {} {};", self.name(schema, table), action)
    }

    fn add_constraint(&self, schema: &str, table: &str, name: &str, body: String) -> String {
        self.alter_table(
            schema,
            table,
            format!("ADD CONSTRAINT {} {}", self.ident(name), body),
        )
    }

    fn drop_constraint(&self, schema: &str, table: &str, name: &str) -> String {
        self.alter_table(schema, table, format!("DROP CONSTRAINT {}", self.ident(name)))
    }

    fn add_pk(&self, pk: &PrimaryKey) -> String {
        self.add_constraint(
            &pk.schema,
            &pk.table,
            &pk.name,
            format!("PRIMARY KEY({})", self.idents(&pk.columns)),
        )
    }

    fn add_unique(&self, unique: &Unique) -> String {
        self.add_constraint(
            &unique.schema,
            &unique.table,
            &unique.name,
            self.unique_body(unique),
        )
    }

    fn add_check(&self, check: &Check) -> String {
        self.add_constraint(
            &check.schema,
            &check.table,
            &check.name,
            format!("CHECK ({})", check.value),
        )
    }

    fn add_fk(&self, fk: &ForeignKey) -> String {
        self.add_constraint(&fk.schema, &fk.table, &fk.name, self.fk_body(fk))
    }

    fn create_index(&self, index: &Index) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| {
                let mut part = if c.is_expression {
                    format!("({})", c.value)
                } else {
                    self.ident(&c.value)
                };
                if let Some(opclass) = &c.opclass {
                    part.push(' ');
                    part.push_str(opclass);
                }
                if !c.asc {
                    part.push_str(" DESC");
                }
                if c.nulls_first {
                    part.push_str(" NULLS FIRST");
                }
                part
            })
            .collect();

        let mut sql = format!(
            "CREATE {}INDEX {}{} ON {}",
            if index.is_unique { "UNIQUE " } else { "" },
            if index.concurrently { "CONCURRENTLY " } else { "" },
            self.ident(&index.name),
            self.name(&index.schema, &index.table)
        );
        if !(self.cockroach && index.method.eq_ignore_ascii_case("btree")) {
            sql.push_str(&format!(" USING {}", index.method));
        }
        sql.push_str(&format!(" ({})", columns.join(", ")));
        if let Some(with) = &index.with {
            sql.push_str(&format!(" WITH ({})", with));
        }
        if let Some(predicate) = &index.where_clause {
            sql.push_str(&format!(" WHERE {}", predicate));
        }
        sql.push(';');
        sql
    }

    fn drop_index(&self, index: &Index) -> String {
        format!(
            "DROP INDEX {}{};",
            if index.concurrently { "CONCURRENTLY " } else { "" },
            self.name(&index.schema, &index.name)
        )
    }

    fn create_enum(&self, enum_type: &EnumType) -> String {
        let values: Vec<String> = enum_type.values.iter().map(|v| quote_literal(v)).collect();
        format!(
            "CREATE TYPE {} AS ENUM({});",
            self.name(&enum_type.schema, &enum_type.name),
            values.join(", ")
        )
    }

    fn recreate_enum(&self, from: &EnumType, to: &EnumType, columns: &[Column]) -> Vec<String> {
        let mut out = Vec::new();
        let type_name = self.name(&to.schema, &to.name);
        for column in columns {
            let set_type = |ty: String| {
                self.alter_table(
                    &column.schema,
                    &column.table,
                    format!("ALTER COLUMN {} SET DATA TYPE {}", self.ident(&column.name), ty),
                )
            };
            if column.default.is_some() {
                out.push(self.alter_table(
                    &column.schema,
                    &column.table,
                    format!("ALTER COLUMN {} DROP DEFAULT", self.ident(&column.name)),
                ));
            }
            out.push(set_type(array_type("text".to_string(), column.dimensions)));
        }
        out.push(format!("DROP TYPE {};", self.name(&from.schema, &from.name)));
        out.push(self.create_enum(to));
        for column in columns {
            let ty = array_type(type_name.clone(), column.dimensions);
            out.push(self.alter_table(
                &column.schema,
                &column.table,
                format!(
                    "ALTER COLUMN {} SET DATA TYPE {} USING {}::{}",
                    self.ident(&column.name),
                    ty,
                    self.ident(&column.name),
                    ty
                ),
            ));
            if let Some(default) = &column.default {
                out.push(self.alter_table(
                    &column.schema,
                    &column.table,
                    format!("ALTER COLUMN {} SET DEFAULT {}", self.ident(&column.name), default),
                ));
            }
        }
        out
    }

    fn sequence_options(&self, sequence: &Sequence) -> String {
        let mut options = String::new();
        if let Some(v) = &sequence.increment_by {
            options.push_str(&format!(" INCREMENT BY {}", v));
        }
        if let Some(v) = &sequence.min_value {
            options.push_str(&format!(" MINVALUE {}", v));
        }
        if let Some(v) = &sequence.max_value {
            options.push_str(&format!(" MAXVALUE {}", v));
        }
        if let Some(v) = &sequence.start_with {
            options.push_str(&format!(" START WITH {}", v));
        }
        if let Some(v) = &sequence.cache_size {
            options.push_str(&format!(" CACHE {}", v));
        }
        if sequence.cycle {
            options.push_str(" CYCLE");
        }
        options
    }

    fn alter_sequence(&self, sequence: &Sequence, diff: &[FieldChange]) -> String {
        let mut options = String::new();
        for change in diff {
            let to = change.to.as_deref();
            let clause = match (change.field.as_str(), to) {
                ("incrementBy", Some(v)) => format!(" INCREMENT BY {}", v),
                ("incrementBy", None) => " INCREMENT BY 1".to_string(),
                ("minValue", Some(v)) => format!(" MINVALUE {}", v),
                ("minValue", None) => " NO MINVALUE".to_string(),
                ("maxValue", Some(v)) => format!(" MAXVALUE {}", v),
                ("maxValue", None) => " NO MAXVALUE".to_string(),
                ("startWith", Some(v)) => format!(" START WITH {}", v),
                ("cacheSize", Some(v)) => format!(" CACHE {}", v),
                ("cacheSize", None) => " CACHE 1".to_string(),
                ("cycle", Some("true")) => " CYCLE".to_string(),
                ("cycle", _) => " NO CYCLE".to_string(),
                _ => continue,
            };
            options.push_str(&clause);
        }
        format!(
            "ALTER SEQUENCE {}{};",
            self.name(&sequence.schema, &sequence.name),
            options
        )
    }

    fn role_options(&self, role: &Role) -> String {
        format!(
            "{} {} {}",
            if role.create_db { "CREATEDB" } else { "NOCREATEDB" },
            if role.create_role { "CREATEROLE" } else { "NOCREATEROLE" },
            if role.inherit { "INHERIT" } else { "NOINHERIT" }
        )
    }

    fn create_role(&self, role: &Role) -> String {
        let mut options = Vec::new();
        if role.create_db {
            options.push("CREATEDB");
        }
        if role.create_role {
            options.push("CREATEROLE");
        }
        if !role.inherit {
            options.push("NOINHERIT");
        }
        if options.is_empty() {
            format!("CREATE ROLE {};", self.ident(&role.name))
        } else {
            format!("CREATE ROLE {} WITH {};", self.ident(&role.name), options.join(" "))
        }
    }

    fn alter_column(&self, from: &Column, to: &Column, diff: &[FieldChange]) -> Vec<String> {
        let column = self.ident(&to.name);
        let alter = |action: String| {
            self.alter_table(&to.schema, &to.table, format!("ALTER COLUMN {} {}", column, action))
        };
        let mut out = Vec::new();
        for change in diff {
            match change.field.as_str() {
                "type" => {
                    let ty = self.column_type(to);
                    if self.cockroach {
                        out.push(alter(format!("SET DATA TYPE {}", ty)));
                    } else {
                        out.push(alter(format!("SET DATA TYPE {} USING {}::{}", ty, column, ty)));
                    }
                }
                "notNull" if to.not_null => out.push(alter("SET NOT NULL".to_string())),
                "notNull" => out.push(alter("DROP NOT NULL".to_string())),
                "default" => match &to.default {
                    Some(default) => out.push(alter(format!("SET DEFAULT {}", default))),
                    None => out.push(alter("DROP DEFAULT".to_string())),
                },
                "identity" => {
                    if from.identity.is_some() {
                        out.push(alter("DROP IDENTITY".to_string()));
                    }
                    if let Some(identity) = &to.identity {
                        out.push(alter(format!("ADD {}", self.identity(identity))));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn create_view(&self, view: &View) -> String {
        let definition = view.definition.as_deref().unwrap_or_default();
        let name = self.name(&view.schema, &view.name);
        if view.materialized {
            format!(
                "CREATE MATERIALIZED VIEW {} AS ({}){};",
                name,
                definition,
                if view.with_no_data { " WITH NO DATA" } else { "" }
            )
        } else {
            let options = view
                .check_option
                .as_deref()
                .map(|o| format!(" WITH (check_option = {})", o))
                .unwrap_or_default();
            format!("CREATE VIEW {}{} AS ({});", name, options, definition)
        }
    }

    fn view_keyword(materialized: bool) -> &'static str {
        if materialized {
            "MATERIALIZED VIEW"
        } else {
            "VIEW"
        }
    }

    fn drop_view(&self, view: &View) -> String {
        format!(
            "DROP {} {};",
            Self::view_keyword(view.materialized),
            self.name(&view.schema, &view.name)
        )
    }

    fn alter_view(&self, view: &View, diff: &[FieldChange]) -> Vec<String> {
        let name = self.name(&view.schema, &view.name);
        diff.iter()
            .filter_map(|change| match change.field.as_str() {
                "checkOption" => Some(match &view.check_option {
                    Some(option) => format!("ALTER VIEW {} SET (check_option = {});", name, option),
                    None => format!("ALTER VIEW {} RESET (check_option);", name),
                }),
                "withNoData" if view.materialized => Some(format!(
                    "REFRESH MATERIALIZED VIEW {}{};",
                    name,
                    if view.with_no_data { " WITH NO DATA" } else { "" }
                )),
                _ => None,
            })
            .collect()
    }

    fn policy_roles(&self, policy: &Policy) -> String {
        if policy.roles.is_empty() {
            return "public".to_string();
        }
        policy
            .roles
            .iter()
            .map(|role| match role.as_str() {
                "public" | "current_role" | "current_user" | "session_user" => role.clone(),
                _ => self.ident(role),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn create_policy(&self, policy: &Policy) -> String {
        let kind = match policy.kind {
            PolicyAs::Permissive => "PERMISSIVE",
            PolicyAs::Restrictive => "RESTRICTIVE",
        };
        let command = match policy.command {
            PolicyFor::All => "ALL",
            PolicyFor::Select => "SELECT",
            PolicyFor::Insert => "INSERT",
            PolicyFor::Update => "UPDATE",
            PolicyFor::Delete => "DELETE",
        };
        let mut sql = format!(
            "CREATE POLICY {} ON {} AS {} FOR {} TO {}",
            self.ident(&policy.name),
            self.name(&policy.schema, &policy.table),
            kind,
            command,
            self.policy_roles(policy)
        );
        if let Some(using) = &policy.using {
            sql.push_str(&format!(" USING ({})", using));
        }
        if let Some(check) = &policy.with_check {
            sql.push_str(&format!(" WITH CHECK ({})", check));
        }
        sql.push(';');
        sql
    }

    fn drop_policy(&self, policy: &Policy) -> String {
        format!(
            "DROP POLICY {} ON {} CASCADE;",
            self.ident(&policy.name),
            self.name(&policy.schema, &policy.table)
        )
    }

    fn alter_policy(&self, policy: &Policy) -> String {
        let mut sql = format!(
            "ALTER POLICY {} ON {} TO {}",
            self.ident(&policy.name),
            self.name(&policy.schema, &policy.table),
            self.policy_roles(policy)
        );
        if let Some(using) = &policy.using {
            sql.push_str(&format!(" USING ({})", using));
        }
        if let Some(check) = &policy.with_check {
            sql.push_str(&format!(" WITH CHECK ({})", check));
        }
        sql.push(';');
        sql
    }

    fn grant(&self, privilege: &Privilege) -> String {
        format!(
            "GRANT {} ON {} TO {}{};",
            privilege.kind.as_sql(),
            self.name(&privilege.schema, &privilege.table),
            self.ident(&privilege.grantee),
            if privilege.is_grantable {
                " WITH GRANT OPTION"
            } else {
                ""
            }
        )
    }

    fn revoke(&self, privilege: &Privilege) -> String {
        format!(
            "REVOKE {} ON {} FROM {};",
            privilege.kind.as_sql(),
            self.name(&privilege.schema, &privilege.table),
            self.ident(&privilege.grantee)
        )
    }
}

impl SqlGenerator for PostgresSqlGenerator {
    fn dialect(&self) -> Dialect {
        if self.cockroach {
            Dialect::Cockroach
        } else {
            Dialect::Postgresql
        }
    }

    fn statement(&self, statement: &JsonStatement) -> MigrateResult<Vec<String>> {
        use JsonStatement::*;

        let sql = match statement {
            CreateSchema { name } => vec![format!("CREATE SCHEMA {};", self.ident(name))],
            DropSchema { name } => vec![format!("DROP SCHEMA {};", self.ident(name))],
            RenameSchema { from, to } => vec![format!(
                "ALTER SCHEMA {} RENAME TO {};",
                self.ident(from),
                self.ident(to)
            )],

            CreateEnum { enum_type } => vec![self.create_enum(enum_type)],
            DropEnum { enum_type } => vec![format!(
                "DROP TYPE {};",
                self.name(&enum_type.schema, &enum_type.name)
            )],
            RenameEnum { schema, from, to } => vec![format!(
                "ALTER TYPE {} RENAME TO {};",
                self.name(schema, from),
                self.ident(to)
            )],
            MoveEnum {
                name,
                from_schema,
                to_schema,
            } => vec![format!(
                "ALTER TYPE {} SET SCHEMA {};",
                self.name(from_schema, name),
                self.ident(to_schema)
            )],
            AlterEnum { enum_type, added } => added
                .iter()
                .map(|addition| {
                    let before = addition
                        .before
                        .as_deref()
                        .map(|b| format!(" BEFORE {}", quote_literal(b)))
                        .unwrap_or_default();
                    format!(
                        "ALTER TYPE {} ADD VALUE {}{};",
                        self.name(&enum_type.schema, &enum_type.name),
                        quote_literal(&addition.value),
                        before
                    )
                })
                .collect(),
            RecreateEnum { from, to, columns } => self.recreate_enum(from, to, columns),

            CreateSequence { sequence } => vec![format!(
                "CREATE SEQUENCE {}{};",
                self.name(&sequence.schema, &sequence.name),
                self.sequence_options(sequence)
            )],
            DropSequence { sequence } => vec![format!(
                "DROP SEQUENCE {};",
                self.name(&sequence.schema, &sequence.name)
            )],
            RenameSequence { schema, from, to } => vec![format!(
                "ALTER SEQUENCE {} RENAME TO {};",
                self.name(schema, from),
                self.ident(to)
            )],
            MoveSequence {
                name,
                from_schema,
                to_schema,
            } => vec![format!(
                "ALTER SEQUENCE {} SET SCHEMA {};",
                self.name(from_schema, name),
                self.ident(to_schema)
            )],
            AlterSequence { sequence, diff } => vec![self.alter_sequence(sequence, diff)],

            CreateRole { role } => vec![self.create_role(role)],
            DropRole { role } => vec![format!("DROP ROLE {};", self.ident(&role.name))],
            RenameRole { from, to } => vec![format!(
                "ALTER ROLE {} RENAME TO {};",
                self.ident(from),
                self.ident(to)
            )],
            AlterRole { role, .. } => vec![format!(
                "ALTER ROLE {} WITH {};",
                self.ident(&role.name),
                self.role_options(role)
            )],

            CreateTable { table } => self.create_table(table),
            DropTable { table } => vec![format!(
                "DROP TABLE {} CASCADE;",
                self.name(&table.schema, &table.name)
            )],
            RenameTable { schema, from, to } => vec![format!(
                "ALTER TABLE {} RENAME TO {};",
                self.name(schema, from),
                self.ident(to)
            )],
            MoveTable {
                name,
                from_schema,
                to_schema,
            } => vec![format!(
                "ALTER TABLE {} SET SCHEMA {};",
                self.name(from_schema, name),
                self.ident(to_schema)
            )],
            RecreateTable { .. } => return Err(self.unsupported(statement)),

            AddColumn { column } => vec![self.alter_table(
                &column.schema,
                &column.table,
                format!("ADD COLUMN {}", self.column_definition(column)),
            )],
            DropColumn { column } => vec![self.alter_table(
                &column.schema,
                &column.table,
                format!("DROP COLUMN {}", self.ident(&column.name)),
            )],
            RenameColumn {
                schema,
                table,
                from,
                to,
            } => vec![self.alter_table(
                schema,
                table,
                format!("RENAME COLUMN {} TO {}", self.ident(from), self.ident(to)),
            )],
            AlterColumn { from, to, diff } => self.alter_column(from, to, diff),
            RecreateColumn { from, to } => vec![
                self.alter_table(
                    &from.schema,
                    &from.table,
                    format!("DROP COLUMN {}", self.ident(&from.name)),
                ),
                self.alter_table(
                    &to.schema,
                    &to.table,
                    format!("ADD COLUMN {}", self.column_definition(to)),
                ),
            ],

            CreateIndex { index } => vec![self.create_index(index)],
            DropIndex { index } => vec![self.drop_index(index)],
            RenameIndex { schema, from, to, .. } => vec![format!(
                "ALTER INDEX {} RENAME TO {};",
                self.name(schema, from),
                self.ident(to)
            )],
            RecreateIndex { from, to } => vec![self.drop_index(from), self.create_index(to)],

            AddPk { pk } => vec![self.add_pk(pk)],
            DropPk { pk } => vec![self.drop_constraint(&pk.schema, &pk.table, &pk.name)],
            AlterPk { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_pk(to),
            ],
            AddUnique { unique } => vec![self.add_unique(unique)],
            DropUnique { unique } => {
                vec![self.drop_constraint(&unique.schema, &unique.table, &unique.name)]
            }
            AlterUnique { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_unique(to),
            ],
            AddCheck { check } => vec![self.add_check(check)],
            DropCheck { check } => {
                vec![self.drop_constraint(&check.schema, &check.table, &check.name)]
            }
            AlterCheck { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_check(to),
            ],
            CreateFk { fk } => vec![self.add_fk(fk)],
            DropFk { fk } => vec![self.drop_constraint(&fk.schema, &fk.table, &fk.name)],
            RecreateFk { from, to } => vec![
                self.drop_constraint(&from.schema, &from.table, &from.name),
                self.add_fk(to),
            ],
            RenameConstraint {
                schema,
                table,
                from,
                to,
                ..
            } => vec![self.alter_table(
                schema,
                table,
                format!("RENAME CONSTRAINT {} TO {}", self.ident(from), self.ident(to)),
            )],

            CreateView { view } => vec![self.create_view(view)],
            DropView { view } => vec![self.drop_view(view)],
            RenameView {
                schema,
                from,
                to,
                materialized,
            } => vec![format!(
                "ALTER {} {} RENAME TO {};",
                Self::view_keyword(*materialized),
                self.name(schema, from),
                self.ident(to)
            )],
            MoveView {
                name,
                from_schema,
                to_schema,
                materialized,
            } => vec![format!(
                "ALTER {} {} SET SCHEMA {};",
                Self::view_keyword(*materialized),
                self.name(from_schema, name),
                self.ident(to_schema)
            )],
            AlterView { view, diff } => self.alter_view(view, diff),
            RecreateView { from, to } => vec![self.drop_view(from), self.create_view(to)],

            CreatePolicy { policy } => vec![self.create_policy(policy)],
            DropPolicy { policy } => vec![self.drop_policy(policy)],
            RenamePolicy {
                schema,
                table,
                from,
                to,
            } => vec![format!(
                "ALTER POLICY {} ON {} RENAME TO {};",
                self.ident(from),
                self.name(schema, table),
                self.ident(to)
            )],
            AlterPolicy { policy, .. } => vec![self.alter_policy(policy)],
            RecreatePolicy { from, to } => vec![self.drop_policy(from), self.create_policy(to)],
            AlterRls {
                schema,
                table,
                is_rls_enabled,
            } => vec![self.alter_table(
                schema,
                table,
                format!(
                    "{} ROW LEVEL SECURITY",
                    if *is_rls_enabled { "ENABLE" } else { "DISABLE" }
                ),
            )],

            GrantPrivilege { privilege } => vec![self.grant(privilege)],
            RevokePrivilege { privilege } => vec![self.revoke(privilege)],
        };
        Ok(sql)
    }
}
