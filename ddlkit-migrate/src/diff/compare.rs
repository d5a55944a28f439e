//! Attribute comparison of two schemas with identical rename state.

use indexmap::IndexMap;

use crate::ddl::{
    Check, Column, DEFAULT_SCHEMA, Ddl, DdlEntity, Dialect, EntityKey, EnumType, ForeignKey,
    Index, Policy, PrimaryKey, Privilege, Role, Schema, Sequence, Table, Unique, View,
    normalize_expression, normalize_type,
};
use crate::statement::{EnumValueAddition, FieldChange, FullTable, JsonStatement};

/// Keys present only in `to`, only in `from`, and on both sides.
struct Split<'a, E> {
    created: Vec<&'a E>,
    dropped: Vec<&'a E>,
    common: Vec<(&'a E, &'a E)>,
}

fn split<'a, E: DdlEntity>(from: &'a Ddl, to: &'a Ddl, dialect: Dialect) -> Split<'a, E> {
    if !dialect.supports(E::KIND) {
        return Split {
            created: Vec::new(),
            dropped: Vec::new(),
            common: Vec::new(),
        };
    }
    let old: IndexMap<EntityKey, &E> = E::all(from).iter().map(|e| (e.key(), e)).collect();
    let new: IndexMap<EntityKey, &E> = E::all(to).iter().map(|e| (e.key(), e)).collect();

    let mut split = Split {
        created: Vec::new(),
        dropped: Vec::new(),
        common: Vec::new(),
    };
    for (key, entity) in &new {
        match old.get(key) {
            Some(previous) => split.common.push((*previous, *entity)),
            None => split.created.push(*entity),
        }
    }
    split.dropped = old
        .iter()
        .filter(|(key, _)| !new.contains_key(*key))
        .map(|(_, e)| *e)
        .collect();
    split
}

fn push_change(diff: &mut Vec<FieldChange>, field: &str, from: Option<String>, to: Option<String>) {
    if from != to {
        diff.push(FieldChange::new(field, from, to));
    }
}

fn flag(value: bool) -> Option<String> {
    Some(value.to_string())
}

/// Emit every statement needed beyond the renames already applied to `from`.
pub(super) fn emit(from: &Ddl, to: &Ddl, dialect: Dialect, out: &mut Vec<JsonStatement>) {
    let has_table = |ddl: &Ddl, schema: &str, table: &str| ddl.table(schema, table).is_some();
    // Children of a table that exists on both sides.
    let survives = |schema: &str, table: &str| has_table(from, schema, table) && has_table(to, schema, table);

    schemas(from, to, dialect, out);
    enums(from, to, dialect, out);
    sequences(from, to, dialect, out);
    roles(from, to, dialect, out);

    let tables = split::<Table>(from, to, dialect);
    for table in tables.created {
        out.push(JsonStatement::CreateTable {
            table: FullTable::from_ddl(to, table),
        });
    }
    for table in tables.dropped {
        out.push(JsonStatement::DropTable {
            table: FullTable::from_ddl(from, table),
        });
    }
    for (old, new) in tables.common {
        if old.is_rls_enabled != new.is_rls_enabled {
            out.push(JsonStatement::AlterRls {
                schema: new.schema.clone(),
                table: new.name.clone(),
                is_rls_enabled: new.is_rls_enabled,
            });
        }
    }

    let columns = split::<Column>(from, to, dialect);
    for column in columns.created {
        if survives(&column.schema, &column.table) {
            out.push(JsonStatement::AddColumn {
                column: column.clone(),
            });
        }
    }
    for column in columns.dropped {
        if survives(&column.schema, &column.table) {
            out.push(JsonStatement::DropColumn {
                column: column.clone(),
            });
        }
    }
    for (old, new) in columns.common {
        if let Some(statement) = column_change(old, new) {
            out.push(statement);
        }
    }

    let indexes = split::<Index>(from, to, dialect);
    for index in indexes.created {
        out.push(JsonStatement::CreateIndex {
            index: index.clone(),
        });
    }
    for index in indexes.dropped {
        if survives(&index.schema, &index.table) {
            out.push(JsonStatement::DropIndex {
                index: index.clone(),
            });
        }
    }
    for (old, new) in indexes.common {
        if !same_index(old, new) {
            out.push(JsonStatement::RecreateIndex {
                from: old.clone(),
                to: new.clone(),
            });
        }
    }

    primary_keys(from, to, dialect, &survives, out);

    let uniques = split::<Unique>(from, to, dialect);
    for unique in uniques.created {
        if survives(&unique.schema, &unique.table) {
            out.push(JsonStatement::AddUnique {
                unique: unique.clone(),
            });
        }
    }
    for unique in uniques.dropped {
        if survives(&unique.schema, &unique.table) {
            out.push(JsonStatement::DropUnique {
                unique: unique.clone(),
            });
        }
    }
    for (old, new) in uniques.common {
        if old != new {
            out.push(JsonStatement::AlterUnique {
                from: old.clone(),
                to: new.clone(),
            });
        }
    }

    let checks = split::<Check>(from, to, dialect);
    for check in checks.created {
        if survives(&check.schema, &check.table) {
            out.push(JsonStatement::AddCheck {
                check: check.clone(),
            });
        }
    }
    for check in checks.dropped {
        if survives(&check.schema, &check.table) {
            out.push(JsonStatement::DropCheck {
                check: check.clone(),
            });
        }
    }
    for (old, new) in checks.common {
        if normalize_expression(&old.value) != normalize_expression(&new.value) {
            out.push(JsonStatement::AlterCheck {
                from: old.clone(),
                to: new.clone(),
            });
        }
    }

    // Foreign keys are always separate so cycles between new tables work.
    let fks = split::<ForeignKey>(from, to, dialect);
    for fk in fks.created {
        out.push(JsonStatement::CreateFk { fk: fk.clone() });
    }
    for fk in fks.dropped {
        if survives(&fk.schema, &fk.table) {
            out.push(JsonStatement::DropFk { fk: fk.clone() });
        }
    }
    for (old, new) in fks.common {
        if old != new {
            out.push(JsonStatement::RecreateFk {
                from: old.clone(),
                to: new.clone(),
            });
        }
    }

    policies(from, to, dialect, &survives, out);
    views(from, to, dialect, out);

    let privileges = split::<Privilege>(from, to, dialect);
    for privilege in privileges.created {
        out.push(JsonStatement::GrantPrivilege {
            privilege: privilege.clone(),
        });
    }
    for privilege in privileges.dropped {
        if survives(&privilege.schema, &privilege.table) {
            out.push(JsonStatement::RevokePrivilege {
                privilege: privilege.clone(),
            });
        }
    }
    for (old, new) in privileges.common {
        if old != new {
            out.push(JsonStatement::RevokePrivilege {
                privilege: old.clone(),
            });
            out.push(JsonStatement::GrantPrivilege {
                privilege: new.clone(),
            });
        }
    }
}

fn schemas(from: &Ddl, to: &Ddl, dialect: Dialect, out: &mut Vec<JsonStatement>) {
    let schemas = split::<Schema>(from, to, dialect);
    for schema in schemas.created {
        if schema.name != DEFAULT_SCHEMA {
            out.push(JsonStatement::CreateSchema {
                name: schema.name.clone(),
            });
        }
    }
    for schema in schemas.dropped {
        if schema.name != DEFAULT_SCHEMA {
            out.push(JsonStatement::DropSchema {
                name: schema.name.clone(),
            });
        }
    }
}

fn enums(from: &Ddl, to: &Ddl, dialect: Dialect, out: &mut Vec<JsonStatement>) {
    let enums = split::<EnumType>(from, to, dialect);
    for enum_type in enums.created {
        out.push(JsonStatement::CreateEnum {
            enum_type: enum_type.clone(),
        });
    }
    for enum_type in enums.dropped {
        out.push(JsonStatement::DropEnum {
            enum_type: enum_type.clone(),
        });
    }
    for (old, new) in enums.common {
        if old.values == new.values {
            continue;
        }
        match enum_additions(&old.values, &new.values) {
            Some(added) => out.push(JsonStatement::AlterEnum {
                enum_type: new.clone(),
                added,
            }),
            None => {
                let columns = to
                    .columns()
                    .iter()
                    .filter(|c| {
                        c.type_schema.as_deref() == Some(new.schema.as_str())
                            && c.sql_type == new.name
                    })
                    .cloned()
                    .collect();
                out.push(JsonStatement::RecreateEnum {
                    from: old.clone(),
                    to: new.clone(),
                    columns,
                });
            }
        }
    }
}

/// Values added to an enum, if `old` survives in `new` in the same relative
/// order. Each addition names the existing value it goes before.
fn enum_additions(old: &[String], new: &[String]) -> Option<Vec<EnumValueAddition>> {
    let kept: Vec<&String> = new.iter().filter(|v| old.contains(v)).collect();
    if kept.len() != old.len() || kept.iter().zip(old).any(|(a, b)| *a != b) {
        return None;
    }

    let added = new
        .iter()
        .enumerate()
        .filter(|(_, v)| !old.contains(v))
        .map(|(i, value)| EnumValueAddition {
            value: value.clone(),
            before: new[i + 1..].iter().find(|v| old.contains(v)).cloned(),
        })
        .collect();
    Some(added)
}

fn sequences(from: &Ddl, to: &Ddl, dialect: Dialect, out: &mut Vec<JsonStatement>) {
    let sequences = split::<Sequence>(from, to, dialect);
    for sequence in sequences.created {
        out.push(JsonStatement::CreateSequence {
            sequence: sequence.clone(),
        });
    }
    for sequence in sequences.dropped {
        out.push(JsonStatement::DropSequence {
            sequence: sequence.clone(),
        });
    }
    for (old, new) in sequences.common {
        let mut diff = Vec::new();
        push_change(&mut diff, "incrementBy", old.increment_by.clone(), new.increment_by.clone());
        push_change(&mut diff, "minValue", old.min_value.clone(), new.min_value.clone());
        push_change(&mut diff, "maxValue", old.max_value.clone(), new.max_value.clone());
        push_change(&mut diff, "startWith", old.start_with.clone(), new.start_with.clone());
        push_change(&mut diff, "cacheSize", old.cache_size.clone(), new.cache_size.clone());
        push_change(&mut diff, "cycle", flag(old.cycle), flag(new.cycle));
        if !diff.is_empty() {
            out.push(JsonStatement::AlterSequence {
                sequence: new.clone(),
                diff,
            });
        }
    }
}

fn roles(from: &Ddl, to: &Ddl, dialect: Dialect, out: &mut Vec<JsonStatement>) {
    let roles = split::<Role>(from, to, dialect);
    for role in roles.created {
        out.push(JsonStatement::CreateRole { role: role.clone() });
    }
    for role in roles.dropped {
        out.push(JsonStatement::DropRole { role: role.clone() });
    }
    for (old, new) in roles.common {
        let mut diff = Vec::new();
        push_change(&mut diff, "createDb", flag(old.create_db), flag(new.create_db));
        push_change(&mut diff, "createRole", flag(old.create_role), flag(new.create_role));
        push_change(&mut diff, "inherit", flag(old.inherit), flag(new.inherit));
        if !diff.is_empty() {
            out.push(JsonStatement::AlterRole {
                role: new.clone(),
                diff,
            });
        }
    }
}

fn column_change(old: &Column, new: &Column) -> Option<JsonStatement> {
    let generated = |c: &Column| {
        c.generated
            .as_ref()
            .map(|g| (g.kind, normalize_expression(&g.expression)))
    };
    if generated(old) != generated(new) {
        return Some(JsonStatement::RecreateColumn {
            from: old.clone(),
            to: new.clone(),
        });
    }

    let mut diff = Vec::new();
    let type_of = |c: &Column| {
        let base = match &c.type_schema {
            Some(schema) => format!("{}.{}", schema, c.sql_type),
            None => normalize_type(&c.sql_type),
        };
        Some(format!("{}{}", base, "[]".repeat(c.dimensions as usize)))
    };
    push_change(&mut diff, "type", type_of(old), type_of(new));
    push_change(&mut diff, "notNull", flag(old.not_null), flag(new.not_null));
    push_change(
        &mut diff,
        "default",
        old.default.as_deref().map(normalize_expression),
        new.default.as_deref().map(normalize_expression),
    );
    let identity = |c: &Column| {
        c.identity
            .as_ref()
            .and_then(|i| serde_json::to_string(i).ok())
    };
    push_change(&mut diff, "identity", identity(old), identity(new));

    (!diff.is_empty()).then(|| JsonStatement::AlterColumn {
        from: old.clone(),
        to: new.clone(),
        diff,
    })
}

fn same_index(old: &Index, new: &Index) -> bool {
    let shape = |i: &Index| {
        let columns: Vec<_> = i
            .columns
            .iter()
            .map(|c| {
                let value = if c.is_expression {
                    normalize_expression(&c.value)
                } else {
                    c.value.clone()
                };
                (value, c.is_expression, c.asc, c.nulls_first, c.opclass.clone())
            })
            .collect();
        (
            columns,
            i.is_unique,
            i.method.to_ascii_lowercase(),
            i.where_clause.as_deref().map(normalize_expression),
            i.with.clone(),
        )
    };
    shape(old) == shape(new)
}

fn primary_keys(
    from: &Ddl,
    to: &Ddl,
    dialect: Dialect,
    survives: &dyn Fn(&str, &str) -> bool,
    out: &mut Vec<JsonStatement>,
) {
    let pks = split::<PrimaryKey>(from, to, dialect);
    let mut dropped: Vec<Option<&PrimaryKey>> = pks
        .dropped
        .into_iter()
        .filter(|pk| survives(&pk.schema, &pk.table))
        .map(Some)
        .collect();

    for pk in pks.created {
        if !survives(&pk.schema, &pk.table) {
            continue;
        }
        // A renamed or reshaped key on the same table is one alteration.
        let previous = dropped
            .iter_mut()
            .find(|d| d.is_some_and(|d| d.schema == pk.schema && d.table == pk.table))
            .and_then(Option::take);
        match previous {
            Some(old) => out.push(JsonStatement::AlterPk {
                from: old.clone(),
                to: pk.clone(),
            }),
            None => out.push(JsonStatement::AddPk { pk: pk.clone() }),
        }
    }
    for pk in dropped.into_iter().flatten() {
        out.push(JsonStatement::DropPk { pk: pk.clone() });
    }
    for (old, new) in pks.common {
        if old.columns != new.columns {
            out.push(JsonStatement::AlterPk {
                from: old.clone(),
                to: new.clone(),
            });
        }
    }
}

fn policies(
    from: &Ddl,
    to: &Ddl,
    dialect: Dialect,
    survives: &dyn Fn(&str, &str) -> bool,
    out: &mut Vec<JsonStatement>,
) {
    let policies = split::<Policy>(from, to, dialect);
    for policy in policies.created {
        out.push(JsonStatement::CreatePolicy {
            policy: policy.clone(),
        });
    }
    for policy in policies.dropped {
        if survives(&policy.schema, &policy.table) {
            out.push(JsonStatement::DropPolicy {
                policy: policy.clone(),
            });
        }
    }
    for (old, new) in policies.common {
        if old.kind != new.kind || old.command != new.command {
            out.push(JsonStatement::RecreatePolicy {
                from: old.clone(),
                to: new.clone(),
            });
            continue;
        }
        let mut diff = Vec::new();
        let roles = |p: &Policy| {
            let mut roles = p.roles.clone();
            roles.sort();
            Some(roles.join(","))
        };
        push_change(&mut diff, "roles", roles(old), roles(new));
        push_change(
            &mut diff,
            "using",
            old.using.as_deref().map(normalize_expression),
            new.using.as_deref().map(normalize_expression),
        );
        push_change(
            &mut diff,
            "withCheck",
            old.with_check.as_deref().map(normalize_expression),
            new.with_check.as_deref().map(normalize_expression),
        );
        if !diff.is_empty() {
            out.push(JsonStatement::AlterPolicy {
                policy: new.clone(),
                diff,
            });
        }
    }
}

fn views(from: &Ddl, to: &Ddl, dialect: Dialect, out: &mut Vec<JsonStatement>) {
    let views = split::<View>(from, to, dialect);
    // Views without a definition are managed elsewhere.
    for view in views.created.into_iter().filter(|v| v.definition.is_some()) {
        out.push(JsonStatement::CreateView { view: view.clone() });
    }
    for view in views.dropped.into_iter().filter(|v| v.definition.is_some()) {
        out.push(JsonStatement::DropView { view: view.clone() });
    }
    for (old, new) in views.common {
        if old.definition.is_none() || new.definition.is_none() {
            continue;
        }
        let definition = |v: &View| v.definition.as_deref().map(normalize_expression);
        if definition(old) != definition(new) || old.materialized != new.materialized {
            out.push(JsonStatement::RecreateView {
                from: old.clone(),
                to: new.clone(),
            });
            continue;
        }
        let mut diff = Vec::new();
        push_change(&mut diff, "checkOption", old.check_option.clone(), new.check_option.clone());
        push_change(&mut diff, "withNoData", flag(old.with_no_data), flag(new.with_no_data));
        if !diff.is_empty() {
            out.push(JsonStatement::AlterView {
                view: new.clone(),
                diff,
            });
        }
    }
}
