//! Benchmarks for diffing, SQL generation and conflict analysis.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ddlkit::migrate::{
    Column, Ddl, Dialect, FieldChange, ForeignKey, HeuristicResolver, Index, JsonStatement,
    NoRenames, PrimaryKey, ReferentialAction, Table, diff, explain_conflicts, generator_for,
};
use std::hint::black_box;
use tokio::runtime::Runtime;

/// A schema of `tables` tables, each with a key, a few columns, an index
/// and a foreign key to the previous table.
fn schema(tables: usize, extra_column: bool) -> Ddl {
    let mut builder = Ddl::builder();
    for i in 0..tables {
        let name = format!("table_{}", i);
        builder
            .push(Table::new("public", &name))
            .push(Column::new("public", &name, "id", "bigint").not_null())
            .push(Column::new("public", &name, "title", "varchar(255)").not_null())
            .push(Column::new("public", &name, "created_at", "timestamp").default_value("now()"))
            .push(PrimaryKey {
                schema: "public".into(),
                table: name.clone(),
                name: format!("{}_pkey", name),
                columns: vec!["id".into()],
            })
            .push(Index::new(
                "public",
                &name,
                format!("{}_title_idx", name),
                ["title"],
            ));
        if extra_column {
            builder.push(Column::new("public", &name, "body", "text"));
        }
        if i > 0 {
            builder
                .push(Column::new("public", &name, "parent_id", "bigint"))
                .push(ForeignKey {
                    schema: "public".into(),
                    table: name.clone(),
                    name: format!("{}_parent_fkey", name),
                    columns: vec!["parent_id".into()],
                    schema_to: "public".into(),
                    table_to: format!("table_{}", i - 1),
                    columns_to: vec!["id".into()],
                    on_update: ReferentialAction::NoAction,
                    on_delete: ReferentialAction::Cascade,
                });
        }
    }
    builder.build()
}

/// Benchmark diffing schemas of growing size.
fn bench_diff(c: &mut Criterion) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };
    let mut group = c.benchmark_group("diff");

    for size in [10, 50, 200] {
        let empty = Ddl::empty();
        let from = schema(size, false);
        let to = schema(size, true);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("create_all", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                black_box(
                    diff(&empty, &to, Dialect::Postgresql, &NoRenames)
                        .await
                        .unwrap(),
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("identical", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                black_box(
                    diff(&from, &from, Dialect::Postgresql, &NoRenames)
                        .await
                        .unwrap(),
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("add_columns", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                black_box(
                    diff(&from, &to, Dialect::Postgresql, &HeuristicResolver)
                        .await
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

/// Benchmark SQL generation per dialect.
fn bench_generate(c: &mut Criterion) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };
    let mut group = c.benchmark_group("generate");
    let to = schema(50, true);

    for dialect in [Dialect::Postgresql, Dialect::Mysql, Dialect::Mssql] {
        let statements = rt
            .block_on(diff(&Ddl::empty(), &to, dialect, &NoRenames))
            .unwrap()
            .statements;
        let generator = generator_for(dialect);
        group.bench_function(dialect.as_str(), |b| {
            b.iter(|| black_box(generator.generate(&statements).unwrap().to_script(true)))
        });
    }

    group.finish();
}

/// Benchmark the pairwise conflict rules.
fn bench_explain_conflicts(c: &mut Criterion) {
    let mut group = c.benchmark_group("explain_conflicts");

    let alters = |table: &str| -> Vec<JsonStatement> {
        (0..50)
            .map(|i| {
                let from = Column::new("public", table, format!("c{}", i), "text");
                let to = from.clone().not_null();
                JsonStatement::AlterColumn {
                    from,
                    to,
                    diff: vec![FieldChange::new(
                        "notNull",
                        Some("false".into()),
                        Some("true".into()),
                    )],
                }
            })
            .collect()
    };

    let left = alters("a");
    let disjoint = alters("b");
    group.bench_function("disjoint_50x50", |b| {
        b.iter(|| black_box(explain_conflicts(&left, &disjoint)))
    });
    group.bench_function("overlapping_50x50", |b| {
        b.iter(|| black_box(explain_conflicts(&left, &left)))
    });

    group.finish();
}

criterion_group!(benches, bench_diff, bench_generate, bench_explain_conflicts);
criterion_main!(benches);
