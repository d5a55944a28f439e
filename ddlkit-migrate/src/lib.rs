//! # ddlkit-migrate
//!
//! Migration planning engine for ddlkit.
//!
//! This crate provides:
//! - A typed DDL entity model and versioned snapshots with lineage
//! - A diff engine that orders statements safely and asks a pluggable
//!   resolver about renames
//! - SQL generators for PostgreSQL, CockroachDB, MySQL, SQLite and SQL Server
//! - Commutativity analysis of parallel migration branches
//! - A catalog introspector for PostgreSQL and drift detection
//! - Migration folder management and a planning engine
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Declared DDL │────▶│  Diff Engine   │────▶│   SQL Gen   │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!         ▲                │        ▲                │
//!         │                ▼        │                ▼
//! ┌──────────────┐  ┌────────────┐  │         ┌─────────────┐
//! │ Introspector │  │  Resolver  │  │         │ migration/  │
//! └──────────────┘  └────────────┘  │         │  .sql .json │
//!                                   │         └─────────────┘
//!                          ┌────────────────┐        │
//!                          │ Commutativity  │◀───────┘
//!                          └────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ddlkit_migrate::{
//!     Column, Ddl, Dialect, HeuristicResolver, MigrationConfig, MigrationEngine, Table,
//! };
//!
//! let declared = Ddl::builder()
//!     .with(Table::new("public", "users"))
//!     .with(Column::new("public", "users", "id", "integer").not_null())
//!     .build();
//!
//! let engine = MigrationEngine::new(
//!     MigrationConfig::new()
//!         .migrations_dir("./drizzle")
//!         .dialect(Dialect::Postgresql),
//! );
//!
//! let file = engine.generate("create_users", &declared, &HeuristicResolver).await?;
//! println!("wrote {}", file.path.display());
//!
//! // Before merging two branches of the folder:
//! let report = engine.check().await?;
//! println!("{}", report.summary());
//! ```
//!
//! ## Migration Files
//!
//! ```text
//! migrations/
//! ├── 20250101120000_create_users/
//! │   ├── snapshot.json
//! │   └── migration.sql
//! └── 20250102090000_add_posts/
//!     ├── snapshot.json
//!     └── migration.sql
//! ```

pub mod commutativity;
pub mod ddl;
pub mod diff;
pub mod engine;
pub mod error;
pub mod file;
pub mod introspect;
pub mod resolver;
pub mod snapshot;
pub mod sql;
pub mod statement;
pub mod validate;

// Re-exports
pub use commutativity::{
    BranchHead, Conflict, ConflictReport, Lineage, analyze_lineage, detect_non_commutative,
    explain_conflicts,
};
pub use ddl::{
    Check, Column, DEFAULT_SCHEMA, Ddl, DdlBuilder, DdlDocument, DdlEntity, Dialect, Entity,
    EntityKey, EntityKind, EnumType, ForeignKey, Generated, GeneratedKind, Identity,
    IdentityKind, Index, IndexColumn, Policy, PolicyAs, PolicyFor, PrimaryKey, Privilege,
    PrivilegeType, ReferentialAction, Role, Schema, Sequence, Table, Unique, View,
};
pub use diff::{DiffResult, SchemaDiffer, diff};
pub use engine::{MigrationConfig, MigrationEngine, MigrationPlan};
pub use error::{MigrateResult, MigrationError};
pub use file::{MIGRATION_FILE, MigrationFile, MigrationFileManager, SNAPSHOT_FILE};
pub use introspect::{
    CatalogQuery, IntrospectionConfig, IntrospectionResult, Introspector, PostgresIntrospector,
    SkippedTable, detect_drift,
};
pub use resolver::{
    HeuristicResolver, HintResolver, NoRenames, Renamed, Resolver, ResolverInput, ResolverOutput,
};
pub use snapshot::{ORIGIN_ID, RenameHint, SNAPSHOT_VERSION, Snapshot};
pub use sql::{
    MigrationSql, MssqlGenerator, MySqlGenerator, PostgresSqlGenerator, STATEMENT_BREAKPOINT,
    SqlGenerator, SqliteGenerator, generator_for,
};
pub use statement::{FieldChange, FullTable, JsonStatement};
pub use validate::{DdlSide, DiffError, DiffErrorKind};
