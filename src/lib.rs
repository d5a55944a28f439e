//! # ddlkit
//!
//! Schema diffing, migration planning and branch-conflict detection for SQL
//! databases.
//!
//! ddlkit provides:
//! - A normalized DDL entity model with versioned, lineage-aware snapshots
//! - A diff engine producing dependency-ordered statements, with pluggable
//!   rename resolution
//! - SQL generators for PostgreSQL, CockroachDB, MySQL, SQLite and SQL Server
//! - Commutativity analysis that flags migration branches which cannot be
//!   applied in either order
//! - Catalog introspection and drift detection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ddlkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ddlkit::MigrationError> {
//!     let before = Ddl::empty();
//!     let after = Ddl::builder()
//!         .with(Table::new("public", "users"))
//!         .with(Column::new("public", "users", "id", "integer").not_null())
//!         .build();
//!
//!     let result = diff(&before, &after, Dialect::Postgresql, &NoRenames).await?;
//!     let sql = generator_for(Dialect::Postgresql).generate(&result.statements)?;
//!     print!("{}", sql.to_script(true));
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The migration engine.
pub mod migrate {
    pub use ddlkit_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use ddlkit_migrate::{
        Column, Ddl, DdlDocument, Dialect, EntityKind, HeuristicResolver, HintResolver, Index,
        JsonStatement, MigrationConfig, MigrationEngine, NoRenames, Resolver, Snapshot,
        SqlGenerator, Table, detect_non_commutative, diff, explain_conflicts, generator_for,
    };
}

// Re-export key types at the crate root
pub use ddlkit_migrate::{
    ConflictReport, Ddl, DiffResult, Dialect, JsonStatement, MigrateResult, MigrationError,
    Snapshot,
};
