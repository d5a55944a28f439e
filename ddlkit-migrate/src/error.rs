//! Error types for the migration engine.

use thiserror::Error;

use crate::ddl::Dialect;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
///
/// Structural problems found while diffing two schemas are *not* errors: they
/// are returned as [`crate::validate::DiffError`] values next to the
/// statements. This enum covers I/O, corrupted inputs and programming errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot file is malformed.
    #[error("Invalid snapshot {path}: {message}")]
    InvalidSnapshot {
        /// Path or id of the snapshot.
        path: String,
        /// What is wrong with it.
        message: String,
    },

    /// Snapshot version is not understood by this build.
    #[error("Unsupported snapshot version '{0}'")]
    UnsupportedVersion(String),

    /// A snapshot was written for another dialect.
    #[error("Snapshot '{id}' targets {found}, expected {expected}")]
    DialectMismatch {
        /// Snapshot id.
        id: String,
        /// Dialect the caller asked for.
        expected: Dialect,
        /// Dialect recorded in the snapshot.
        found: Dialect,
    },

    /// The declared schema failed validation.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A rename resolver broke its partition contract.
    #[error("Resolver contract violated for {kind}: {message}")]
    ResolverContract {
        /// Entity kind being resolved.
        kind: String,
        /// Offending entity and what happened to it.
        message: String,
    },

    /// Snapshot lineage is corrupted (cycle, dangling parent, duplicate id).
    #[error("Corrupted migration lineage: {0}")]
    Lineage(String),

    /// The dialect cannot express a statement.
    #[error("{dialect} cannot express '{statement}'")]
    Unsupported {
        /// Target dialect.
        dialect: Dialect,
        /// Statement type tag.
        statement: String,
    },

    /// Data loss would occur.
    #[error("Data loss would occur: {0}")]
    DataLoss(String),

    /// Migration branches do not commute.
    #[error("{0} non-commutative branch pair(s) detected")]
    Conflicts(usize),

    /// No changes to migrate.
    #[error("No schema changes detected")]
    NoChanges,

    /// Database catalog error.
    #[error("Database error: {0}")]
    Database(String),

    /// General migration error.
    #[error("Migration error: {0}")]
    Other(String),
}

impl MigrationError {
    /// Create an invalid snapshot error.
    pub fn invalid_snapshot(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a resolver contract error.
    pub fn resolver_contract(kind: impl ToString, message: impl Into<String>) -> Self {
        Self::ResolverContract {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    /// Create an unsupported statement error.
    pub fn unsupported(dialect: Dialect, statement: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            statement: statement.into(),
        }
    }

    /// Create a lineage error.
    pub fn lineage(msg: impl Into<String>) -> Self {
        Self::Lineage(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a general error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check if this error is recoverable by the user without code changes.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoChanges | Self::DataLoss(_) | Self::Conflicts(_) | Self::InvalidSchema(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::unsupported(Dialect::Sqlite, "alter_column");
        assert_eq!(err.to_string(), "sqlite cannot express 'alter_column'");

        let err = MigrationError::lineage("cycle detected: a -> b -> a");
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(MigrationError::NoChanges.is_recoverable());
        assert!(MigrationError::Conflicts(2).is_recoverable());
        assert!(!MigrationError::lineage("dangling parent").is_recoverable());
        assert!(!MigrationError::resolver_contract("table", "dropped").is_recoverable());
    }
}
