//! Error types for SQLite storage and load operations.

use kicad_libdb_core::SchemaVariant;
use kicad_libdb_discovery::DiscoverError;
use thiserror::Error;

/// Errors that can occur while creating tables or loading libraries.
///
/// Parse and mapping failures of individual files or parts are not errors
/// at this level; they are recorded as skips in the
/// [`LoadReport`](crate::LoadReport). Everything here aborts the operation.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),

    /// Input discovery failed.
    #[error("discovery error: {0}")]
    DiscoverError(#[from] DiscoverError),

    /// The database already holds tables of the other schema variant.
    #[error("schema mismatch: database holds the {found} variant, {expected} was requested")]
    SchemaMismatch {
        expected: SchemaVariant,
        found: SchemaVariant,
    },

    /// The run skipped too many items in a row.
    #[error("aborted after {count} consecutive skipped items (last: {last})")]
    TooManyFailures { count: usize, last: String },
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
