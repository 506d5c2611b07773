//! Migration lifecycle and load driver for the library database.
//!
//! Provides [`Migration`] for creating, dropping, loading and refreshing
//! the tables of one [`SchemaVariant`]. Table creation and drops run in a
//! transaction; loads run one transaction per library.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use kicad_libdb_core::SchemaVariant;
//! use kicad_libdb_sqlite::{LoadOptions, Migration, SchemaOptions};
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("libraries.db").unwrap();
//! let mut migration =
//!     Migration::new(conn, SchemaOptions::new(SchemaVariant::Flattened, "")).unwrap();
//!
//! // Create tables
//! migration.up().unwrap();
//!
//! // Load every library under a root
//! let report = migration
//!     .load(&[PathBuf::from("/usr/share/kicad")], &LoadOptions::default())
//!     .unwrap();
//! println!("{} symbols, {} pins", report.symbols_inserted, report.pins_inserted);
//!
//! // Drop, recreate and load again
//! migration
//!     .refresh(&[PathBuf::from("/usr/share/kicad")], &LoadOptions::default())
//!     .unwrap();
//! ```

use std::path::PathBuf;

use kicad_libdb_core::SchemaVariant;
use kicad_libdb_discovery::discover_libraries;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, SqliteError};
use crate::load::{self, FailureTracker, LoadOptions, LoadReport};
use crate::query::LibraryQuery;
use crate::schema::{
    SchemaOptions, detect_variant, generate_drop_sql, generate_schema_sql, table_exists,
    validate_prefix,
};

/// Manages the tables of one library database.
///
/// Loading is not idempotent: loading the same roots twice inserts every
/// row twice. Use [`refresh`](Self::refresh) for a fresh load.
pub struct Migration {
    conn: Connection,
    options: SchemaOptions,
}

impl Migration {
    /// Creates a new migration manager for the given connection and schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix contains invalid characters.
    pub fn new(conn: Connection, options: SchemaOptions) -> Result<Self> {
        validate_prefix(&options.prefix)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn, options })
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Creates all tables and indexes of the configured variant.
    ///
    /// Uses `CREATE TABLE IF NOT EXISTS` so it is safe to call multiple times.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::SchemaMismatch`] if the database already holds
    /// the other variant under the same prefix.
    pub fn up(&mut self) -> Result<()> {
        if let Some(found) = detect_variant(&self.conn, &self.options.prefix)? {
            if found != self.options.variant {
                return Err(SqliteError::SchemaMismatch {
                    expected: self.options.variant,
                    found,
                });
            }
        }

        let sql = generate_schema_sql(self.options.variant, &self.options.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to create tables: {e}")))?;
        tx.commit()?;
        Ok(())
    }

    /// Drops the tables of both variants in reverse dependency order.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.options.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to drop tables: {e}")))?;
        tx.commit()?;
        Ok(())
    }

    /// Returns the current status of the database.
    ///
    /// Counts are taken from whichever variant is present, which may differ
    /// from the configured one.
    pub fn status(&self) -> Result<MigrationStatus> {
        let prefix = &self.options.prefix;
        let Some(variant) = detect_variant(&self.conn, prefix)? else {
            return Ok(MigrationStatus::default());
        };

        let property_count = match variant {
            SchemaVariant::Flattened => 0,
            SchemaVariant::Normalized => self.count_rows("properties")?,
        };
        let last_load = if table_exists(&self.conn, prefix, "load_runs")? {
            LibraryQuery::new(&self.conn, prefix.as_str())?
                .last_load_run()?
                .map(|run| run.created_at)
        } else {
            None
        };

        Ok(MigrationStatus {
            tables_exist: true,
            variant: Some(variant),
            symbol_count: self.count_rows("symbols")?,
            pin_count: self.count_rows("pins")?,
            footprint_count: self.count_rows("footprints")?,
            property_count,
            last_load,
        })
    }

    /// Discovers libraries under `roots` and loads all of them.
    ///
    /// Creates the tables first if needed. Symbol libraries are loaded
    /// before footprint libraries, each in sorted path order. A
    /// `load_runs` row is written once everything has been loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::DiscoverError`] if discovery fails,
    /// [`SqliteError::TooManyFailures`] if the failure policy trips, or
    /// [`SqliteError::DatabaseError`] if an insert fails. Libraries
    /// committed before the error stay in the database.
    pub fn load(&mut self, roots: &[PathBuf], options: &LoadOptions) -> Result<LoadReport> {
        self.up()?;
        let discovered = discover_libraries(roots, &options.suffixes)?;

        let emitter = options.emitter(self.options.variant, &self.options.prefix);
        let mut report = LoadReport::new(self.options.variant);
        let mut failures = FailureTracker::new(options.failure);

        for path in &discovered.symbol_libraries {
            load::load_symbol_library(
                &mut self.conn,
                path,
                emitter.as_ref(),
                options,
                &mut report,
                &mut failures,
            )?;
        }
        for dir in &discovered.footprint_libraries {
            load::load_footprint_library(
                &mut self.conn,
                dir,
                emitter.as_ref(),
                options,
                &mut report,
                &mut failures,
            )?;
        }

        load::record_run(&self.conn, &self.options.prefix, &mut report)?;
        info!(
            variant = %report.variant,
            symbols = report.symbols_inserted,
            pins = report.pins_inserted,
            footprints = report.footprints_inserted,
            skipped = report.skipped.len(),
            "Load complete"
        );
        Ok(report)
    }

    /// Drops all tables, recreates them, and loads from `roots`.
    ///
    /// Equivalent to calling [`down`](Self::down), [`up`](Self::up), then
    /// [`load`](Self::load) in sequence.
    pub fn refresh(&mut self, roots: &[PathBuf], options: &LoadOptions) -> Result<LoadReport> {
        self.down()?;
        self.up()?;
        self.load(roots, options)
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Counts rows in a prefixed table.
    fn count_rows(&self, table: &str) -> Result<usize> {
        let full_table = format!("{}{}", self.options.prefix, table);
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT COUNT(*) FROM {full_table}"))?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Snapshot returned by [`Migration::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Whether the library tables exist in the database.
    pub tables_exist: bool,
    /// Variant of the existing tables.
    pub variant: Option<SchemaVariant>,
    pub symbol_count: usize,
    pub pin_count: usize,
    pub footprint_count: usize,
    /// Symbol property rows (normalized variant only).
    pub property_count: usize,
    /// Timestamp of the last completed load, if any.
    pub last_load: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(variant: SchemaVariant, prefix: &str) -> Migration {
        let conn = Connection::open_in_memory().unwrap();
        Migration::new(conn, SchemaOptions::new(variant, prefix)).unwrap()
    }

    #[test]
    fn test_migration_new_validates_prefix() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(Migration::new(conn, SchemaOptions::new(SchemaVariant::Flattened, "kl_")).is_ok());

        let conn = Connection::open_in_memory().unwrap();
        assert!(Migration::new(conn, SchemaOptions::default()).is_ok());

        let conn = Connection::open_in_memory().unwrap();
        let err = Migration::new(conn, SchemaOptions::new(SchemaVariant::Flattened, "drop;--"))
            .err()
            .unwrap();
        assert!(matches!(err, SqliteError::InvalidPrefix(_)));
    }

    #[test]
    fn test_status_on_empty_database() {
        let status = migration(SchemaVariant::Flattened, "").status().unwrap();
        assert!(!status.tables_exist);
        assert!(status.variant.is_none());
        assert_eq!(status.symbol_count, 0);
    }

    #[test]
    fn test_up_and_status() {
        let mut migration = migration(SchemaVariant::Normalized, "kl_");
        migration.up().unwrap();
        let status = migration.status().unwrap();
        assert!(status.tables_exist);
        assert_eq!(status.variant, Some(SchemaVariant::Normalized));
        assert_eq!(status.pin_count, 0);
        assert!(status.last_load.is_none());
    }

    #[test]
    fn test_up_is_idempotent() {
        let mut migration = migration(SchemaVariant::Flattened, "");
        migration.up().unwrap();
        migration.up().unwrap();
        assert!(migration.status().unwrap().tables_exist);
    }

    #[test]
    fn test_up_rejects_other_variant() {
        let mut flattened = migration(SchemaVariant::Flattened, "");
        flattened.up().unwrap();

        let conn = flattened.into_connection();
        let mut normalized =
            Migration::new(conn, SchemaOptions::new(SchemaVariant::Normalized, "")).unwrap();
        let err = normalized.up().unwrap_err();
        assert!(matches!(
            err,
            SqliteError::SchemaMismatch {
                expected: SchemaVariant::Normalized,
                found: SchemaVariant::Flattened,
            }
        ));

        // a different prefix is an independent table set
        let conn = normalized.into_connection();
        let mut other =
            Migration::new(conn, SchemaOptions::new(SchemaVariant::Normalized, "n_")).unwrap();
        other.up().unwrap();
    }

    #[test]
    fn test_down_removes_tables() {
        let mut migration = migration(SchemaVariant::Normalized, "");
        migration.up().unwrap();
        migration.down().unwrap();
        assert!(!migration.status().unwrap().tables_exist);
        assert!(!table_exists(migration.connection(), "", "footprint_properties").unwrap());
    }

    #[test]
    fn test_down_is_idempotent() {
        let mut migration = migration(SchemaVariant::Flattened, "");
        migration.down().unwrap();
    }

    #[test]
    fn test_load_requires_roots() {
        let mut migration = migration(SchemaVariant::Flattened, "");
        let err = migration.load(&[], &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SqliteError::DiscoverError(_)));
        // tables were created, but no run was recorded
        assert!(migration.status().unwrap().last_load.is_none());
    }
}
