//! SQLite storage backend and batch loader for KiCad libraries.
//!
//! This crate owns the destination database: it creates the tables of one
//! of two schema variants, loads discovered libraries into them through a
//! variant-specific [`RowEmitter`], and reads the rows back.
//!
//! # Architecture
//!
//! - **`schema`**: SQL generation with optional table prefixes
//! - **`convert`**: row emitters turning pipeline rows into inserts
//! - **`load`**: per-library transactions, skip tracking and reports
//! - **`migration`**: lifecycle operations (up/down/status/load/refresh)
//! - **`query`**: read-back of symbols, pins, footprints and load runs
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use kicad_libdb_core::{LoadConfig, SchemaVariant};
//! use kicad_libdb_sqlite::{LibraryQuery, LoadOptions, Migration, SchemaOptions};
//! use rusqlite::Connection;
//!
//! let config = LoadConfig::default();
//! let conn = Connection::open("libraries.db").unwrap();
//! let mut migration = Migration::new(conn, SchemaOptions::from(&config.schema)).unwrap();
//!
//! let report = migration
//!     .load(&[PathBuf::from("kicad-symbols")], &LoadOptions::from_config(&config))
//!     .unwrap();
//! println!("skipped {} items", report.skipped.len());
//!
//! let conn = migration.into_connection();
//! let query = LibraryQuery::new(&conn, "").unwrap();
//! let leds = query.find_symbols("LED%").unwrap();
//! println!("{} LED symbols", leds.len());
//! ```
//!
//! # Table prefix customization
//!
//! All table and index names take a configurable prefix, allowing several
//! isolated library sets within the same SQLite database. Prefixes must
//! contain only alphanumeric characters and underscores; the empty prefix
//! yields bare table names.

mod convert;
mod error;
mod load;
mod migration;
mod query;
mod schema;

pub use convert::{FlattenedEmitter, NormalizedEmitter, RowEmitter, insert_footprint, insert_pins};
pub use error::{Result, SqliteError};
pub use load::{FailurePolicy, LibraryReport, LoadOptions, LoadReport, SkippedItem};
pub use migration::{Migration, MigrationStatus};
pub use query::{LibraryQuery, LoadRun, StoredFootprint, StoredSymbol};
pub use schema::{SchemaOptions, detect_variant, generate_drop_sql, generate_schema_sql};
