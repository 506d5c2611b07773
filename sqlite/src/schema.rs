//! SQL schema generation for both table layouts.
//!
//! Generates `CREATE TABLE` and `CREATE INDEX` statements for the selected
//! [`SchemaVariant`]. All table names carry an optional prefix so several
//! isolated library sets can share one SQLite file.
//!
//! # Table structure
//!
//! Flattened variant:
//!
//! - `{prefix}symbols`: one row per symbol, fixed property columns
//! - `{prefix}pins`: base pins and alternates, linked by `symbol_rowid`
//! - `{prefix}footprints`: one row per footprint with its pad count
//!
//! Normalized variant:
//!
//! - `{prefix}symbols`: name and library only
//! - `{prefix}properties`: symbol properties as key/value rows
//! - `{prefix}pins`: as above
//! - `{prefix}footprints`: as above
//! - `{prefix}footprint_properties`: footprint properties as key/value rows
//!
//! Both variants carry `{prefix}load_runs`, one row per completed load.
//!
//! # Custom prefix
//!
//! Prefixes must contain only alphanumeric characters and underscores. An
//! empty prefix yields bare table names.

use kicad_libdb_core::{SchemaConfig, SchemaVariant};
use rusqlite::Connection;

use crate::error::{Result, SqliteError};

/// Table layout and name prefix of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    pub variant: SchemaVariant,
    pub prefix: String,
}

impl SchemaOptions {
    pub fn new(variant: SchemaVariant, prefix: impl Into<String>) -> Self {
        Self {
            variant,
            prefix: prefix.into(),
        }
    }
}

impl From<&SchemaConfig> for SchemaOptions {
    fn from(config: &SchemaConfig) -> Self {
        Self::new(config.variant, config.prefix.clone())
    }
}

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Generates the SQL schema for one variant with the given prefix.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix contains characters
/// other than alphanumerics and underscores.
///
/// # Examples
///
/// ```
/// use kicad_libdb_core::SchemaVariant;
/// use kicad_libdb_sqlite::generate_schema_sql;
///
/// let sql = generate_schema_sql(SchemaVariant::Normalized, "kl_").unwrap();
/// assert!(sql.contains("CREATE TABLE IF NOT EXISTS kl_properties"));
/// assert!(generate_schema_sql(SchemaVariant::Flattened, "bad-prefix").is_err());
/// ```
pub fn generate_schema_sql(variant: SchemaVariant, prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let symbols = match variant {
        SchemaVariant::Flattened => format!(
            r#"
CREATE TABLE IF NOT EXISTS {prefix}symbols (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    library TEXT NOT NULL,
    reference TEXT,
    value TEXT,
    footprint TEXT,
    footprint_filter TEXT,
    datasheet TEXT,
    keywords TEXT,
    description TEXT
);
"#
        ),
        SchemaVariant::Normalized => format!(
            r#"
CREATE TABLE IF NOT EXISTS {prefix}symbols (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    library TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS {prefix}properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol_rowid INTEGER NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    FOREIGN KEY (symbol_rowid) REFERENCES {prefix}symbols(id)
);
"#
        ),
    };

    let shared = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}pins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol_rowid INTEGER NOT NULL,
    number TEXT NOT NULL,
    name TEXT NOT NULL,
    electrical_type TEXT NOT NULL,
    is_alternate INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (symbol_rowid) REFERENCES {prefix}symbols(id)
);

CREATE TABLE IF NOT EXISTS {prefix}footprints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    library TEXT NOT NULL,
    description TEXT,
    tags TEXT,
    pads INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS {prefix}load_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    variant TEXT NOT NULL,
    symbol_count INTEGER NOT NULL,
    footprint_count INTEGER NOT NULL,
    skipped_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{prefix}symbols_name ON {prefix}symbols(name);
CREATE INDEX IF NOT EXISTS idx_{prefix}pins_symbol ON {prefix}pins(symbol_rowid);
CREATE INDEX IF NOT EXISTS idx_{prefix}footprints_library ON {prefix}footprints(library);
"#
    );

    let footprint_properties = match variant {
        SchemaVariant::Flattened => String::new(),
        SchemaVariant::Normalized => format!(
            r#"
CREATE TABLE IF NOT EXISTS {prefix}footprint_properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    footprint_rowid INTEGER NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    FOREIGN KEY (footprint_rowid) REFERENCES {prefix}footprints(id)
);

CREATE INDEX IF NOT EXISTS idx_{prefix}properties_symbol ON {prefix}properties(symbol_rowid);
CREATE INDEX IF NOT EXISTS idx_{prefix}footprint_properties_footprint ON {prefix}footprint_properties(footprint_rowid);
"#
        ),
    };

    Ok(format!("{symbols}{shared}{footprint_properties}"))
}

/// Generates SQL to drop the tables of either variant in reverse
/// dependency order.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
DROP TABLE IF EXISTS {prefix}load_runs;
DROP TABLE IF EXISTS {prefix}footprint_properties;
DROP TABLE IF EXISTS {prefix}footprints;
DROP TABLE IF EXISTS {prefix}pins;
DROP TABLE IF EXISTS {prefix}properties;
DROP TABLE IF EXISTS {prefix}symbols;
"#
    );

    Ok(sql)
}

/// Returns `true` if a table named `{prefix}{table}` exists.
pub(crate) fn table_exists(conn: &Connection, prefix: &str, table: &str) -> Result<bool> {
    let table_name = format!("{prefix}{table}");
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1")?;
    let count: i64 = stmt.query_row([&table_name], |row| row.get(0))?;
    Ok(count > 0)
}

/// Detects which variant the existing `symbols` table belongs to.
///
/// Returns `None` when there is no `symbols` table. A `symbols` table with
/// a `reference` column is the flattened variant.
pub fn detect_variant(conn: &Connection, prefix: &str) -> Result<Option<SchemaVariant>> {
    validate_prefix(prefix)?;
    if !table_exists(conn, prefix, "symbols")? {
        return Ok(None);
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT COUNT(*) FROM pragma_table_info('{prefix}symbols') WHERE name = 'reference'"
    ))?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;

    Ok(Some(if count > 0 {
        SchemaVariant::Flattened
    } else {
        SchemaVariant::Normalized
    }))
}
