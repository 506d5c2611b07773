//! Read-back queries over a loaded library database.
//!
//! [`LibraryQuery`] works against either schema variant; it detects which
//! one is present when a query depends on it.
//!
//! # Example
//!
//! ```no_run
//! use kicad_libdb_sqlite::LibraryQuery;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("libraries.db").unwrap();
//! let query = LibraryQuery::new(&conn, "").unwrap();
//!
//! for symbol in query.find_symbols("LED%").unwrap() {
//!     let pins = query.pins_for_symbol(symbol.id).unwrap();
//!     println!("{}:{} ({} pins)", symbol.library, symbol.name, pins.len());
//! }
//! ```

use kicad_libdb_core::{PinRow, Property, SchemaVariant};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::Result;
use crate::schema::{detect_variant, validate_prefix};

/// Columns of the flattened `symbols` table that hold property values.
const FLATTENED_PROPERTY_COLUMNS: [&str; 7] = [
    "reference",
    "value",
    "footprint",
    "footprint_filter",
    "datasheet",
    "keywords",
    "description",
];

/// A stored symbol row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSymbol {
    pub id: i64,
    pub name: String,
    pub library: String,
}

/// A stored footprint row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFootprint {
    pub id: i64,
    pub name: String,
    pub library: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub pads: usize,
}

/// A row of the `load_runs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadRun {
    pub id: i64,
    pub created_at: String,
    pub variant: String,
    pub symbol_count: usize,
    pub footprint_count: usize,
    pub skipped_count: usize,
}

/// Query interface for reading loaded libraries.
pub struct LibraryQuery<'a> {
    conn: &'a Connection,
    prefix: String,
}

impl<'a> LibraryQuery<'a> {
    /// Creates a new query interface for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`](crate::SqliteError::InvalidPrefix)
    /// if the prefix is invalid.
    pub fn new(conn: &'a Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { conn, prefix })
    }

    /// Finds symbols whose name matches a SQL `LIKE` pattern.
    ///
    /// Results are ordered by library, then name, then insertion order.
    pub fn find_symbols(&self, pattern: &str) -> Result<Vec<StoredSymbol>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, library FROM {}symbols WHERE name LIKE ?1 \
             ORDER BY library, name, id",
            self.prefix
        ))?;

        let symbols = stmt
            .query_map([pattern], |row| {
                Ok(StoredSymbol {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    library: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    /// Returns the pins of a symbol in insertion order.
    pub fn pins_for_symbol(&self, symbol_id: i64) -> Result<Vec<PinRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT number, name, electrical_type, is_alternate FROM {}pins \
             WHERE symbol_rowid = ?1 ORDER BY id",
            self.prefix
        ))?;

        let pins = stmt
            .query_map([symbol_id], |row| {
                Ok(PinRow {
                    number: row.get(0)?,
                    name: row.get(1)?,
                    electrical_type: row.get(2)?,
                    is_alternate: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pins)
    }

    /// Returns the stored properties of a symbol.
    ///
    /// For the normalized variant these are the key/value rows in insertion
    /// order. For the flattened variant they are the non-NULL property
    /// columns, keyed by column name.
    pub fn symbol_properties(&self, symbol_id: i64) -> Result<Vec<Property>> {
        match detect_variant(self.conn, &self.prefix)? {
            None => Ok(Vec::new()),
            Some(SchemaVariant::Normalized) => {
                self.property_rows("properties", "symbol_rowid", symbol_id)
            }
            Some(SchemaVariant::Flattened) => {
                let sql = format!(
                    "SELECT {} FROM {}symbols WHERE id = ?1",
                    FLATTENED_PROPERTY_COLUMNS.join(", "),
                    self.prefix
                );
                let values: Option<Vec<Option<String>>> = self
                    .conn
                    .query_row(&sql, [symbol_id], |row| {
                        (0..FLATTENED_PROPERTY_COLUMNS.len())
                            .map(|i| row.get(i))
                            .collect()
                    })
                    .optional()?;

                Ok(values
                    .unwrap_or_default()
                    .into_iter()
                    .zip(FLATTENED_PROPERTY_COLUMNS)
                    .filter_map(|(value, column)| value.map(|v| Property::new(column, v)))
                    .collect())
            }
        }
    }

    /// Returns the key/value properties of a footprint. Always empty for
    /// the flattened variant.
    pub fn footprint_properties(&self, footprint_id: i64) -> Result<Vec<Property>> {
        match detect_variant(self.conn, &self.prefix)? {
            Some(SchemaVariant::Normalized) => {
                self.property_rows("footprint_properties", "footprint_rowid", footprint_id)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Returns the footprints of one library, ordered by name.
    pub fn footprints_in_library(&self, library: &str) -> Result<Vec<StoredFootprint>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, library, description, tags, pads FROM {}footprints \
             WHERE library = ?1 ORDER BY name, id",
            self.prefix
        ))?;

        let footprints = stmt
            .query_map([library], |row| {
                Ok(StoredFootprint {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    library: row.get(2)?,
                    description: row.get(3)?,
                    tags: row.get(4)?,
                    pads: row.get::<_, i64>(5)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(footprints)
    }

    /// Returns the most recent completed load, if any.
    pub fn last_load_run(&self) -> Result<Option<LoadRun>> {
        let run = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, created_at, variant, symbol_count, footprint_count, skipped_count \
                     FROM {}load_runs ORDER BY id DESC LIMIT 1",
                    self.prefix
                ),
                [],
                |row| {
                    Ok(LoadRun {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                        variant: row.get(2)?,
                        symbol_count: row.get::<_, i64>(3)? as usize,
                        footprint_count: row.get::<_, i64>(4)? as usize,
                        skipped_count: row.get::<_, i64>(5)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    fn property_rows(&self, table: &str, owner_column: &str, owner_id: i64) -> Result<Vec<Property>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT key, value FROM {}{table} WHERE {owner_column} = ?1 ORDER BY id",
            self.prefix
        ))?;

        let properties = stmt
            .query_map(params![owner_id], |row| {
                Ok(Property::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(properties)
    }
}
