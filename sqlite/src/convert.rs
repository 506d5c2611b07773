//! Row emitters: pipeline rows to SQL `INSERT`s.
//!
//! A [`RowEmitter`] knows how one schema variant stores a part. The loader
//! calls it parent first: [`insert_symbol`](RowEmitter::insert_symbol)
//! returns the new row id, and every child row (pins, property rows) is
//! inserted with that id.
//!
//! - [`FlattenedEmitter`] projects symbol properties onto the fixed columns
//!   named by a [`ColumnMap`]; other keys are dropped.
//! - [`NormalizedEmitter`] stores properties as key/value rows, optionally
//!   filtered by an allow-list.
//!
//! Emitters take a plain `&Connection`; pass a `&Transaction` (it derefs)
//! to group the inserts of one library.

use kicad_libdb_core::{
    ColumnMap, FootprintRow, PinRow, Property, SchemaVariant, SymbolRow, allows_property,
};
use rusqlite::{Connection, params};

use crate::error::Result;

/// Inserts pipeline rows for one schema variant.
pub trait RowEmitter {
    /// Variant whose tables this emitter writes.
    fn variant(&self) -> SchemaVariant;

    /// Inserts the symbol row and returns its row id.
    fn insert_symbol(&self, conn: &Connection, symbol: &SymbolRow) -> Result<i64>;

    /// Inserts the key/value property rows of a symbol. Returns how many
    /// rows were written.
    fn insert_symbol_properties(
        &self,
        _conn: &Connection,
        _symbol_id: i64,
        _properties: &[Property],
    ) -> Result<usize> {
        Ok(0)
    }

    /// Inserts pin rows linked to `symbol_id`, in the given order.
    fn insert_pins(&self, conn: &Connection, symbol_id: i64, pins: &[PinRow]) -> Result<usize>;

    /// Inserts the footprint row and returns its row id.
    fn insert_footprint(&self, conn: &Connection, footprint: &FootprintRow) -> Result<i64>;

    /// Inserts the key/value property rows of a footprint.
    fn insert_footprint_properties(
        &self,
        _conn: &Connection,
        _footprint_id: i64,
        _properties: &[Property],
    ) -> Result<usize> {
        Ok(0)
    }
}

/// Inserts pin rows for a symbol. Shared by both variants.
pub fn insert_pins(conn: &Connection, prefix: &str, symbol_id: i64, pins: &[PinRow]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(&format!(
        "INSERT INTO {prefix}pins (symbol_rowid, number, name, electrical_type, is_alternate) \
         VALUES (?1, ?2, ?3, ?4, ?5)"
    ))?;

    for pin in pins {
        stmt.execute(params![
            symbol_id,
            pin.number,
            pin.name,
            pin.electrical_type,
            pin.is_alternate,
        ])?;
    }
    Ok(pins.len())
}

/// Inserts a footprint row and returns its row id. Shared by both variants.
pub fn insert_footprint(conn: &Connection, prefix: &str, footprint: &FootprintRow) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {prefix}footprints (name, library, description, tags, pads) \
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        params![
            footprint.name,
            footprint.library,
            footprint.description,
            footprint.tags,
            footprint.pads as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts key/value rows into a property table, skipping keys outside
/// the allow-list.
fn insert_properties(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
    properties: &[Property],
    allowlist: Option<&[String]>,
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(&format!(
        "INSERT INTO {table} ({owner_column}, key, value) VALUES (?1, ?2, ?3)"
    ))?;

    let mut inserted = 0;
    for property in properties {
        if !allows_property(allowlist, &property.key) {
            continue;
        }
        stmt.execute(params![owner_id, property.key, property.value])?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Emitter for the flattened variant.
#[derive(Debug, Clone)]
pub struct FlattenedEmitter {
    prefix: String,
    columns: ColumnMap,
}

impl FlattenedEmitter {
    pub fn new(prefix: impl Into<String>, columns: ColumnMap) -> Self {
        Self {
            prefix: prefix.into(),
            columns,
        }
    }
}

impl RowEmitter for FlattenedEmitter {
    fn variant(&self) -> SchemaVariant {
        SchemaVariant::Flattened
    }

    fn insert_symbol(&self, conn: &Connection, symbol: &SymbolRow) -> Result<i64> {
        let [reference, value, footprint, footprint_filter, datasheet, keywords, description] =
            self.columns.values(symbol);

        conn.execute(
            &format!(
                "INSERT INTO {}symbols (name, library, reference, value, footprint, \
                 footprint_filter, datasheet, keywords, description) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                self.prefix
            ),
            params![
                symbol.name,
                symbol.library,
                reference,
                value,
                footprint,
                footprint_filter,
                datasheet,
                keywords,
                description,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_pins(&self, conn: &Connection, symbol_id: i64, pins: &[PinRow]) -> Result<usize> {
        insert_pins(conn, &self.prefix, symbol_id, pins)
    }

    fn insert_footprint(&self, conn: &Connection, footprint: &FootprintRow) -> Result<i64> {
        insert_footprint(conn, &self.prefix, footprint)
    }
}

/// Emitter for the normalized variant.
#[derive(Debug, Clone)]
pub struct NormalizedEmitter {
    prefix: String,
    allowlist: Option<Vec<String>>,
}

impl NormalizedEmitter {
    /// `allowlist` of `None` keeps every property key.
    pub fn new(prefix: impl Into<String>, allowlist: Option<Vec<String>>) -> Self {
        Self {
            prefix: prefix.into(),
            allowlist,
        }
    }
}

impl RowEmitter for NormalizedEmitter {
    fn variant(&self) -> SchemaVariant {
        SchemaVariant::Normalized
    }

    fn insert_symbol(&self, conn: &Connection, symbol: &SymbolRow) -> Result<i64> {
        conn.execute(
            &format!(
                "INSERT INTO {}symbols (name, library) VALUES (?1, ?2)",
                self.prefix
            ),
            params![symbol.name, symbol.library],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_symbol_properties(
        &self,
        conn: &Connection,
        symbol_id: i64,
        properties: &[Property],
    ) -> Result<usize> {
        insert_properties(
            conn,
            &format!("{}properties", self.prefix),
            "symbol_rowid",
            symbol_id,
            properties,
            self.allowlist.as_deref(),
        )
    }

    fn insert_pins(&self, conn: &Connection, symbol_id: i64, pins: &[PinRow]) -> Result<usize> {
        insert_pins(conn, &self.prefix, symbol_id, pins)
    }

    fn insert_footprint(&self, conn: &Connection, footprint: &FootprintRow) -> Result<i64> {
        insert_footprint(conn, &self.prefix, footprint)
    }

    fn insert_footprint_properties(
        &self,
        conn: &Connection,
        footprint_id: i64,
        properties: &[Property],
    ) -> Result<usize> {
        insert_properties(
            conn,
            &format!("{}footprint_properties", self.prefix),
            "footprint_rowid",
            footprint_id,
            properties,
            self.allowlist.as_deref(),
        )
    }
}
