//! Library record and relational row definitions.
//!
//! Two families of types live here. The *record* types ([`SymbolRecord`],
//! [`PinRecord`], [`FootprintRecord`], ...) mirror the hierarchy read out of
//! a KiCad library file. The *row* types ([`SymbolRow`], [`PinRow`],
//! [`FootprintRow`]) are the flat shapes produced by the
//! [`flatten`](crate::flatten) pipeline and consumed by a storage backend.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of library a part was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    /// A `.kicad_sym` file of schematic symbols.
    Symbol,
    /// A `.pretty` directory of footprint files.
    Footprint,
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol => write!(f, "symbol"),
            Self::Footprint => write!(f, "footprint"),
        }
    }
}

/// A key/value property attached to a symbol or footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Looks up the first property with the given key.
pub(crate) fn find_property<'a>(properties: &'a [Property], key: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.value.as_str())
}

/// An alternate function declared on a pin.
///
/// Alternates share the physical location (and therefore the number) of
/// the pin that declares them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternatePin {
    pub name: String,
    pub electrical_type: String,
}

/// A pin as declared inside a symbol or one of its units.
///
/// # Examples
///
/// ```
/// use kicad_libdb_core::PinRecord;
///
/// let pin = PinRecord::new("1", "R", "passive").with_alternate("A", "passive");
/// assert_eq!(pin.alternates.len(), 1);
/// assert_eq!(pin.alternates[0].name, "A");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    /// Pin number as written in the library (not necessarily numeric).
    pub number: String,
    pub name: String,
    /// KiCad electrical type (`passive`, `power_in`, ...).
    pub electrical_type: String,
    pub alternates: Vec<AlternatePin>,
}

impl PinRecord {
    pub fn new(number: &str, name: &str, electrical_type: &str) -> Self {
        Self {
            number: number.to_string(),
            name: name.to_string(),
            electrical_type: electrical_type.to_string(),
            alternates: Vec::new(),
        }
    }

    /// Adds an alternate function to the pin.
    pub fn with_alternate(mut self, name: &str, electrical_type: &str) -> Self {
        self.alternates.push(AlternatePin {
            name: name.to_string(),
            electrical_type: electrical_type.to_string(),
        });
        self
    }
}

/// A schematic symbol, or one of its units.
///
/// Units are stored as nested `SymbolRecord`s and may themselves contain
/// units. Only the top-level symbol normally carries properties.
///
/// # Examples
///
/// ```
/// use kicad_libdb_core::{PinRecord, SymbolRecord};
///
/// let symbol = SymbolRecord::new("R")
///     .with_property("Reference", "R")
///     .with_unit(
///         SymbolRecord::new("R_1_1")
///             .with_pin(PinRecord::new("1", "~", "passive"))
///             .with_pin(PinRecord::new("2", "~", "passive")),
///     );
/// assert_eq!(symbol.property("Reference"), Some("R"));
/// assert!(symbol.pins.is_empty());
/// assert_eq!(symbol.units[0].pins.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    /// Name of the symbol this one derives from, if any.
    ///
    /// Inherited pins are *not* resolved; a derived symbol only reports the
    /// pins it declares itself.
    pub extends: Option<String>,
    /// Properties in file order.
    pub properties: Vec<Property>,
    /// Pins declared directly on this symbol.
    pub pins: Vec<PinRecord>,
    /// Nested units, in declared order.
    pub units: Vec<SymbolRecord>,
}

impl SymbolRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.push(Property::new(key, value));
        self
    }

    pub fn with_pin(mut self, pin: PinRecord) -> Self {
        self.pins.push(pin);
        self
    }

    pub fn with_unit(mut self, unit: SymbolRecord) -> Self {
        self.units.push(unit);
        self
    }

    /// Returns the value of the first property with the given key.
    pub fn property(&self, key: &str) -> Option<&str> {
        find_property(&self.properties, key)
    }
}

/// A parsed `.kicad_sym` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLibrary {
    /// Path the library was read from. The library name is derived from it.
    pub path: PathBuf,
    /// Format version stamped in the file, when present.
    pub version: Option<String>,
    pub symbols: Vec<SymbolRecord>,
}

/// Label of a footprint pad.
///
/// Bare integer atoms (`(pad 1 ...)`) become [`PadNumber::Integer`];
/// quoted or non-numeric labels become [`PadNumber::Text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadNumber {
    Integer(i64),
    Text(String),
}

impl PadNumber {
    /// Returns `true` if the pad is an electrically numbered pad.
    ///
    /// Unnumbered mechanical pads (empty label) and non-positive integer
    /// labels do not count.
    ///
    /// # Examples
    ///
    /// ```
    /// use kicad_libdb_core::PadNumber;
    ///
    /// assert!(PadNumber::Integer(3).is_numbered());
    /// assert!(PadNumber::Text("EP".into()).is_numbered());
    /// assert!(!PadNumber::Text("  ".into()).is_numbered());
    /// assert!(!PadNumber::Integer(0).is_numbered());
    /// ```
    pub fn is_numbered(&self) -> bool {
        match self {
            Self::Integer(n) => *n > 0,
            Self::Text(s) => !s.trim().is_empty(),
        }
    }
}

/// A footprint pad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadRecord {
    pub number: PadNumber,
    /// Pad type (`smd`, `thru_hole`, `np_thru_hole`, `connect`).
    pub pad_type: String,
}

impl PadRecord {
    pub fn new(number: PadNumber, pad_type: &str) -> Self {
        Self {
            number,
            pad_type: pad_type.to_string(),
        }
    }
}

/// A parsed `.kicad_mod` footprint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FootprintRecord {
    pub name: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub properties: Vec<Property>,
    pub pads: Vec<PadRecord>,
}

impl FootprintRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_pad(mut self, pad: PadRecord) -> Self {
        self.pads.push(pad);
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.push(Property::new(key, value));
        self
    }
}

/// Flattened symbol row, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRow {
    pub name: String,
    pub library: String,
    /// All properties of the symbol, verbatim and in file order. Storage
    /// adapters decide which of them are persisted.
    pub properties: Vec<Property>,
}

impl SymbolRow {
    pub fn property(&self, key: &str) -> Option<&str> {
        find_property(&self.properties, key)
    }
}

/// Flattened pin row. Base pins and alternates share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinRow {
    pub number: String,
    pub name: String,
    pub electrical_type: String,
    pub is_alternate: bool,
}

/// Flattened footprint row with its derived pad count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintRow {
    pub name: String,
    pub library: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub pads: usize,
    pub properties: Vec<Property>,
}

impl FootprintRow {
    pub fn property(&self, key: &str) -> Option<&str> {
        find_property(&self.properties, key)
    }
}

/// Output of [`flatten_symbol`](crate::flatten_symbol): one parent row and
/// the pin rows that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatSymbol {
    pub symbol: SymbolRow,
    pub pins: Vec<PinRow>,
}
