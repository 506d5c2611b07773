//! Core library records and the row-flattening pipeline.
//!
//! This crate defines the in-memory shape of KiCad symbol and footprint
//! libraries and the pure transformation that turns them into relational
//! rows:
//!
//! - [`SymbolRecord`]: a symbol with properties, pins and nested units.
//! - [`PinRecord`]: a pin with optional alternate functions.
//! - [`FootprintRecord`]: a footprint with properties and pads.
//! - [`flatten_symbol`] / [`flatten_footprint`]: validate a record and
//!   produce the rows a storage backend inserts.
//! - [`LoadConfig`]: YAML configuration shared by discovery and storage.
//!
//! # Example
//!
//! ```
//! use kicad_libdb_core::*;
//!
//! let symbol = SymbolRecord::new("LED_RGB")
//!     .with_property("Reference", "D")
//!     .with_unit(
//!         SymbolRecord::new("LED_RGB_1_1")
//!             .with_pin(PinRecord::new("1", "R", "passive").with_alternate("A", "passive"))
//!             .with_pin(PinRecord::new("4", "GND", "passive")),
//!     );
//!
//! let flat = flatten_symbol(&symbol, "LED", &MappingRules::default()).unwrap();
//! assert_eq!(flat.symbol.name, "LED_RGB");
//! assert_eq!(flat.pins.len(), 3);
//! assert_eq!(flat.pins.iter().filter(|p| p.is_alternate).count(), 1);
//! ```

mod config;
mod flatten;
mod types;
mod validate;

pub use config::{
    ColumnMap, ConfigError, FailureConfig, LoadConfig, SchemaConfig, SchemaVariant, SuffixConfig,
    allows_property,
};
pub use flatten::{
    collect_pins, count_numbered_pads, expand_alternates, flatten_footprint, flatten_symbol,
    library_name_from_path, pin_rows,
};
pub use types::*;
pub use validate::{MappingError, MappingRules, validate_footprint, validate_symbol};
