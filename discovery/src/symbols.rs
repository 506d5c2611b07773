//! Reader for `.kicad_sym` symbol libraries.
//!
//! Only the parts of the format the load pipeline needs are read: symbol
//! names, `extends`, properties, nested unit symbols, and pins with their
//! alternates. Graphics, effects and positions are ignored.
//!
//! ```text
//! (kicad_symbol_lib (version 20231120) (generator "kicad_symbol_editor")
//!   (symbol "LED_RGB"
//!     (property "Reference" "D" (at 0 0 0) (effects ...))
//!     (symbol "LED_RGB_1_1"
//!       (pin passive line (at ...) (length 2.54)
//!         (name "R" (effects ...))
//!         (number "1" (effects ...))
//!         (alternate "A" passive line)))))
//! ```

use std::path::Path;

use kicad_libdb_core::{PinRecord, Property, SymbolLibrary, SymbolRecord};
use tracing::debug;

use crate::error::LibraryParseError;
use crate::sexp::{SExp, parse_sexp};

const ROOT_TAG: &str = "kicad_symbol_lib";

/// Reads and parses a symbol library file.
pub fn read_symbol_library(path: &Path) -> Result<SymbolLibrary, LibraryParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_symbol_library(&content, path)
}

/// Parses symbol library text. `path` is recorded on the result and is the
/// only source of the library name.
pub fn parse_symbol_library(content: &str, path: &Path) -> Result<SymbolLibrary, LibraryParseError> {
    let root = parse_sexp(content)?;

    match root.head() {
        Some(ROOT_TAG) => {}
        Some(other) => {
            return Err(LibraryParseError::InvalidFormat(format!(
                "expected {ROOT_TAG}, found {other}"
            )));
        }
        None => {
            return Err(LibraryParseError::InvalidFormat(format!(
                "expected {ROOT_TAG} root list"
            )));
        }
    }

    let symbols: Vec<SymbolRecord> = root.find_all("symbol").map(parse_symbol).collect();
    debug!(path = %path.display(), symbols = symbols.len(), "Parsed symbol library");

    Ok(SymbolLibrary {
        path: path.to_path_buf(),
        version: root.value_of("version").map(str::to_string),
        symbols,
    })
}

fn parse_symbol(expr: &SExp) -> SymbolRecord {
    SymbolRecord {
        name: expr.arg(1).unwrap_or_default().to_string(),
        extends: expr.value_of("extends").map(str::to_string),
        properties: parse_properties(expr),
        pins: expr.find_all("pin").map(parse_pin).collect(),
        units: expr.find_all("symbol").map(parse_symbol).collect(),
    }
}

/// Collects `(property "Key" "Value" ...)` children in order.
pub(crate) fn parse_properties(expr: &SExp) -> Vec<Property> {
    expr.find_all("property")
        .filter_map(|prop| Some(Property::new(prop.arg(1)?, prop.arg(2).unwrap_or_default())))
        .collect()
}

fn parse_pin(expr: &SExp) -> PinRecord {
    let mut pin = PinRecord::new(
        expr.value_of("number").unwrap_or_default(),
        expr.value_of("name").unwrap_or_default(),
        expr.arg(1).unwrap_or("unspecified"),
    );
    for alternate in expr.find_all("alternate") {
        pin = pin.with_alternate(
            alternate.arg(1).unwrap_or_default(),
            alternate.arg(2).unwrap_or("unspecified"),
        );
    }
    pin
}
