//! Reader for `.kicad_mod` footprint files.
//!
//! Accepts both the current `(footprint ...)` root and the legacy
//! `(module ...)` root. Legacy files carry reference and value as
//! `(fp_text reference ...)` / `(fp_text value ...)`; those are surfaced as
//! `Reference` / `Value` properties when no property of that name exists.

use std::path::Path;

use kicad_libdb_core::{FootprintRecord, PadNumber, PadRecord, Property};

use crate::error::LibraryParseError;
use crate::sexp::{SExp, parse_sexp};
use crate::symbols::parse_properties;

/// Reads and parses one footprint file.
pub fn read_footprint(path: &Path) -> Result<FootprintRecord, LibraryParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_footprint(&content)
}

/// Parses footprint text.
pub fn parse_footprint(content: &str) -> Result<FootprintRecord, LibraryParseError> {
    let root = parse_sexp(content)?;

    match root.head() {
        Some("footprint") | Some("module") => {}
        Some(other) => {
            return Err(LibraryParseError::InvalidFormat(format!(
                "expected footprint, found {other}"
            )));
        }
        None => {
            return Err(LibraryParseError::InvalidFormat(
                "expected footprint root list".to_string(),
            ));
        }
    }

    let mut properties = parse_properties(&root);
    for text in root.find_all("fp_text") {
        let key = match text.arg(1) {
            Some("reference") => "Reference",
            Some("value") => "Value",
            _ => continue,
        };
        if properties.iter().any(|p| p.key == key) {
            continue;
        }
        if let Some(value) = text.arg(2) {
            properties.push(Property::new(key, value));
        }
    }

    Ok(FootprintRecord {
        name: root.arg(1).unwrap_or_default().to_string(),
        description: root.value_of("descr").map(str::to_string),
        tags: root.value_of("tags").map(str::to_string),
        properties,
        pads: root.find_all("pad").map(parse_pad).collect(),
    })
}

fn parse_pad(expr: &SExp) -> PadRecord {
    PadRecord {
        number: pad_number(expr.item(1)),
        pad_type: expr.arg(2).unwrap_or_default().to_string(),
    }
}

/// Bare integer atoms are integer labels; everything else is text.
fn pad_number(label: Option<&SExp>) -> PadNumber {
    match label {
        Some(SExp::Atom(s)) => s
            .parse::<i64>()
            .map(PadNumber::Integer)
            .unwrap_or_else(|_| PadNumber::Text(s.clone())),
        Some(SExp::Quoted(s)) => PadNumber::Text(s.clone()),
        Some(SExp::List(_)) | None => PadNumber::Text(String::new()),
    }
}
