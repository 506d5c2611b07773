//! Record validation ahead of flattening.
//!
//! A record that fails validation is not fit to become a row. The pipeline
//! reports the first [`MappingError`] for the record and the caller skips
//! it; other records in the same library are unaffected.
//!
//! # Examples
//!
//! ```
//! use kicad_libdb_core::*;
//!
//! let rules = MappingRules::requiring(&["Reference"]);
//!
//! let ok = SymbolRecord::new("R").with_property("Reference", "R");
//! assert!(validate_symbol(&ok, &rules).is_empty());
//!
//! let missing = SymbolRecord::new("R");
//! assert_eq!(
//!     validate_symbol(&missing, &rules),
//!     vec![MappingError::MissingProperty {
//!         part: "R".into(),
//!         key: "Reference".into(),
//!     }]
//! );
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{FootprintRecord, LibraryKind, SymbolRecord};

/// Reasons a single record cannot be mapped onto rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The part name is empty or whitespace-only.
    #[error("{0} has an empty name")]
    EmptyName(LibraryKind),
    /// A property listed in [`MappingRules::required_symbol_properties`]
    /// is absent.
    #[error("{part}: missing required property '{key}'")]
    MissingProperty { part: String, key: String },
}

/// Requirements a record must meet before it is flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRules {
    /// Property keys every top-level symbol must carry.
    pub required_symbol_properties: Vec<String>,
}

impl MappingRules {
    pub fn requiring(keys: &[&str]) -> Self {
        Self {
            required_symbol_properties: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Validates a top-level symbol against the mapping rules.
///
/// Only the symbol itself is checked for required properties; units do not
/// carry properties in KiCad libraries.
pub fn validate_symbol(symbol: &SymbolRecord, rules: &MappingRules) -> Vec<MappingError> {
    let mut errors = Vec::new();

    if symbol.name.trim().is_empty() {
        errors.push(MappingError::EmptyName(LibraryKind::Symbol));
        return errors;
    }

    for key in &rules.required_symbol_properties {
        if symbol.property(key).is_none() {
            errors.push(MappingError::MissingProperty {
                part: symbol.name.clone(),
                key: key.clone(),
            });
        }
    }

    errors
}

/// Validates a footprint record.
pub fn validate_footprint(footprint: &FootprintRecord) -> Vec<MappingError> {
    if footprint.name.trim().is_empty() {
        return vec![MappingError::EmptyName(LibraryKind::Footprint)];
    }
    Vec::new()
}
