//! YAML configuration for library loads.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock behavior: flattened schema, no table prefix, the KiCad column
//! map, and no abort threshold.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! schema:
//!   variant: normalized
//!   prefix: ""
//! property_allowlist:
//!   - Reference
//!   - Value
//!   - MPN
//! required_symbol_properties:
//!   - Reference
//! suffixes:
//!   symbol_library: .kicad_sym
//!   footprint_library: .pretty
//!   footprint: .kicad_mod
//! failure:
//!   max_consecutive_failures: 25
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SymbolRow;
use crate::validate::MappingRules;

/// Errors raised while reading or writing a [`LoadConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Shape of the destination tables.
///
/// The two variants are alternative designs; a database holds one or the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// Symbol properties projected onto fixed columns of `symbols`.
    #[default]
    Flattened,
    /// Symbol and footprint properties stored as key/value rows.
    Normalized,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flattened => "flattened",
            Self::Normalized => "normalized",
        }
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flattened" => Ok(Self::Flattened),
            "normalized" => Ok(Self::Normalized),
            other => Err(format!("unknown schema variant: {other}")),
        }
    }
}

/// Schema selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub variant: SchemaVariant,
    /// Prefix prepended to every table name. Empty means bare names.
    pub prefix: String,
}

/// Property keys feeding the fixed columns of the flattened `symbols` table.
///
/// Columns whose key is absent from a symbol are stored as NULL. Keys not
/// named here are not stored by the flattened variant.
///
/// KiCad 6 and 7 store the symbol description under `ki_description`,
/// KiCad 8 under `Description`. The `description` key is tried first and
/// `description_fallback` second; set the fallback to `null` to disable it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub reference: String,
    pub value: String,
    pub footprint: String,
    pub footprint_filter: String,
    pub datasheet: String,
    pub keywords: String,
    pub description: String,
    pub description_fallback: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            reference: "Reference".to_string(),
            value: "Value".to_string(),
            footprint: "Footprint".to_string(),
            footprint_filter: "ki_fp_filters".to_string(),
            datasheet: "Datasheet".to_string(),
            keywords: "ki_keywords".to_string(),
            description: "ki_description".to_string(),
            description_fallback: Some("Description".to_string()),
        }
    }
}

impl ColumnMap {
    /// Returns `(column, property key)` pairs in table column order.
    ///
    /// # Examples
    ///
    /// ```
    /// use kicad_libdb_core::ColumnMap;
    ///
    /// let map = ColumnMap::default();
    /// assert_eq!(map.pairs()[0], ("reference", "Reference"));
    /// assert_eq!(map.pairs()[3], ("footprint_filter", "ki_fp_filters"));
    /// ```
    pub fn pairs(&self) -> [(&'static str, &str); 7] {
        [
            ("reference", self.reference.as_str()),
            ("value", self.value.as_str()),
            ("footprint", self.footprint.as_str()),
            ("footprint_filter", self.footprint_filter.as_str()),
            ("datasheet", self.datasheet.as_str()),
            ("keywords", self.keywords.as_str()),
            ("description", self.description.as_str()),
        ]
    }

    /// Resolves the column values of one symbol, in [`pairs`](Self::pairs)
    /// order.
    pub fn values<'a>(&self, symbol: &'a SymbolRow) -> [Option<&'a str>; 7] {
        let mut values = self.pairs().map(|(_, key)| symbol.property(key));
        if values[6].is_none() {
            values[6] = self
                .description_fallback
                .as_deref()
                .and_then(|key| symbol.property(key));
        }
        values
    }
}

/// File and directory suffixes used during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuffixConfig {
    /// Suffix of symbol library files.
    pub symbol_library: String,
    /// Suffix of footprint library directories.
    pub footprint_library: String,
    /// Suffix of footprint files inside a footprint library.
    pub footprint: String,
}

impl Default for SuffixConfig {
    fn default() -> Self {
        Self {
            symbol_library: ".kicad_sym".to_string(),
            footprint_library: ".pretty".to_string(),
            footprint: ".kicad_mod".to_string(),
        }
    }
}

/// When to give up on a run that keeps skipping records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    /// Abort after this many consecutive skipped items. `None` never aborts;
    /// zero is rejected by [`LoadConfig::validate`].
    pub max_consecutive_failures: Option<usize>,
}

/// Top-level load configuration.
///
/// # Examples
///
/// ```
/// use kicad_libdb_core::{LoadConfig, SchemaVariant};
///
/// let config: LoadConfig = serde_yaml::from_str("schema: { variant: normalized }").unwrap();
/// assert_eq!(config.schema.variant, SchemaVariant::Normalized);
/// assert_eq!(config.suffixes.symbol_library, ".kicad_sym");
/// assert!(config.property_allowlist.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Configuration format version.
    pub version: String,
    pub schema: SchemaConfig,
    /// Column map for the flattened variant.
    pub columns: ColumnMap,
    /// Property keys kept by the normalized variant. `None` keeps every key.
    pub property_allowlist: Option<Vec<String>>,
    /// Property keys every symbol must carry to be loaded.
    pub required_symbol_properties: Vec<String>,
    pub suffixes: SuffixConfig,
    pub failure: FailureConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            schema: SchemaConfig::default(),
            columns: ColumnMap::default(),
            property_allowlist: None,
            required_symbol_properties: Vec::new(),
            suffixes: SuffixConfig::default(),
            failure: FailureConfig::default(),
        }
    }
}

impl LoadConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read,
    /// [`ConfigError::YamlError`] if parsing fails, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be honored.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure.max_consecutive_failures == Some(0) {
            return Err(ConfigError::Invalid(
                "failure.max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns the record requirements derived from this configuration.
    pub fn mapping_rules(&self) -> MappingRules {
        MappingRules {
            required_symbol_properties: self.required_symbol_properties.clone(),
        }
    }
}

/// Returns `true` if `key` passes `allowlist`; `None` allows every key.
pub fn allows_property(allowlist: Option<&[String]>, key: &str) -> bool {
    allowlist.is_none_or(|allowed| allowed.iter().any(|k| k == key))
}
