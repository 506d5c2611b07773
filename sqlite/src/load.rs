//! Batch loading of discovered libraries.
//!
//! Each symbol library file and each footprint library directory is loaded
//! inside its own transaction. A file that cannot be parsed, or a part that
//! fails validation, is recorded as a [`SkippedItem`] and the load carries
//! on; database errors abort the current transaction and the run.

use std::path::{Path, PathBuf};

use kicad_libdb_core::{
    ColumnMap, FailureConfig, LibraryKind, LoadConfig, MappingRules, SchemaVariant, SuffixConfig,
    flatten_footprint, flatten_symbol, library_name_from_path,
};
use kicad_libdb_discovery::{footprint_files, read_footprint, read_symbol_library};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::convert::{FlattenedEmitter, NormalizedEmitter, RowEmitter};
use crate::error::{Result, SqliteError};

/// When to abort a run that keeps skipping items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailurePolicy {
    /// Abort after this many consecutive skips. `None` never aborts.
    ///
    /// `Some(0)` aborts on the first skip, like `Some(1)`. Configuration
    /// files and the CLI reject zero.
    pub max_consecutive_failures: Option<usize>,
}

impl From<&FailureConfig> for FailurePolicy {
    fn from(config: &FailureConfig) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

/// Everything a load needs besides the schema itself.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Column map of the flattened variant.
    pub columns: ColumnMap,
    /// Property keys stored by the normalized variant. `None` keeps all.
    pub property_allowlist: Option<Vec<String>>,
    pub rules: MappingRules,
    pub suffixes: SuffixConfig,
    pub failure: FailurePolicy,
}

impl LoadOptions {
    pub fn from_config(config: &LoadConfig) -> Self {
        Self {
            columns: config.columns.clone(),
            property_allowlist: config.property_allowlist.clone(),
            rules: config.mapping_rules(),
            suffixes: config.suffixes.clone(),
            failure: FailurePolicy::from(&config.failure),
        }
    }

    /// Builds the row emitter for `variant`.
    pub fn emitter(&self, variant: SchemaVariant, prefix: &str) -> Box<dyn RowEmitter> {
        match variant {
            SchemaVariant::Flattened => Box::new(FlattenedEmitter::new(prefix, self.columns.clone())),
            SchemaVariant::Normalized => {
                Box::new(NormalizedEmitter::new(prefix, self.property_allowlist.clone()))
            }
        }
    }
}

/// A file or part that was not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub path: PathBuf,
    /// Part name, or `None` when the whole file was skipped.
    pub part: Option<String>,
    pub reason: String,
}

/// Per-library outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryReport {
    pub path: PathBuf,
    pub library: String,
    pub kind: LibraryKind,
    /// Parts inserted.
    pub inserted: usize,
    /// Files or parts skipped.
    pub skipped: usize,
}

impl LibraryReport {
    fn new(path: &Path, library: &str, kind: LibraryKind) -> Self {
        Self {
            path: path.to_path_buf(),
            library: library.to_string(),
            kind,
            inserted: 0,
            skipped: 0,
        }
    }
}

/// Report of a completed load.
///
/// Returned by [`Migration::load`](crate::Migration::load) and
/// [`Migration::refresh`](crate::Migration::refresh).
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub variant: SchemaVariant,
    pub libraries: Vec<LibraryReport>,
    pub symbols_inserted: usize,
    pub pins_inserted: usize,
    /// Key/value property rows; always zero for the flattened variant.
    pub properties_inserted: usize,
    pub footprints_inserted: usize,
    pub skipped: Vec<SkippedItem>,
    /// Timestamp stored in the `load_runs` row.
    pub created_at: Option<String>,
}

impl LoadReport {
    pub(crate) fn new(variant: SchemaVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    fn skip(&mut self, path: &Path, part: Option<&str>, reason: String) {
        self.skipped.push(SkippedItem {
            path: path.to_path_buf(),
            part: part.map(str::to_string),
            reason,
        });
    }
}

/// Counts consecutive skips against a [`FailurePolicy`].
#[derive(Debug)]
pub(crate) struct FailureTracker {
    policy: FailurePolicy,
    consecutive: usize,
}

impl FailureTracker {
    pub(crate) fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            consecutive: 0,
        }
    }

    fn success(&mut self) {
        self.consecutive = 0;
    }

    fn failure(&mut self, item: &str) -> Result<()> {
        self.consecutive += 1;
        match self.policy.max_consecutive_failures {
            Some(max) if self.consecutive >= max => Err(SqliteError::TooManyFailures {
                count: self.consecutive,
                last: item.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Loads every symbol of one library file in a single transaction.
pub(crate) fn load_symbol_library(
    conn: &mut Connection,
    path: &Path,
    emitter: &dyn RowEmitter,
    options: &LoadOptions,
    report: &mut LoadReport,
    failures: &mut FailureTracker,
) -> Result<()> {
    let library = library_name_from_path(path);
    let mut entry = LibraryReport::new(path, &library, LibraryKind::Symbol);

    let parsed = match read_symbol_library(path) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Skipping unreadable symbol library");
            entry.skipped += 1;
            report.skip(path, None, err.to_string());
            report.libraries.push(entry);
            return failures.failure(&path.display().to_string());
        }
    };

    let tx = conn.transaction()?;
    for symbol in &parsed.symbols {
        let flat = match flatten_symbol(symbol, &library, &options.rules) {
            Ok(flat) => flat,
            Err(err) => {
                warn!(path = %path.display(), symbol = %symbol.name, error = %err, "Skipping symbol");
                entry.skipped += 1;
                report.skip(path, Some(&symbol.name), err.to_string());
                failures.failure(&symbol.name)?;
                continue;
            }
        };

        let symbol_id = emitter.insert_symbol(&tx, &flat.symbol)?;
        let properties = emitter.insert_symbol_properties(&tx, symbol_id, &flat.symbol.properties)?;
        let pins = emitter.insert_pins(&tx, symbol_id, &flat.pins)?;
        debug!(symbol = %flat.symbol.name, symbol_id, pins, properties, "Inserted symbol");

        report.symbols_inserted += 1;
        report.pins_inserted += pins;
        report.properties_inserted += properties;
        entry.inserted += 1;
        failures.success();
    }
    tx.commit()?;

    info!(
        path = %path.display(),
        library = %library,
        inserted = entry.inserted,
        skipped = entry.skipped,
        "Loaded symbol library"
    );
    report.libraries.push(entry);
    Ok(())
}

/// Loads every footprint of one library directory in a single transaction.
pub(crate) fn load_footprint_library(
    conn: &mut Connection,
    dir: &Path,
    emitter: &dyn RowEmitter,
    options: &LoadOptions,
    report: &mut LoadReport,
    failures: &mut FailureTracker,
) -> Result<()> {
    let library = library_name_from_path(dir);
    let mut entry = LibraryReport::new(dir, &library, LibraryKind::Footprint);
    let files = footprint_files(dir, &options.suffixes.footprint)?;

    let tx = conn.transaction()?;
    for file in &files {
        let footprint = match read_footprint(file) {
            Ok(footprint) => footprint,
            Err(err) => {
                warn!(path = %file.display(), error = %err, "Skipping unreadable footprint");
                entry.skipped += 1;
                report.skip(file, None, err.to_string());
                failures.failure(&file.display().to_string())?;
                continue;
            }
        };

        let row = match flatten_footprint(&footprint, &library) {
            Ok(row) => row,
            Err(err) => {
                warn!(path = %file.display(), error = %err, "Skipping footprint");
                entry.skipped += 1;
                report.skip(file, Some(&footprint.name), err.to_string());
                failures.failure(&file.display().to_string())?;
                continue;
            }
        };

        let footprint_id = emitter.insert_footprint(&tx, &row)?;
        let properties = emitter.insert_footprint_properties(&tx, footprint_id, &row.properties)?;
        debug!(footprint = %row.name, footprint_id, pads = row.pads, "Inserted footprint");

        report.footprints_inserted += 1;
        report.properties_inserted += properties;
        entry.inserted += 1;
        failures.success();
    }
    tx.commit()?;

    info!(
        path = %dir.display(),
        library = %library,
        inserted = entry.inserted,
        skipped = entry.skipped,
        "Loaded footprint library"
    );
    report.libraries.push(entry);
    Ok(())
}

/// Writes the `load_runs` row that marks a load as complete.
pub(crate) fn record_run(conn: &Connection, prefix: &str, report: &mut LoadReport) -> Result<()> {
    let created_at = chrono::Utc::now().to_rfc3339();
    conn.execute(
        &format!(
            "INSERT INTO {prefix}load_runs (created_at, variant, symbol_count, footprint_count, skipped_count) \
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        rusqlite::params![
            created_at,
            report.variant.as_str(),
            report.symbols_inserted as i64,
            report.footprints_inserted as i64,
            report.skipped.len() as i64,
        ],
    )?;
    report.created_at = Some(created_at);
    Ok(())
}
