//! Error types for library discovery and reading.

use std::path::PathBuf;

use thiserror::Error;

use crate::sexp::ParseError;

/// Failure to turn one library file into records.
///
/// These are recoverable during a load: the file is skipped and the run
/// moves on.
#[derive(Debug, Error)]
pub enum LibraryParseError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not well-formed S-expression text.
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// The file parsed but is not the expected kind of library.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Failure to locate input libraries. Always fatal for a load.
#[derive(Debug, Error)]
pub enum DiscoverError {
    /// Walking a search root failed (unreadable directory, broken entry).
    #[error("failed to walk search root: {0}")]
    Walk(#[from] walkdir::Error),

    /// A search root does not exist or is not a directory.
    #[error("search root '{}' is not a directory", .0.display())]
    InvalidRoot(PathBuf),

    /// No search roots were supplied.
    #[error("no search roots were provided")]
    NoRoots,

    /// The roots were walked but contained no libraries.
    #[error("no symbol or footprint libraries found under {0}")]
    NothingFound(String),
}
