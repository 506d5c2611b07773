//! Discovery and reading of KiCad library files.
//!
//! This crate locates symbol and footprint libraries under search roots and
//! reads them into the record types of [`kicad_libdb_core`]:
//!
//! - [`discover_libraries`]: recursive suffix matching under roots.
//! - [`read_symbol_library`]: parse a `.kicad_sym` file.
//! - [`read_footprint`]: parse a `.kicad_mod` file.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use kicad_libdb_discovery::parse_symbol_library;
//!
//! let text = r#"(kicad_symbol_lib (version 20231120)
//!   (symbol "R" (property "Reference" "R")
//!     (symbol "R_1_1"
//!       (pin passive line (name "~") (number "1"))
//!       (pin passive line (name "~") (number "2")))))"#;
//!
//! let lib = parse_symbol_library(text, Path::new("Device.kicad_sym")).unwrap();
//! assert_eq!(lib.symbols[0].name, "R");
//! assert_eq!(lib.symbols[0].units[0].pins.len(), 2);
//! ```

pub mod discover;
pub mod error;
pub mod footprints;
pub mod sexp;
pub mod symbols;

pub use discover::{DiscoveredLibraries, discover_libraries, footprint_files};
pub use error::{DiscoverError, LibraryParseError};
pub use footprints::{parse_footprint, read_footprint};
pub use symbols::{parse_symbol_library, read_symbol_library};
