//! Discovery of library inputs under search roots.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kicad_libdb_core::SuffixConfig;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::DiscoverError;

/// Libraries found under a set of search roots, sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredLibraries {
    /// Symbol library files.
    pub symbol_libraries: Vec<PathBuf>,
    /// Footprint library directories.
    pub footprint_libraries: Vec<PathBuf>,
}

impl DiscoveredLibraries {
    /// Total number of libraries (files plus directories).
    pub fn total(&self) -> usize {
        self.symbol_libraries.len() + self.footprint_libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

fn name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(suffix))
}

/// Recursively walks every root and collects symbol library files and
/// footprint library directories by suffix.
///
/// The walk does not enter a footprint library directory. Anything nested
/// inside one, including another footprint library, belongs to it and is
/// read by [`footprint_files`].
///
/// # Errors
///
/// Fails with [`DiscoverError::NoRoots`] for an empty root list,
/// [`DiscoverError::InvalidRoot`] for a root that is not a directory,
/// [`DiscoverError::Walk`] for an unreadable directory, and
/// [`DiscoverError::NothingFound`] when no library matches.
pub fn discover_libraries(
    roots: &[PathBuf],
    suffixes: &SuffixConfig,
) -> Result<DiscoveredLibraries, DiscoverError> {
    if roots.is_empty() {
        return Err(DiscoverError::NoRoots);
    }

    let mut symbol_libraries = BTreeSet::new();
    let mut footprint_libraries = BTreeSet::new();

    for root in roots {
        if !root.is_dir() {
            return Err(DiscoverError::InvalidRoot(root.clone()));
        }

        let mut walker = WalkDir::new(root).follow_links(false).into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && name_ends_with(path, &suffixes.symbol_library) {
                debug!(path = %path.display(), "Found symbol library");
                symbol_libraries.insert(path.to_path_buf());
            } else if path.is_dir() && name_ends_with(path, &suffixes.footprint_library) {
                debug!(path = %path.display(), "Found footprint library");
                footprint_libraries.insert(path.to_path_buf());
                walker.skip_current_dir();
            }
        }
    }

    let discovered = DiscoveredLibraries {
        symbol_libraries: symbol_libraries.into_iter().collect(),
        footprint_libraries: footprint_libraries.into_iter().collect(),
    };

    if discovered.is_empty() {
        let searched = roots
            .iter()
            .map(|r| r.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(DiscoverError::NothingFound(searched));
    }

    info!(
        symbol_libraries = discovered.symbol_libraries.len(),
        footprint_libraries = discovered.footprint_libraries.len(),
        "Discovered libraries"
    );
    Ok(discovered)
}

/// Lists the footprint files inside a footprint library directory,
/// recursively and sorted.
pub fn footprint_files(library_dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, DiscoverError> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(library_dir).follow_links(false) {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && name_ends_with(path, suffix) {
            files.insert(path.to_path_buf());
        }
    }
    Ok(files.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "(kicad_symbol_lib)").unwrap();
    }

    #[test]
    fn test_discovers_nested_libraries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("symbols/Device.kicad_sym"));
        touch(&root.join("symbols/deep/er/LED.kicad_sym"));
        touch(&root.join("symbols/README.md"));
        touch(&root.join("footprints/Resistor_SMD.pretty/R_0603.kicad_mod"));
        fs::create_dir_all(root.join("footprints/Empty.pretty")).unwrap();

        let found = discover_libraries(&[root.to_path_buf()], &SuffixConfig::default()).unwrap();
        assert_eq!(
            found.symbol_libraries,
            vec![root.join("symbols/Device.kicad_sym"), root.join("symbols/deep/er/LED.kicad_sym")]
        );
        assert_eq!(found.footprint_libraries.len(), 2);
        assert_eq!(found.total(), 4);
    }

    #[test]
    fn test_nested_footprint_library_belongs_to_outer() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("Outer.pretty");
        touch(&outer.join("A.kicad_mod"));
        touch(&outer.join("Inner.pretty/B.kicad_mod"));

        let found = discover_libraries(&[dir.path().to_path_buf()], &SuffixConfig::default()).unwrap();
        assert_eq!(found.footprint_libraries, vec![outer.clone()]);

        let files = footprint_files(&outer, ".kicad_mod").unwrap();
        assert_eq!(files, vec![outer.join("A.kicad_mod"), outer.join("Inner.pretty/B.kicad_mod")]);
    }

    #[test]
    fn test_overlapping_roots_deduplicate() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/Device.kicad_sym"));

        let roots = vec![dir.path().to_path_buf(), dir.path().join("a")];
        let found = discover_libraries(&roots, &SuffixConfig::default()).unwrap();
        assert_eq!(found.symbol_libraries.len(), 1);
    }

    #[test]
    fn test_directory_named_like_symbol_library_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("odd.kicad_sym")).unwrap();
        touch(&dir.path().join("real.kicad_sym"));

        let found = discover_libraries(&[dir.path().to_path_buf()], &SuffixConfig::default()).unwrap();
        assert_eq!(found.symbol_libraries, vec![dir.path().join("real.kicad_sym")]);
    }

    #[test]
    fn test_no_roots() {
        assert!(matches!(
            discover_libraries(&[], &SuffixConfig::default()),
            Err(DiscoverError::NoRoots)
        ));
    }

    #[test]
    fn test_missing_root() {
        let err = discover_libraries(&[PathBuf::from("/does/not/exist")], &SuffixConfig::default())
            .unwrap_err();
        assert!(matches!(err, DiscoverError::InvalidRoot(_)));
        assert!(err.to_string().contains("/does/not/exist"));
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("notes.txt"));
        let err = discover_libraries(&[dir.path().to_path_buf()], &SuffixConfig::default()).unwrap_err();
        assert!(matches!(err, DiscoverError::NothingFound(_)));
    }

    #[test]
    fn test_footprint_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("Lib.pretty");
        touch(&lib.join("b.kicad_mod"));
        touch(&lib.join("a.kicad_mod"));
        touch(&lib.join("a.kicad_mod.bak"));

        let files = footprint_files(&lib, ".kicad_mod").unwrap();
        assert_eq!(files, vec![lib.join("a.kicad_mod"), lib.join("b.kicad_mod")]);
    }

    #[test]
    fn test_custom_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Custom.sym"));
        let suffixes = SuffixConfig {
            symbol_library: ".sym".to_string(),
            ..SuffixConfig::default()
        };
        let found = discover_libraries(&[dir.path().to_path_buf()], &suffixes).unwrap();
        assert_eq!(found.symbol_libraries.len(), 1);
    }
}
