//! Bundling built R libraries for distribution.
//!
//! The inverse of extraction: once packages are installed under
//! `$SPARK_HOME/R/lib`, the whole library directory is zipped so it can be
//! shipped to cluster workers in one piece.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::BundleError;

/// Zip every built R library under `dir` into a fresh `<dir>/<name>` archive.
///
/// Regular files are collected recursively with entry names relative to
/// `dir`; `.zip` files are skipped so repeated bundling never nests earlier
/// output (or the archive currently being written). An existing archive of
/// the same name is replaced, never appended to.
pub fn zip_r_libraries(dir: &Path, name: &str) -> Result<PathBuf, BundleError> {
    let archive_path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&archive_path)?);
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "zip") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };

        zip.start_file(relative.to_string_lossy().into_owned(), options)?;
        let mut file = File::open(path)?;
        io::copy(&mut file, &mut zip)?;
    }

    zip.finish()?;
    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn populate(dir: &Path) {
        std::fs::create_dir_all(dir.join("sparklyr/R")).unwrap();
        std::fs::write(dir.join("sparklyr/DESCRIPTION"), "Package: sparklyr").unwrap();
        std::fs::write(dir.join("sparklyr/R/code.R"), "f <- function() 1\n").unwrap();
        std::fs::write(dir.join("stale.zip"), "earlier bundle").unwrap();
    }

    fn entry_names(archive_path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(archive_path).unwrap()).unwrap();
        archive.file_names().map(String::from).collect()
    }

    #[test]
    fn test_bundles_files_relative_to_dir() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let archive_path = zip_r_libraries(dir.path(), "rlibs.zip").unwrap();

        assert_eq!(archive_path, dir.path().join("rlibs.zip"));
        let names = entry_names(&archive_path);
        assert!(names.contains(&"sparklyr/DESCRIPTION".to_string()));
        assert!(names.contains(&"sparklyr/R/code.R".to_string()));
    }

    #[test]
    fn test_existing_zip_files_are_excluded() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let archive_path = zip_r_libraries(dir.path(), "rlibs.zip").unwrap();

        let names = entry_names(&archive_path);
        assert!(!names.iter().any(|n| n.ends_with(".zip")));
    }

    #[test]
    fn test_rebundling_replaces_the_archive() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        zip_r_libraries(dir.path(), "rlibs.zip").unwrap();
        std::fs::write(dir.path().join("sparklyr/NAMESPACE"), "export(f)\n").unwrap();
        let archive_path = zip_r_libraries(dir.path(), "rlibs.zip").unwrap();

        let names = entry_names(&archive_path);
        assert!(names.contains(&"sparklyr/NAMESPACE".to_string()));
        // Still exactly one entry per file on disk, not an appended mix.
        assert_eq!(names.len(), 3);
    }
}
