//! Selective extraction of bundled R sources.
//!
//! R package sources ship inside a jar under an entry path containing
//! `R/pkg`. Extraction copies exactly those entries into a fresh scratch
//! directory, preserving the path from the marker onward, so the result can
//! be handed to `R CMD INSTALL` as-is.

use std::io;
use std::io::{Read, Seek};
use std::path::{Component, Path};

use tempfile::TempDir;
use zip::ZipArchive;

use crate::error::BundleError;
use crate::output::Sink;

/// Entry-path marker for R package sources inside a jar.
pub const R_PKG_DIR: &str = "R/pkg";

/// Extract every `R/pkg` entry of the jar into a fresh scratch directory.
///
/// Directory entries are recreated, file entries are copied byte-for-byte
/// with parents created as needed. When verbose, one progress line per
/// created directory or copied file goes to the sink.
///
/// Returns the scratch directory; it is removed when the returned handle is
/// dropped or closed, including on the error path of a failed copy.
pub fn extract_r_source<R: Read + Seek>(
    jar: &mut ZipArchive<R>,
    sink: &Sink,
    verbose: bool,
) -> Result<TempDir, BundleError> {
    let scratch = tempfile::tempdir()?;

    for i in 0..jar.len() {
        let mut entry = jar.by_index(i)?;
        let name = entry.name().to_string();
        let Some(marker) = name.find(R_PKG_DIR) else {
            continue;
        };
        let relative = &name[marker..];

        // Skip entries whose path would escape the scratch root.
        if !is_enclosed(Path::new(relative)) {
            continue;
        }
        let outpath = scratch.path().join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            if verbose {
                sink.detail(&format!("created directory {}", outpath.display()));
            }
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
            if verbose {
                sink.detail(&format!("copied {} to {}", name, outpath.display()));
            }
        }
    }

    Ok(scratch)
}

/// Whether a relative entry path stays within the directory it is joined to.
fn is_enclosed(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn jar_with_entries(entries: &[(&str, Option<&[u8]>)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            match content {
                Some(bytes) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(bytes).unwrap();
                }
                None => zip.add_directory(*name, options).unwrap(),
            }
        }
        let cursor = zip.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn test_extracts_marker_entries_byte_for_byte() {
        let mut jar = jar_with_entries(&[
            ("R/pkg/", None),
            ("R/pkg/DESCRIPTION", Some(b"Package: sparklyr")),
            ("R/pkg/R/", None),
            ("R/pkg/R/code.R", Some(b"f <- function(x) x + 1\n")),
            ("com/example/Main.class", Some(b"\xca\xfe\xba\xbe")),
        ]);

        let scratch = extract_r_source(&mut jar, &Sink::stdout(), false).unwrap();

        let description = scratch.path().join("R/pkg/DESCRIPTION");
        assert_eq!(std::fs::read(description).unwrap(), b"Package: sparklyr");
        let code = scratch.path().join("R/pkg/R/code.R");
        assert_eq!(std::fs::read(code).unwrap(), b"f <- function(x) x + 1\n");
        assert!(scratch.path().join("R/pkg/R").is_dir());
        // Entries outside the marker are not extracted.
        assert!(!scratch.path().join("com").exists());
    }

    #[test]
    fn test_marker_path_is_rebased_to_scratch_root() {
        // The marker may sit below a jar-internal prefix; extraction keeps
        // only the segment starting at the marker.
        let mut jar = jar_with_entries(&[(
            "nested/prefix/R/pkg/DESCRIPTION",
            Some(b"Package: nested"),
        )]);

        let scratch = extract_r_source(&mut jar, &Sink::stdout(), false).unwrap();

        assert!(scratch.path().join("R/pkg/DESCRIPTION").is_file());
        assert!(!scratch.path().join("nested").exists());
    }

    #[test]
    fn test_jar_without_marker_extracts_nothing() {
        let mut jar = jar_with_entries(&[("com/example/Main.class", Some(b"bytecode"))]);

        let scratch = extract_r_source(&mut jar, &Sink::stdout(), false).unwrap();

        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_traversal_entries_are_skipped() {
        let mut jar = jar_with_entries(&[
            ("R/pkg/../../evil.R", Some(b"unlink('/')")),
            ("R/pkg/DESCRIPTION", Some(b"Package: ok")),
        ]);

        let scratch = extract_r_source(&mut jar, &Sink::stdout(), false).unwrap();

        assert!(scratch.path().join("R/pkg/DESCRIPTION").is_file());
        assert!(!scratch.path().parent().unwrap().join("evil.R").exists());
    }

    #[test]
    fn test_verbose_reports_each_entry() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Buf(Arc<Mutex<Vec<u8>>>);
        impl Write for Buf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buf = Buf::default();
        let sink = Sink::from_writer(buf.clone());
        let mut jar = jar_with_entries(&[
            ("R/pkg/", None),
            ("R/pkg/DESCRIPTION", Some(b"Package: verbose")),
        ]);

        let _scratch = extract_r_source(&mut jar, &sink, true).unwrap();

        let captured = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(captured.contains("created directory"));
        assert!(captured.contains("copied R/pkg/DESCRIPTION"));
    }
}
