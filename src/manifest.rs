//! Jar manifest inspection.
//!
//! A Spark package jar announces bundled R source through its manifest: the
//! main section carries a `Spark-HasRPackage` attribute whose value is the
//! literal `true`. This module reads `META-INF/MANIFEST.MF` out of an open
//! zip archive and answers that one question.

use std::io::{Read, Seek};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::BundleError;

/// Manifest attribute signaling an embedded R source package.
pub const HAS_R_PACKAGE_ATTRIBUTE: &str = "Spark-HasRPackage";

/// Conventional location of the manifest inside a jar.
const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Whether the jar's manifest declares a bundled R source package.
///
/// True iff the `Spark-HasRPackage` main attribute is present and its
/// trimmed value equals `true` (case-sensitive). A jar without a manifest
/// simply does not carry the flag, so it yields `Ok(false)` rather than an
/// error; only I/O and archive-format failures propagate.
pub fn has_r_package<R: Read + Seek>(jar: &mut ZipArchive<R>) -> Result<bool, BundleError> {
    let Some(manifest) = read_manifest(jar)? else {
        return Ok(false);
    };
    Ok(main_attribute(&manifest, HAS_R_PACKAGE_ATTRIBUTE).is_some_and(|v| v.trim() == "true"))
}

/// Read the manifest text, or `None` if the jar has no manifest entry.
fn read_manifest<R: Read + Seek>(jar: &mut ZipArchive<R>) -> Result<Option<String>, BundleError> {
    let mut entry = match jar.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// Look up an attribute in the manifest's main section.
///
/// The main section ends at the first blank line. A line starting with a
/// single space continues the previous attribute's value (the 72-byte wrap
/// rule of the manifest format). Attribute names compare
/// ASCII-case-insensitively; values are returned verbatim.
fn main_attribute(manifest: &str, name: &str) -> Option<String> {
    let mut attributes: Vec<(String, String)> = Vec::new();

    for line in manifest.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = attributes.last_mut() {
                value.push_str(continuation);
            }
        } else if let Some((key, value)) = line.split_once(':') {
            let value = value.strip_prefix(' ').unwrap_or(value);
            attributes.push((key.to_string(), value.to_string()));
        }
    }

    attributes
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}
