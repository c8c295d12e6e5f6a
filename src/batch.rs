//! Batch driver: check, extract, build, clean up, one jar at a time.
//!
//! Accepts the comma-separated jar list handed over by the deployment
//! tooling and processes each path strictly sequentially. Every per-archive
//! problem (missing file, unreadable archive, failed build) is reported to
//! the sink and skipped; only a missing Spark installation directory aborts
//! the batch, and it does so before any extraction starts.

use std::fs::File;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::build::{self, BuildConfig};
use crate::error::BundleError;
use crate::extract;
use crate::manifest;
use crate::output::Sink;

/// Environment variable naming the Spark installation directory.
pub const SPARK_HOME_ENV: &str = "SPARK_HOME";

/// Help text emitted when a bundled package fails to build.
pub const LAYOUT_HELP: &str = "\
A jar carrying a buildable R source package must:
  1. declare `Spark-HasRPackage: true` in the main section of its manifest,
  2. ship the package sources under an entry path containing `R/pkg`,
     e.g. `R/pkg/DESCRIPTION` and `R/pkg/R/<code>.R`,
  3. keep `R/pkg` a directory that `R CMD INSTALL` accepts (a valid
     DESCRIPTION file at its root).
The extracted `R/pkg` directory is installed with
`R CMD INSTALL -l $SPARK_HOME/R/lib`, so the `R` front end must be available
on this machine and `$SPARK_HOME/R/lib` must be writable.";

/// Resolve the Spark installation directory.
///
/// Fallback chain, in order: the explicit value (a `--spark-home` flag),
/// then the `SPARK_HOME` environment variable. Absence of both is a
/// configuration error.
pub fn resolve_spark_home(explicit: Option<PathBuf>) -> Result<PathBuf, BundleError> {
    explicit
        .or_else(|| std::env::var_os(SPARK_HOME_ENV).map(PathBuf::from))
        .ok_or(BundleError::MissingSparkHome)
}

/// Open a jar for inspection and extraction.
pub fn open_jar(path: &Path) -> Result<ZipArchive<File>, BundleError> {
    Ok(ZipArchive::new(File::open(path)?)?)
}

/// Build every bundled R package named by the comma-separated jar list.
///
/// Resolves the Spark installation first, so a missing configuration fails
/// the whole batch before any jar is touched.
pub fn check_and_build(
    jars: &str,
    spark_home: Option<PathBuf>,
    sink: &Sink,
    verbose: bool,
) -> Result<(), BundleError> {
    let config = BuildConfig::new(resolve_spark_home(spark_home)?);
    check_and_build_with(jars, &config, sink, verbose);
    Ok(())
}

/// Same as [`check_and_build`], with the builder configuration supplied.
///
/// Never fails: every per-archive problem is reported to the sink and the
/// batch moves on to the next path. Empty segments in the list are ignored.
pub fn check_and_build_with(jars: &str, config: &BuildConfig, sink: &Sink, verbose: bool) {
    for jar in jars.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        process_jar(Path::new(jar), config, sink, verbose);
    }
}

fn process_jar(path: &Path, config: &BuildConfig, sink: &Sink, verbose: bool) {
    if !path.exists() {
        sink.warning(&format!("{} was not found, skipping", path.display()));
        return;
    }

    let mut jar = match open_jar(path) {
        Ok(jar) => jar,
        Err(e) => {
            sink.warning(&format!(
                "{} could not be read as a jar, skipping: {}",
                path.display(),
                e
            ));
            return;
        }
    };

    match manifest::has_r_package(&mut jar) {
        Ok(true) => {}
        Ok(false) => {
            if verbose {
                sink.detail(&format!(
                    "{} doesn't contain R source code, skipping",
                    path.display()
                ));
            }
            return;
        }
        Err(e) => {
            sink.warning(&format!(
                "{} has an unreadable manifest, skipping: {}",
                path.display(),
                e
            ));
            return;
        }
    }

    sink.action(&format!(
        "{} contains R source code. Now installing package.",
        path.display()
    ));

    let scratch = match extract::extract_r_source(&mut jar, sink, verbose) {
        Ok(scratch) => scratch,
        Err(e) => {
            // Abort this jar only; the half-populated scratch directory is
            // removed when the handle drops.
            sink.error(&format!(
                "failed to extract R source from {}: {}",
                path.display(),
                e
            ));
            return;
        }
    };

    let outcome = build::install_bundled_package(config, scratch.path(), sink, verbose);
    if outcome.success {
        sink.success(&format!(
            "installed bundled R package from {}",
            path.display()
        ));
    } else {
        sink.error(&format!("failed to build R package in {}", path.display()));
        sink.line(LAYOUT_HELP);
    }

    // The scratch directory must not outlive this jar's processing.
    if let Err(e) = scratch.close() {
        sink.warning(&format!("failed to remove scratch directory: {}", e));
    }
}
