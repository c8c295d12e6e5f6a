//! Error types for jar inspection and extraction.

use thiserror::Error;

/// Errors that can occur while inspecting or extracting a bundled R package.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error(
        "SPARK_HOME is not set: pass --spark-home or export SPARK_HOME so the \
         R library directory can be located"
    )]
    MissingSparkHome,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}
