//! Report sink and colored output formatting.
//!
//! Every operation in this crate writes its progress and diagnostics to a
//! [`Sink`] supplied by the caller instead of printing directly. The sink is
//! cheap to clone and safe to share with the output-relay tasks that drain a
//! child process, so build output and driver messages interleave on the same
//! stream.
//!
//! Uses owo-colors for terminal colors.

use owo_colors::OwoColorize;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// A shared, append-only line sink.
///
/// Writes are best-effort: a failing or poisoned underlying writer drops the
/// line rather than failing the operation that produced it.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Sink {
    /// Sink that appends to the process's stdout.
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    /// Sink that appends to an arbitrary writer.
    ///
    /// Tests pass a shared buffer here to capture everything an operation
    /// reported.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Append one plain line.
    pub fn line(&self, message: &str) {
        if let Ok(mut w) = self.inner.lock() {
            let _ = writeln!(w, "{}", message);
            let _ = w.flush();
        }
    }

    /// Print an action header (blue, bold)
    /// Example: "==> Installing bundled R package"
    pub fn action(&self, message: &str) {
        self.line(&format!("{} {}", "==>".blue().bold(), message.bold()));
    }

    /// Print a detail line (dimmed), used for verbose progress.
    pub fn detail(&self, message: &str) {
        self.line(&format!("     {}", message.dimmed()));
    }

    /// Print a success message (green)
    pub fn success(&self, message: &str) {
        self.line(&format!("{} {}", "==>".green().bold(), message.green()));
    }

    /// Print a warning message (yellow)
    pub fn warning(&self, message: &str) {
        self.line(&format!(
            "{} {}",
            "warning:".yellow().bold(),
            message.yellow()
        ));
    }

    /// Print an error message (red)
    pub fn error(&self, message: &str) {
        self.line(&format!("{} {}", "error:".red().bold(), message.red()));
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::stdout()
    }
}
