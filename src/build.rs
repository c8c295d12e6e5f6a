//! External builder invocation.
//!
//! An extracted R package is built and installed by shelling out to
//! `R CMD INSTALL`. The child runs with a cleared environment and its
//! combined output is relayed live to the caller's sink by background tasks,
//! so a full pipe buffer can never deadlock the parent while it blocks on
//! the exit status.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::extract::R_PKG_DIR;
use crate::output::Sink;

/// Installer front end used to build extracted packages.
pub const R_COMMAND: &str = "R";

/// Explicit configuration for builder invocations.
///
/// Callers resolve the Spark installation directory themselves (see
/// [`crate::batch::resolve_spark_home`]) and pass it in; the invoker does no
/// ambient environment lookup of its own.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Base Spark installation; packages install into `<spark_home>/R/lib`.
    pub spark_home: PathBuf,
    /// Installer front end, normally [`R_COMMAND`].
    pub program: PathBuf,
}

impl BuildConfig {
    pub fn new(spark_home: impl Into<PathBuf>) -> Self {
        Self {
            spark_home: spark_home.into(),
            program: PathBuf::from(R_COMMAND),
        }
    }

    /// Use a different installer front end.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Library directory passed to `-l`.
    pub fn library_dir(&self) -> PathBuf {
        self.spark_home.join("R").join("lib")
    }
}

/// Result of one builder invocation.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Whether the installer exited with status zero.
    pub success: bool,
    /// Exit code, if the process ran to completion and reported one.
    pub exit_code: Option<i32>,
    /// Best-effort count of output lines relayed to the sink.
    pub lines_relayed: u64,
    /// Failure description when the process could not be run or waited on.
    pub diagnostic: Option<String>,
}

impl BuildOutcome {
    fn launch_failure(diagnostic: String) -> Self {
        Self {
            success: false,
            exit_code: None,
            lines_relayed: 0,
            diagnostic: Some(diagnostic),
        }
    }
}

fn runtime() -> &'static tokio::runtime::Runtime {
    static RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RT.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_io()
            .build()
            .expect("failed to build tokio runtime for installer invocations")
    })
}

/// Build and install the extracted package under the configured library dir.
///
/// Runs `<program> CMD INSTALL -l <spark_home>/R/lib <scratch>/R/pkg` with a
/// cleared environment. Stdout and stderr are drained concurrently into the
/// sink, and both relay tasks are joined before the exit code is read, so
/// every output line lands before success or failure is reported. Launch and
/// wait errors are folded into a failed outcome rather than propagated; one
/// package's broken build must not take the rest of a batch down with it.
pub fn install_bundled_package(
    config: &BuildConfig,
    scratch: &Path,
    sink: &Sink,
    verbose: bool,
) -> BuildOutcome {
    let lib_dir = config.library_dir();
    let pkg_dir = scratch.join(R_PKG_DIR);

    if verbose {
        sink.detail(&format!(
            "running {} CMD INSTALL -l {} {}",
            config.program.display(),
            lib_dir.display(),
            pkg_dir.display()
        ));
    }

    runtime().block_on(async {
        let mut cmd = tokio::process::Command::new(&config.program);
        cmd.arg("CMD")
            .arg("INSTALL")
            .arg("-l")
            .arg(&lib_dir)
            .arg(&pkg_dir);
        cmd.env_clear();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let msg = format!("failed to launch {}: {}", config.program.display(), e);
                sink.error(&msg);
                return BuildOutcome::launch_failure(msg);
            }
        };

        let out_task = child
            .stdout
            .take()
            .map(|s| tokio::spawn(relay_lines(s, sink.clone())));
        let err_task = child
            .stderr
            .take()
            .map(|s| tokio::spawn(relay_lines(s, sink.clone())));

        let status = child.wait().await;

        let mut lines_relayed = 0;
        for task in [out_task, err_task].into_iter().flatten() {
            lines_relayed += task.await.unwrap_or(0);
        }

        match status {
            Ok(status) => BuildOutcome {
                success: status.success(),
                exit_code: status.code(),
                lines_relayed,
                diagnostic: None,
            },
            Err(e) => {
                let msg = format!("failed waiting for {}: {}", config.program.display(), e);
                sink.error(&msg);
                BuildOutcome {
                    success: false,
                    exit_code: None,
                    lines_relayed,
                    diagnostic: Some(msg),
                }
            }
        }
    })
}

/// Drain one child stream into the sink, line by line.
async fn relay_lines<R: AsyncRead + Unpin>(stream: R, sink: Sink) -> u64 {
    let mut lines = BufReader::new(stream).lines();
    let mut relayed = 0;
    while let Ok(Some(line)) = lines.next_line().await {
        sink.line(&line);
        relayed += 1;
    }
    relayed
}
