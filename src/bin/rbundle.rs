//! rbundle CLI - bundled R package helper for Spark jars
//!
//! Usage:
//!   rbundle install <jars>         Build R packages bundled in the jars
//!   rbundle inspect <jars>         Report which jars carry R source code
//!   rbundle zip-libs <dir>         Bundle installed R libraries into a zip

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rbundle::output::Sink;
use rbundle::{batch, bundle, manifest};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rbundle")]
#[command(about = "Builds and installs R source packages bundled inside Spark package jars")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print per-entry progress and the installer command line
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and install every bundled R package in a list of jars
    Install {
        /// Comma-separated jar paths
        jars: String,

        /// Spark installation directory
        #[arg(long, env = "SPARK_HOME")]
        spark_home: Option<PathBuf>,
    },

    /// Report which jars declare bundled R source code
    Inspect {
        /// Comma-separated jar paths
        jars: String,
    },

    /// Bundle installed R libraries into a zip for distribution
    ZipLibs {
        /// Library directory to bundle (typically $SPARK_HOME/R/lib)
        dir: PathBuf,

        /// Name of the archive created inside the directory
        #[arg(long, default_value = "rlibs.zip")]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sink = Sink::stdout();

    match cli.command {
        Commands::Install { jars, spark_home } => {
            batch::check_and_build(&jars, spark_home, &sink, cli.verbose)
                .context("R package installation could not start")?;
        }

        Commands::Inspect { jars } => {
            for jar in jars.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let path = PathBuf::from(jar);
                if !path.exists() {
                    sink.warning(&format!("{} was not found", path.display()));
                    continue;
                }
                let mut archive = batch::open_jar(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                if manifest::has_r_package(&mut archive)
                    .with_context(|| format!("failed to read manifest of {}", path.display()))?
                {
                    sink.line(&format!("{}: bundled R source code", path.display()));
                } else {
                    sink.line(&format!("{}: no R source code", path.display()));
                }
            }
        }

        Commands::ZipLibs { dir, name } => {
            let archive = bundle::zip_r_libraries(&dir, &name)
                .with_context(|| format!("failed to bundle R libraries under {}", dir.display()))?;
            sink.success(&format!("bundled R libraries into {}", archive.display()));
        }
    }

    Ok(())
}
