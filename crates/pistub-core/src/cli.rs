//! Command-line front end behind the Python `main(argv)` entry point.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::errors::{PistubError, PistubResult};
use crate::generator::pipeline::{run, RunOptions};
use crate::models::ModuleReport;

#[derive(Parser, Debug)]
#[clap(name = "pistub", version, about = "Generate .pi interface stubs from PyGTK defs files", long_about = None)]
pub struct Cli {
    /// Source trees holding defs and override files
    #[clap(value_parser, value_name = "DIR")]
    source_dirs: Vec<PathBuf>,
    /// Directory to write .pi files to; defaults to each source directory
    #[clap(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Directory containing the `codegen` package
    #[clap(long, value_name = "DIR")]
    codegen_dir: Option<PathBuf>,
    /// JSON module list to use instead of the built-in one
    #[clap(long, value_name = "FILE")]
    modules: Option<PathBuf>,
    /// Do not import modules to collect enum and flag constants
    #[clap(long)]
    no_introspect: bool,
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        RunOptions {
            source_dirs: cli.source_dirs,
            output_dir: cli.output_dir,
            codegen_dir: cli.codegen_dir,
            modules_file: cli.modules,
            introspect: !cli.no_introspect,
        }
    }
}

/// Install the stderr subscriber, filtered by `PISTUB_LOG` (default `info`).
/// Later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("PISTUB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse `argv` (program name first) into run options. `Ok(None)` means
/// help or version output was printed and there is nothing to do.
pub fn parse_args<I, T>(argv: I) -> PistubResult<Option<RunOptions>>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(argv) {
        Ok(cli) => Ok(Some(cli.into())),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            Ok(None)
        }
        Err(err) => Err(PistubError::Config(err.to_string())),
    }
}

pub fn main_with_args(argv: Vec<String>) -> PistubResult<Vec<ModuleReport>> {
    init_logging();
    match parse_args(argv)? {
        Some(options) => run(&options),
        None => Ok(Vec::new()),
    }
}
