//! pistub core library: generates Python interface stubs (`.pi` files) for
//! PyGTK-style extension modules from their `.defs` and `.override` sources.
//!
//! The crate is compiled as a Python extension module (`_pistub_core`) via
//! PyO3; the generator itself is plain Rust and usable as a library.

pub mod cli;
pub mod config;
pub mod defs;
pub mod errors;
pub mod generator;
pub mod models;

use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::generator::pipeline::RunOptions;
use crate::models::ModuleReport;

/// Run the generator with command-line arguments (`argv[0]` is the program
/// name).
#[pyfunction]
fn main(py: Python<'_>, argv: Vec<String>) -> PyResult<Vec<ModuleReport>> {
    Ok(py.allow_threads(|| cli::main_with_args(argv))?)
}

/// Generate stubs for every configured module under `source_dirs`.
#[pyfunction]
#[pyo3(signature = (source_dirs, output_dir=None, codegen_dir=None, modules_file=None, introspect=true))]
fn generate_stubs(
    py: Python<'_>,
    source_dirs: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    codegen_dir: Option<PathBuf>,
    modules_file: Option<PathBuf>,
    introspect: bool,
) -> PyResult<Vec<ModuleReport>> {
    cli::init_logging();
    let options = RunOptions {
        source_dirs,
        output_dir,
        codegen_dir,
        modules_file,
        introspect,
    };
    Ok(py.allow_threads(|| generator::pipeline::run(&options))?)
}

// ---------------------------------------------------------------------------
// Top-level Python module: _pistub_core
// ---------------------------------------------------------------------------

#[pymodule]
fn _pistub_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ModuleReport>()?;

    m.add("PYGTK_DOC_BASE_URL", config::PYGTK_DOC_BASE_URL)?;
    m.add("GNOME_DOC_BASE_URL", config::GNOME_DOC_BASE_URL)?;

    m.add_function(wrap_pyfunction!(main, m)?)?;
    m.add_function(wrap_pyfunction!(generate_stubs, m)?)?;

    Ok(())
}
