//! Error types for the pistub core library.

use std::path::PathBuf;

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::PyErr;

/// Top-level error enum for the pistub core library.
///
/// Only the fatal categories live here.  Soft misses (unknown override
/// targets, unresolvable base classes, unparseable C return expressions) are
/// reported through `tracing::warn!` and never surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum PistubError {
    #[error("Parse error in {}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Missing required field `{field}` in {kind} definition {name:?}")]
    MissingField {
        kind: String,
        name: String,
        field: &'static str,
    },

    #[error("Introspection error: {0}")]
    Introspection(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PistubError {
    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        PistubError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

impl From<PistubError> for PyErr {
    fn from(err: PistubError) -> PyErr {
        match &err {
            PistubError::Parse { .. } | PistubError::MissingField { .. } => {
                PyValueError::new_err(err.to_string())
            }
            PistubError::Config(_) | PistubError::Json(_) => PyValueError::new_err(err.to_string()),
            PistubError::Introspection(_) => PyRuntimeError::new_err(err.to_string()),
            PistubError::Io(_) => PyIOError::new_err(err.to_string()),
        }
    }
}

pub type PistubResult<T> = Result<T, PistubError>;
