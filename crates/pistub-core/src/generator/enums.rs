//! Enum and flag constants harvested from the live Python module.
//!
//! The defs files describe enum and flag *types*; their members only exist
//! in the compiled module, so the module is imported and its attributes are
//! turned into `NAME = value` stub lines.

use std::collections::HashSet;
use std::path::PathBuf;

use pyo3::exceptions::PyImportError;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyInt, PyList, PyString};
use tracing::{debug, info};

use crate::errors::{PistubError, PistubResult};
use crate::models::Namespace;

/// A module attribute worth writing into the stub.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    /// `GEnum` member. `value` is `None` when it has no integer value.
    Enum {
        type_name: String,
        value: Option<i64>,
    },
    /// `GFlags` member.
    Flags {
        type_name: String,
        value: Option<i64>,
    },
    Int(i64),
    Bool(bool),
    Float(f64),
    Str(String),
}

/// Source of module constants.
pub trait ModuleIntrospector {
    /// The constants exported by `module`, in attribute order, or `None` if
    /// the module cannot be imported.
    fn load_constants(&self, module: &str) -> PistubResult<Option<Vec<(String, ConstantValue)>>>;
}

/// Introspector for runs that must not import anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullIntrospector;

impl ModuleIntrospector for NullIntrospector {
    fn load_constants(&self, _module: &str) -> PistubResult<Option<Vec<(String, ConstantValue)>>> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Python-backed introspection
// ---------------------------------------------------------------------------

/// Imports modules through the embedding (or embedded) interpreter.
#[derive(Clone, Debug, Default)]
pub struct PythonIntrospector {
    search_paths: Vec<PathBuf>,
}

impl PythonIntrospector {
    /// `search_paths` are put at the front of `sys.path` before importing.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    fn extend_sys_path(&self, py: Python<'_>) -> PyResult<()> {
        let sys = py.import("sys")?;
        let path = sys.getattr("path")?.downcast_into::<PyList>()?;
        for dir in self.search_paths.iter().rev() {
            let dir = dir.to_string_lossy();
            if !path.contains(dir.as_ref())? {
                path.insert(0, dir.as_ref())?;
            }
        }
        Ok(())
    }

    fn collect(&self, py: Python<'_>, module: &str) -> PyResult<Option<Vec<(String, ConstantValue)>>> {
        self.extend_sys_path(py)?;

        // Without GObject there are no enum or flag types to recognize.
        let gobject = py
            .import("gobject")
            .or_else(|_| py.import("gi.repository.GObject"))
            .ok();
        let bases = match &gobject {
            Some(g) => Some((g.getattr("GEnum")?, g.getattr("GFlags")?)),
            None => None,
        };

        let target = match py.import(module) {
            Ok(m) => m,
            Err(err) if err.is_instance_of::<PyImportError>(py) => {
                debug!(module, "Module not importable: {err}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let mut out = Vec::new();
        for (key, value) in target.dict().iter() {
            let Ok(name) = key.extract::<String>() else {
                continue;
            };
            if let Some(constant) = classify_value(&value, bases.as_ref())? {
                out.push((name, constant));
            }
        }
        Ok(Some(out))
    }
}

fn classify_value<'py>(
    value: &Bound<'py, PyAny>,
    bases: Option<&(Bound<'py, PyAny>, Bound<'py, PyAny>)>,
) -> PyResult<Option<ConstantValue>> {
    if let Some((genum, gflags)) = bases {
        // Flags first: in some bindings GFlags derives from GEnum's base.
        if value.is_instance(gflags)? {
            return Ok(Some(ConstantValue::Flags {
                type_name: value.get_type().name()?.to_string(),
                value: value.extract::<i64>().ok(),
            }));
        }
        if value.is_instance(genum)? {
            return Ok(Some(ConstantValue::Enum {
                type_name: value.get_type().name()?.to_string(),
                value: value.extract::<i64>().ok(),
            }));
        }
    }

    let constant = if value.is_instance_of::<PyBool>() {
        Some(ConstantValue::Bool(value.extract()?))
    } else if value.is_instance_of::<PyInt>() {
        value.extract::<i64>().ok().map(ConstantValue::Int)
    } else if value.is_instance_of::<PyFloat>() {
        Some(ConstantValue::Float(value.extract()?))
    } else if value.is_instance_of::<PyString>() {
        Some(ConstantValue::Str(value.extract()?))
    } else {
        None
    };
    Ok(constant)
}

impl ModuleIntrospector for PythonIntrospector {
    fn load_constants(&self, module: &str) -> PistubResult<Option<Vec<(String, ConstantValue)>>> {
        Python::with_gil(|py| self.collect(py, module))
            .map_err(|err| PistubError::Introspection(format!("{module}: {err}")))
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn hex_literal(value: i64) -> String {
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("{value:#x}")
    }
}

fn float_literal(value: f64) -> String {
    if value.is_nan() {
        "float('nan')".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("float('{sign}inf')")
    } else {
        // Debug output always carries a decimal point or exponent.
        format!("{value:?}")
    }
}

/// Single-quoted Python string literal.
fn str_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Right-hand side for a constant. Enum and flag literals are wrapped in
/// their type when `known` has the type's display name.
pub fn render_constant(value: &ConstantValue, known: &HashSet<String>) -> String {
    let wrap = |type_name: &str, literal: String| {
        if known.contains(type_name) {
            format!("{type_name}({literal})")
        } else {
            literal
        }
    };
    match value {
        ConstantValue::Enum { type_name, value } => {
            wrap(type_name, value.map_or_else(|| "0".to_string(), |v| v.to_string()))
        }
        ConstantValue::Flags { type_name, value } => {
            wrap(type_name, value.map_or_else(|| "0".to_string(), hex_literal))
        }
        ConstantValue::Int(v) => v.to_string(),
        ConstantValue::Bool(true) => "True".to_string(),
        ConstantValue::Bool(false) => "False".to_string(),
        ConstantValue::Float(v) => float_literal(*v),
        ConstantValue::Str(s) => str_literal(s),
    }
}

/// Add the constants of `module` that the namespace does not already name.
/// Dunder attributes are never copied. Returns the number of lines added.
pub fn augment(
    ns: &mut Namespace,
    module: &str,
    introspector: &dyn ModuleIntrospector,
) -> PistubResult<usize> {
    let Some(values) = introspector.load_constants(module)? else {
        return Ok(0);
    };

    let known: HashSet<String> = ns.display_names().into_iter().map(str::to_string).collect();
    let mut added = 0;
    for (name, value) in values {
        if name.starts_with("__") || known.contains(&name) {
            continue;
        }
        let rhs = render_constant(&value, &known);
        ns.add_constant(name.clone(), format!("{name} = {rhs}"));
        added += 1;
    }
    info!("Loaded {added} constants from {module}");
    Ok(added)
}
