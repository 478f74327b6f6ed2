//! Recovers parameter and return types from hand-written override wrappers.
//!
//! This is plain text scanning over C source, not parsing. The rules below
//! are deliberately narrow; changing them changes the generated stubs of
//! every module that has overrides.

use tracing::{debug, warn};

use crate::generator::overrides::{CallStyle, OverrideFile};
use crate::generator::types::{NONE_TAG, UNSPECIFIED_TAG};
use crate::models::Namespace;

const RETURN_KEYWORD: &str = "return ";

/// Return-expression prefixes and the native tag each one implies.
const CONSTRUCTOR_PREFIXES: &[(&str, &str)] = &[
    ("PyInt", "int"),
    ("PyLong", "int"),
    ("PyString", "char*"),
    ("PyUnicode", "!unicode"),
    ("PyFloat", "!float"),
    ("PyBool", "gboolean"),
    ("PyObject_Is", "gboolean"),
    ("PyTuple", "tuple"),
    ("PyList", "list"),
    ("PyDict", "dict"),
    ("pyg_value_as_pyobject", "!object"),
    ("pyg_object_new", "!object"),
];

// ---------------------------------------------------------------------------
// Format strings
// ---------------------------------------------------------------------------

fn format_char_type(c: char) -> Option<&'static str> {
    match c {
        's' | 'z' => Some("string"),
        'u' => Some("unicode"),
        'i' | 'b' | 'h' | 'l' => Some("integer"),
        'c' => Some("char"),
        'd' => Some("float"),
        'D' => Some("complex"),
        'O' | 'S' | 'U' | 'N' => Some("object"),
        _ => None,
    }
}

fn group_kind(close: char) -> &'static str {
    match close {
        ')' => "tuple",
        ']' => "list",
        _ => "dict",
    }
}

/// Translate a `Py_BuildValue`-style format string into type names.
/// Bracket groups become `tuple(..)`, `list(..)` or `dict(..)`.
pub fn format_to_types(spec: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut sub = String::new();

    for c in spec.chars() {
        match c {
            '(' | '[' | '{' => {
                if depth > 0 {
                    sub.push(c);
                }
                depth += 1;
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    out.push(format!(
                        "{}({})",
                        group_kind(c),
                        format_to_types(&sub).join(", ")
                    ));
                    sub.clear();
                } else {
                    sub.push(c);
                }
            }
            _ if depth > 0 => sub.push(c),
            '#' | '&' | '!' | '|' => {}
            _ => out.push(format_char_type(c).unwrap_or(UNSPECIFIED_TAG).to_string()),
        }
    }
    out
}

/// Pair a `PyArg_ParseTuple*` format string with the names of the variables
/// it fills. Recognized types get an explicit (`!`) tag; a `!` or `#`
/// modifier folds the previous entry into the next variable, keeping the
/// previous variable name as a C type note.
pub fn format_to_arg_types(argnames: &[String], spec: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let mut depth = 0usize;
    let mut sub = String::new();
    let mut argpos = 0usize;

    for c in spec.chars() {
        if argpos >= argnames.len() {
            break;
        }
        match c {
            '(' | '[' | '{' => {
                if depth > 0 {
                    sub.push(c);
                }
                depth += 1;
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    out.push((
                        argnames[argpos].clone(),
                        format!("!{}({})", group_kind(c), format_to_types(&sub).join(", ")),
                    ));
                    argpos += 1;
                    sub.clear();
                } else {
                    sub.push(c);
                }
            }
            _ if depth > 0 => sub.push(c),
            '&' | '|' => {}
            '!' | '#' => {
                if let Some((prev_name, prev_type)) = out.pop() {
                    out.push((
                        argnames[argpos].clone(),
                        format!("{prev_type} (C type: {prev_name})"),
                    ));
                }
                argpos += 1;
            }
            _ => {
                let tag = match format_char_type(c) {
                    Some(t) => format!("!{t}"),
                    None => UNSPECIFIED_TAG.to_string(),
                };
                out.push((argnames[argpos].clone(), tag));
                argpos += 1;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Call and expression scanning
// ---------------------------------------------------------------------------

/// Text between the parentheses of the first call at or after `pos`.
fn call_args(code: &str, pos: usize) -> Option<&str> {
    let start = code[pos..].find('(')? + pos;
    let mut depth = 0usize;
    for (offset, c) in code[start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&code[start + 1..start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

/// The format part of a `PyArg_Parse*` spec, without the `:name` or
/// `;message` suffix.
fn format_section(spec: &str) -> &str {
    if let Some(pos) = spec.find(':') {
        &spec[..pos]
    } else if let Some(pos) = spec.find(';') {
        &spec[..pos]
    } else {
        spec
    }
}

/// Arguments of a parsing call: `format_index` is the position of the
/// format string; variable names follow `names_from`.
fn extract_parse_call(
    fct: &str,
    code: &str,
    pos: usize,
    call: &str,
    format_index: usize,
    names_from: usize,
) -> Option<Vec<(String, String)>> {
    let at = code[pos..].find(call)? + pos;
    let Some(args) = call_args(code, at) else {
        warn!("Unterminated {call} call for {fct}");
        return None;
    };
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() < names_from {
        warn!("Malformed {call} call for {fct}");
        return None;
    }
    let spec = format_section(unquote(parts[format_index]));
    let argnames: Vec<String> = parts[names_from..]
        .iter()
        .map(|a| a.strip_prefix('&').unwrap_or(a).trim().to_string())
        .collect();
    Some(format_to_arg_types(&argnames, spec))
}

/// (name, type) pairs from the argument parsing call of a wrapper, trying the
/// keyword-aware form first.
pub fn extract_param_types(fct: &str, code: &str) -> Option<Vec<(String, String)>> {
    let start = match code.find("_wrap_") {
        Some(pos) => pos,
        None => {
            warn!("Could not find _wrap_ function for {fct}");
            0
        }
    };

    if let Some(found) = extract_parse_call(fct, code, start, "PyArg_ParseTupleAndKeywords(", 2, 4) {
        return Some(found);
    }
    if let Some(found) = extract_parse_call(fct, code, start, "PyArg_ParseTuple(", 1, 2) {
        return Some(found);
    }
    warn!("Could not find argument parsing code for {fct}");
    None
}

/// Follow `name = value;` assignments backwards from `pos` until the
/// expression is a call (or `Py_None`). `None` when an assignment is missing.
pub fn resolve_c_expr(code: &str, expr: &str, pos: usize) -> Option<String> {
    let mut expr = expr.trim().to_string();
    let mut end = pos.min(code.len());
    loop {
        if expr.contains('(') || expr == "Py_None" {
            return Some(expr);
        }
        if expr.is_empty() {
            return None;
        }
        while !code.is_char_boundary(end) {
            end -= 1;
        }
        let needle = format!("{expr} = ");
        let assign = code[..end].rfind(&needle)?;
        let value_start = assign + needle.len();
        let value_end = code[value_start..].find(';')? + value_start;
        expr = code[value_start..value_end].trim().to_string();
        // The window shrinks on every step, so this terminates.
        end = assign.saturating_sub(1);
    }
}

fn is_bool_ternary(expr: &str) -> bool {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    let n = parts.len();
    n >= 5
        && (parts[n - 1].contains("Py_False") || parts[n - 1].contains("Py_True"))
        && parts[n - 2] == ":"
        && matches!(parts[n - 3], "Py_True" | "Py_False")
        && parts[n - 4] == "?"
}

/// Native tag for a resolved return expression.
pub fn classify_c_expr(fct: &str, expr: &str) -> Option<String> {
    let expr = expr.trim();
    if expr == "Py_None" {
        return Some(NONE_TAG.to_string());
    }
    if let Some((_, tag)) = CONSTRUCTOR_PREFIXES
        .iter()
        .find(|(prefix, _)| expr.starts_with(prefix))
    {
        return Some(tag.to_string());
    }
    if expr.starts_with("pyg_boxed_new(") {
        let gtype = call_args(expr, 0)?.split(',').next()?.trim();
        return Some(format!("!object (GTYPE={gtype})"));
    }
    if is_bool_ternary(expr) {
        return Some("gboolean".to_string());
    }
    if expr.starts_with("Py_BuildValue(") {
        let spec = unquote(call_args(expr, 0)?.split(',').next()?);
        let types = format_to_types(spec);
        let tag = match types.len() {
            0 => {
                warn!("Empty Py_BuildValue spec for {fct}");
                UNSPECIFIED_TAG.to_string()
            }
            1 => format!("!{}", types[0]),
            _ => format!("!tuple({})", types.join(", ")),
        };
        return Some(tag);
    }
    None
}

/// Native return tag of a wrapper: the first `return` statement after the
/// last `_wrap_` whose value resolves to something other than `NULL` and
/// can be classified.
pub fn extract_return_type(fct: &str, code: &str) -> Option<String> {
    let start = match code.rfind("_wrap_") {
        Some(pos) => pos,
        None => {
            warn!("Could not find _wrap_ function for {fct}");
            0
        }
    };

    let mut search = start;
    while let Some(found) = code[search..].find(RETURN_KEYWORD) {
        let keyword_at = search + found;
        let expr_start = keyword_at + RETURN_KEYWORD.len();
        let Some(len) = code[expr_start..].find(';') else {
            break;
        };
        let expr = &code[expr_start..expr_start + len];
        if let Some(resolved) = resolve_c_expr(code, expr, keyword_at.saturating_sub(1)) {
            if resolved != "NULL" {
                if let Some(tag) = classify_c_expr(fct, &resolved) {
                    return Some(tag);
                }
            }
        }
        search = expr_start;
    }

    warn!("Unknown return type for {fct}");
    None
}

// ---------------------------------------------------------------------------
// Applying overrides
// ---------------------------------------------------------------------------

/// Refine the descriptors named by `file`'s overrides. The recovered
/// parameters and return type replace the defs-derived ones only when both
/// were extracted; otherwise the descriptor is left as it is. Returns the
/// number of overrides matched.
pub fn apply_overrides(ns: &mut Namespace, file: &OverrideFile) -> usize {
    let mut matched = 0;
    for (fct, entry) in &file.overrides {
        let Some(defn) = ns.callable_mut(fct) else {
            warn!("Could not look up override {fct}");
            continue;
        };
        matched += 1;

        let param_types = match entry.style {
            CallStyle::NoArgs => Some(Vec::new()),
            CallStyle::KwArgs | CallStyle::Positional => extract_param_types(fct, &entry.code),
        };
        let returns = extract_return_type(fct, &entry.code);

        match (param_types, returns) {
            (Some(param_types), Some(returns)) => {
                defn.set_param_types(param_types);
                defn.returns = returns;
            }
            _ => debug!("Keeping defs signature for {fct}"),
        }
    }
    matched
}
