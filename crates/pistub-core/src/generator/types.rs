//! Translation of native type tags into stub placeholder values and
//! human-readable type names.
//!
//! Both directions are total: any string, however malformed, maps to
//! something renderable.

use crate::models::Namespace;

const INTEGER_TAGS: &[&str] = &[
    "guint", "gint", "guint32", "gint32", "int", "uint", "long", "ulong", "guint*", "gint*",
    "guint32*", "gint32*", "int*", "uint*", "long*", "ulong*",
];

/// Tag for "no value"; renders a `pass` body.
pub const NONE_TAG: &str = "none";

/// Tag for a parameter whose type is not known.
pub const UNSPECIFIED_TAG: &str = "unspecified";

/// A stub return value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// Source text of an expression, possibly followed by a comment.
    Value(String),
    /// The function returns nothing.
    Nothing,
}

/// Strip trailing pointer markers and a `const-` qualifier.
fn class_name_of(tag: &str) -> &str {
    let bare = tag.trim_end_matches('*');
    bare.strip_prefix("const-").unwrap_or(bare)
}

/// Placeholder for an explicit (`!`-prefixed) tag, already stripped.
fn explicit_placeholder(spec: &str) -> String {
    let value = if spec.starts_with("tuple") {
        "()"
    } else if spec.starts_with("list") {
        "[]"
    } else if spec.starts_with("dict") {
        "{}"
    } else if spec.starts_with("object") {
        "object()"
    } else {
        match spec {
            "string" | "char" => "\"\"",
            "unicode" => "u\"\"",
            "integer" => "0",
            "float" => "0.0",
            "complex" => "0j",
            "boolean" => "1",
            other => other,
        }
    };
    value.to_string()
}

/// A value of the tagged type, as stub source.
pub fn placeholder_value(tag: &str, ns: &Namespace) -> Placeholder {
    let spec = tag.trim();
    let value = if spec.contains("char*") {
        "\"\"".to_string()
    } else if spec == "gunichar" {
        "u\"\"".to_string()
    } else if INTEGER_TAGS.contains(&spec) {
        "0".to_string()
    } else if spec == NONE_TAG {
        return Placeholder::Nothing;
    } else if spec == "gboolean" {
        "1".to_string()
    } else if spec == "gpointer" {
        "\"\"  # Returns any value".to_string()
    } else if spec == "Function" {
        "lambda x: x  # Returns a callable function".to_string()
    } else if let Some(explicit) = spec.strip_prefix('!').filter(|e| !e.is_empty()) {
        explicit_placeholder(explicit)
    } else if spec == UNSPECIFIED_TAG || spec.is_empty() {
        "\"\"  # Unspecified type".to_string()
    } else {
        let name = class_name_of(spec);
        let shown = ns.display_name_of(name).unwrap_or(name);
        format!("{shown}()")
    };
    Placeholder::Value(value)
}

/// Human-readable name of the tagged type, for parameter documentation.
pub fn display_name(tag: &str, ns: &Namespace) -> String {
    let spec = tag.trim();
    if spec.contains("char*") {
        "string".to_string()
    } else if spec == "gunichar" {
        "unicode string".to_string()
    } else if INTEGER_TAGS.contains(&spec) {
        "integer".to_string()
    } else if spec == NONE_TAG {
        "None".to_string()
    } else if spec == "gboolean" {
        "boolean".to_string()
    } else if spec == "gpointer" {
        "any value".to_string()
    } else if spec == "Function" {
        "a callable".to_string()
    } else if let Some(explicit) = spec.strip_prefix('!').filter(|e| !e.is_empty()) {
        explicit.to_string()
    } else if spec == UNSPECIFIED_TAG || spec.is_empty() {
        "unspecified type".to_string()
    } else {
        let name = class_name_of(spec);
        let shown = ns.display_name_of(name).unwrap_or(name);
        format!("instance of {shown}")
    }
}
