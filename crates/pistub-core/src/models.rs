//! Shared typed models used across the defs parser, the namespace builder,
//! the override resolver and the stub emitter.

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use pyo3::prelude::*;

use crate::defs::reader::SExpr;

/// Name of the synthesized constructor method.
pub const CONSTRUCTOR: &str = "__init__";

/// Implicit first parameter of every method.
pub const RECEIVER: &str = "self";

// ---------------------------------------------------------------------------
// Definition records
// ---------------------------------------------------------------------------

/// Kind of a top-level `define-*` form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DefKind {
    Object,
    Interface,
    Enum,
    Flags,
    Boxed,
    Pointer,
    Function,
    Method,
    /// Any other `define-*` form (`define-virtual`, ...). Kept so the parser
    /// accepts it; the builder ignores it.
    Other(String),
}

impl DefKind {
    /// Map a form head such as `define-object` to its kind. Returns `None`
    /// for heads that are not `define-*` forms at all.
    pub fn from_head(head: &str) -> Option<Self> {
        let kind = head.strip_prefix("define-")?;
        Some(match kind {
            "object" => DefKind::Object,
            "interface" => DefKind::Interface,
            "enum" => DefKind::Enum,
            "flags" => DefKind::Flags,
            "boxed" => DefKind::Boxed,
            "pointer" => DefKind::Pointer,
            "function" => DefKind::Function,
            "method" => DefKind::Method,
            other => DefKind::Other(other.to_string()),
        })
    }

    /// Kinds that define a class in the generated stub.
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            DefKind::Object
                | DefKind::Interface
                | DefKind::Enum
                | DefKind::Flags
                | DefKind::Boxed
                | DefKind::Pointer
        )
    }

    pub fn label(&self) -> &str {
        match self {
            DefKind::Object => "object",
            DefKind::Interface => "interface",
            DefKind::Enum => "enum",
            DefKind::Flags => "flags",
            DefKind::Boxed => "boxed",
            DefKind::Pointer => "pointer",
            DefKind::Function => "function",
            DefKind::Method => "method",
            DefKind::Other(other) => other,
        }
    }
}

/// One normalized top-level definition: its kind, its name and every
/// `(tag value...)` child collected under the tag. Repeated tags append.
#[derive(Clone, Debug, PartialEq)]
pub struct DefinitionRecord {
    pub kind: DefKind,
    pub name: String,
    pub tags: IndexMap<String, Vec<SExpr>>,
}

impl DefinitionRecord {
    pub fn new(kind: DefKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            tags: IndexMap::new(),
        }
    }

    pub fn push(&mut self, tag: &str, values: impl IntoIterator<Item = SExpr>) {
        self.tags.entry(tag.to_string()).or_default().extend(values);
    }

    pub fn has(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn values(&self, tag: &str) -> &[SExpr] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Trimmed text of the first value under `tag`.
    pub fn first_text(&self, tag: &str) -> Option<&str> {
        self.values(tag).first()?.text().map(str::trim)
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// A free function (indent 0) or a method (indent 1).
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    /// (parameter name, native type tag), receiver excluded.
    pub param_types: Vec<(String, String)>,
    /// Rendered parameters, including `self` for methods and `name=default`
    /// entries.
    pub params: Vec<String>,
    pub returns: String,
    pub comments: Vec<String>,
    pub indent: usize,
}

impl FunctionDescriptor {
    pub fn function(
        name: impl Into<String>,
        param_types: Vec<(String, String)>,
        params: Vec<String>,
        returns: impl Into<String>,
        comments: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_types,
            params,
            returns: returns.into(),
            comments,
            indent: 0,
        }
    }

    pub fn method(
        name: impl Into<String>,
        param_types: Vec<(String, String)>,
        params: Vec<String>,
        returns: impl Into<String>,
        comments: Vec<String>,
    ) -> Self {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(RECEIVER.to_string());
        all.extend(params);
        Self {
            name: name.into(),
            param_types,
            params: all,
            returns: returns.into(),
            comments,
            indent: 1,
        }
    }

    pub fn is_method(&self) -> bool {
        self.indent > 0
    }

    /// Parameter count without the receiver.
    pub fn explicit_param_count(&self) -> usize {
        if self.is_method() {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }

    /// Replace the signature with types recovered from override source.
    /// Methods keep their receiver.
    pub fn set_param_types(&mut self, param_types: Vec<(String, String)>) {
        let mut params: Vec<String> = Vec::with_capacity(param_types.len() + 1);
        if self.is_method() {
            params.push(RECEIVER.to_string());
        }
        params.extend(param_types.iter().map(|(name, _)| name.clone()));
        self.params = params;
        self.param_types = param_types;
    }
}

/// Whether a class descriptor has been backed by a class-defining record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefinitionStatus {
    /// Created because a method named it before its definition was seen.
    Provisional,
    Confirmed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDescriptor {
    pub name: String,
    pub c_name: String,
    pub module: Option<String>,
    pub parents: Vec<String>,
    pub fields: Vec<(String, String)>,
    pub comments: Vec<String>,
    pub methods: BTreeMap<String, FunctionDescriptor>,
    pub status: DefinitionStatus,
}

impl ClassDescriptor {
    /// Placeholder for a class only known from a method's `of-object`.
    /// `Gtk`-prefixed names lose the prefix and are assumed to live in `Gtk`.
    pub fn provisional(c_name: &str) -> Self {
        let (name, module) = match c_name.strip_prefix("Gtk") {
            Some(rest) => (rest.to_string(), Some("Gtk".to_string())),
            None => (c_name.to_string(), None),
        };
        Self {
            name,
            c_name: c_name.to_string(),
            module,
            parents: Vec::new(),
            fields: Vec::new(),
            comments: Vec::new(),
            methods: BTreeMap::new(),
            status: DefinitionStatus::Provisional,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == DefinitionStatus::Confirmed
    }
}

/// Class-defining data applied when a class record is processed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassDefinition {
    pub name: String,
    pub module: Option<String>,
    pub parents: Vec<String>,
    pub fields: Vec<(String, String)>,
    pub comments: Vec<String>,
}

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

/// What a native (C-level) identifier refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeRef {
    Class(String),
    Function(String),
    Method { class: String, method: String },
}

/// A new definition replaces an existing one only when the existing rendered
/// parameter list is not longer than the new explicit list plus one.
fn accepts(existing: Option<&FunctionDescriptor>, new: &FunctionDescriptor) -> bool {
    existing.map_or(true, |e| e.params.len() <= new.explicit_param_count() + 1)
}

/// All descriptors of one module.
///
/// Classes are stored once, keyed by native name. Functions are keyed by
/// display name, constants by name. The native-id table points into these
/// stores by key and never holds descriptor copies; the display-name view
/// is derived on demand.
#[derive(Clone, Debug, Default)]
pub struct Namespace {
    classes: BTreeMap<String, ClassDescriptor>,
    functions: BTreeMap<String, FunctionDescriptor>,
    constants: BTreeMap<String, String>,
    native_ids: HashMap<String, NativeRef>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty() && self.constants.is_empty()
    }

    pub fn class(&self, c_name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(c_name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    /// Pre-rendered `name = value` lines keyed by name.
    pub fn constants(&self) -> impl Iterator<Item = (&String, &String)> {
        self.constants.iter()
    }

    /// Display name for a native class name, if the class is known.
    pub fn display_name_of(&self, c_name: &str) -> Option<&str> {
        self.classes.get(c_name).map(|c| c.name.as_str())
    }

    /// Every display name currently in use (class names, function names,
    /// constant names).
    pub fn display_names(&self) -> HashSet<&str> {
        self.classes
            .values()
            .map(|c| c.name.as_str())
            .chain(self.functions.keys().map(String::as_str))
            .chain(self.constants.keys().map(String::as_str))
            .collect()
    }

    pub fn contains_display_name(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || self.constants.contains_key(name)
            || self.classes.values().any(|c| c.name == name)
    }

    pub fn resolve_native(&self, native_id: &str) -> Option<&NativeRef> {
        self.native_ids.get(native_id)
    }

    /// Apply a class-defining record. An existing (usually provisional)
    /// descriptor is updated in place so its methods survive.
    pub fn confirm_class(&mut self, c_name: &str, def: ClassDefinition) -> &mut ClassDescriptor {
        self.native_ids
            .insert(c_name.to_string(), NativeRef::Class(c_name.to_string()));
        let class = self
            .classes
            .entry(c_name.to_string())
            .or_insert_with(|| ClassDescriptor::provisional(c_name));
        class.name = def.name;
        class.module = def.module;
        class.parents = def.parents;
        class.fields = def.fields;
        class.comments = def.comments;
        class.status = DefinitionStatus::Confirmed;
        class
    }

    /// The class with this native name, creating a provisional one if it has
    /// not been seen yet.
    pub fn class_or_placeholder(&mut self, c_name: &str) -> &mut ClassDescriptor {
        if !self.classes.contains_key(c_name) {
            self.native_ids
                .insert(c_name.to_string(), NativeRef::Class(c_name.to_string()));
        }
        self.classes
            .entry(c_name.to_string())
            .or_insert_with(|| ClassDescriptor::provisional(c_name))
    }

    /// Add a free function under the conflict policy. Returns whether it was
    /// accepted.
    pub fn add_function(&mut self, function: FunctionDescriptor, native_id: Option<&str>) -> bool {
        if !accepts(self.functions.get(&function.name), &function) {
            return false;
        }
        if let Some(id) = native_id {
            self.native_ids
                .insert(id.to_string(), NativeRef::Function(function.name.clone()));
        }
        self.functions.insert(function.name.clone(), function);
        true
    }

    /// Add a method to the class with native name `class_c_name` (created
    /// provisionally if needed) under the conflict policy.
    pub fn add_method(
        &mut self,
        class_c_name: &str,
        method: FunctionDescriptor,
        native_id: Option<&str>,
    ) -> bool {
        let class = self.class_or_placeholder(class_c_name);
        if !accepts(class.methods.get(&method.name), &method) {
            return false;
        }
        let method_name = method.name.clone();
        class.methods.insert(method_name.clone(), method);
        if let Some(id) = native_id {
            self.native_ids.insert(
                id.to_string(),
                NativeRef::Method {
                    class: class_c_name.to_string(),
                    method: method_name,
                },
            );
        }
        true
    }

    pub fn add_constant(&mut self, name: impl Into<String>, line: impl Into<String>) {
        self.constants.insert(name.into(), line.into());
    }

    /// The function or method a native id was registered for.
    pub fn callable_mut(&mut self, native_id: &str) -> Option<&mut FunctionDescriptor> {
        match self.native_ids.get(native_id)? {
            NativeRef::Class(_) => None,
            NativeRef::Function(name) => self.functions.get_mut(name),
            NativeRef::Method { class, method } => {
                self.classes.get_mut(class)?.methods.get_mut(method)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of generating one module, returned to Python callers.
#[pyclass(frozen, get_all)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleReport {
    pub module: String,
    pub output_path: Option<String>,
    pub classes: usize,
    pub functions: usize,
    pub constants: usize,
    /// Set when a fatal error aborted this module.
    pub error: Option<String>,
}

#[pymethods]
impl ModuleReport {
    fn __repr__(&self) -> String {
        format!(
            "ModuleReport(module={:?}, output_path={:?}, classes={}, functions={}, constants={}, error={:?})",
            self.module, self.output_path, self.classes, self.functions, self.constants, self.error,
        )
    }
}
