//! Renders a [`Namespace`] as Python interface-stub source.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::errors::PistubResult;
use crate::generator::types::{display_name, placeholder_value, Placeholder};
use crate::models::{ClassDescriptor, FunctionDescriptor, Namespace, CONSTRUCTOR};

const INDENT: &str = "  ";

/// `"""..."""` block at `pad`, one docstring line per entry.
fn doc_block(pad: &str, lines: &[String]) -> String {
    format!("{pad}\"\"\"{}\"\"\"", lines.join(&format!("\n{pad}")))
}

pub fn render_function(function: &FunctionDescriptor, ns: &Namespace) -> String {
    let pad = INDENT.repeat(function.indent);
    let body_pad = INDENT.repeat(function.indent + 1);

    let mut lines = Vec::new();
    if !function.param_types.is_empty() {
        lines.push("Parameter types:".to_string());
        for (name, tag) in &function.param_types {
            let mut shown = display_name(tag, ns);
            if !tag.starts_with('!') {
                shown.push_str(&format!(" (C type: {tag})"));
            }
            lines.push(format!("     {name} -- {shown}"));
        }
    }
    lines.extend(function.comments.iter().cloned());

    let body = if function.name == CONSTRUCTOR {
        "return self".to_string()
    } else {
        match placeholder_value(&function.returns, ns) {
            Placeholder::Value(value) => format!("return {value}"),
            Placeholder::Nothing => "pass".to_string(),
        }
    };

    let mut out = format!("{pad}def {}({}):\n", function.name, function.params.join(", "));
    if !lines.is_empty() {
        out.push_str(&doc_block(&body_pad, &lines));
        out.push('\n');
    }
    out.push_str(&body_pad);
    out.push_str(&body);
    out
}

pub fn render_class(class: &ClassDescriptor, ns: &Namespace) -> String {
    if !class.is_confirmed() {
        warn!(class = %class.c_name, "no class definition found");
    }

    let bases: Vec<&str> = class
        .parents
        .iter()
        .filter_map(|parent| ns.display_name_of(parent))
        .collect();
    let mut out = if bases.is_empty() {
        format!("class {}:", class.name)
    } else {
        format!("class {}({}):", class.name, bases.join(", "))
    };
    if !class.comments.is_empty() {
        out.push('\n');
        out.push_str(&doc_block(INDENT, &class.comments));
    }

    // The default constructor only exists in the output.
    let default_ctor;
    let mut methods: Vec<&FunctionDescriptor> = class.methods.values().collect();
    if !class.methods.contains_key(CONSTRUCTOR) {
        default_ctor = FunctionDescriptor::method(
            CONSTRUCTOR,
            Vec::new(),
            Vec::new(),
            class.c_name.clone(),
            vec!["Constructor".to_string()],
        );
        methods.push(&default_ctor);
        methods.sort_by(|a, b| a.name.cmp(&b.name));
    }

    for method in methods {
        out.push_str("\n\n");
        out.push_str(&render_function(method, ns));
    }
    out
}

/// Full stub text. Classes (by native name), functions and constants are
/// sorted together by their namespace keys.
pub fn render_module(ns: &Namespace) -> String {
    let mut entries: Vec<(&str, String)> = Vec::new();
    entries.extend(ns.classes().map(|c| (c.c_name.as_str(), render_class(c, ns))));
    entries.extend(ns.functions().map(|f| (f.name.as_str(), render_function(f, ns))));
    entries.extend(ns.constants().map(|(name, line)| (name.as_str(), line.clone())));
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (_, text) in entries {
        let head = text.trim_start();
        if head.starts_with("class") || head.starts_with("def") {
            out.push('\n');
        }
        out.push_str(&text);
        out.push('\n');
    }
    out
}

/// `gtk.gdk` → `<output_dir>/gtk/gdk.pi`.
pub fn output_path(output_dir: &Path, module: &str) -> PathBuf {
    let mut path = output_dir.to_path_buf();
    let mut parts: Vec<&str> = module.split('.').collect();
    let last = parts.pop().unwrap_or(module);
    path.extend(parts);
    path.push(format!("{last}.pi"));
    path
}

/// Render and write the stub for `module`, replacing any existing file.
pub fn write_module(ns: &Namespace, output_dir: &Path, module: &str) -> PistubResult<PathBuf> {
    let path = output_path(output_dir, module);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_module(ns))?;
    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocUrlStyle;
    use crate::defs::parser::normalize;
    use crate::defs::reader::read_forms;
    use crate::generator::builder::NamespaceBuilder;
    use crate::models::ClassDefinition;

    fn build(src: &str) -> Namespace {
        let path = Path::new("test.defs");
        let records: Vec<_> = read_forms(src, path)
            .unwrap()
            .iter()
            .map(|t| normalize(&t.expr, path, t.line).unwrap())
            .collect();
        let mut ns = Namespace::new();
        NamespaceBuilder::new(&mut ns, DocUrlStyle::PyGtk)
            .apply_all(&records)
            .unwrap();
        ns
    }

    fn confirm(ns: &mut Namespace, c_name: &str, name: &str, parents: &[&str]) {
        ns.confirm_class(
            c_name,
            ClassDefinition {
                name: name.into(),
                parents: parents.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
        );
    }

    #[test]
    fn gtk_widget_show_stub() {
        let ns = build(
            r#"(define-function "gtk_widget_show" (c-name "gtk_widget_show") (return-type "none") (parameters '("GtkWidget*" "widget")))"#,
        );
        let text = render_function(ns.function("gtk_widget_show").unwrap(), &ns);
        assert_eq!(
            text,
            "def gtk_widget_show(widget):\n  \"\"\"Parameter types:\n       widget -- instance of GtkWidget (C type: GtkWidget*)\n  C impl: gtk_widget_show()\"\"\"\n  pass"
        );
    }

    #[test]
    fn explicit_tags_have_no_c_type_note() {
        let ns = Namespace::new();
        let f = FunctionDescriptor::function(
            "pos",
            vec![("x".into(), "!integer".into())],
            vec!["x".into()],
            "!tuple(integer, integer)",
            vec![],
        );
        assert_eq!(
            render_function(&f, &ns),
            "def pos(x):\n  \"\"\"Parameter types:\n       x -- integer\"\"\"\n  return ()"
        );
    }

    #[test]
    fn function_without_lines_has_no_docstring() {
        let ns = Namespace::new();
        let f = FunctionDescriptor::function("count", vec![], vec![], "gint", vec![]);
        assert_eq!(render_function(&f, &ns), "def count():\n  return 0");
    }

    #[test]
    fn default_constructor_is_synthesized() {
        let mut ns = Namespace::new();
        confirm(&mut ns, "GtkLabel", "Label", &[]);
        let class = ns.class("GtkLabel").unwrap();
        assert_eq!(
            render_class(class, &ns),
            "class Label:\n\n  def __init__(self):\n    \"\"\"Constructor\"\"\"\n    return self"
        );
        assert!(class.methods.is_empty());
    }

    #[test]
    fn bases_skip_unknown_parents() {
        let mut ns = Namespace::new();
        confirm(&mut ns, "GtkWidget", "Widget", &[]);
        confirm(&mut ns, "GtkButton", "Button", &["GtkWidget", "AtkImplementor"]);
        let text = render_class(ns.class("GtkButton").unwrap(), &ns);
        assert!(text.starts_with("class Button(Widget):\n"));
    }

    #[test]
    fn methods_are_sorted_with_constructor() {
        let mut ns = Namespace::new();
        confirm(&mut ns, "GtkLabel", "Label", &[]);
        for name in ["set_text", "get_text"] {
            ns.add_method(
                "GtkLabel",
                FunctionDescriptor::method(name, vec![], vec![], "none", vec![]),
                None,
            );
        }
        let text = render_class(ns.class("GtkLabel").unwrap(), &ns);
        let order: Vec<&str> = text
            .lines()
            .filter_map(|l| l.trim().strip_prefix("def "))
            .collect();
        assert_eq!(order, vec!["__init__(self):", "get_text(self):", "set_text(self):"]);
    }

    #[test]
    fn mixed_entries_sort_alphabetically() {
        let mut ns = Namespace::new();
        for name in ["Zeta", "Alpha", "Mu"] {
            confirm(&mut ns, &format!("C{name}"), name, &[]);
        }
        for name in ["zfunc", "afunc"] {
            ns.add_function(
                FunctionDescriptor::function(name, vec![], vec![], "none", vec![]),
                None,
            );
        }
        let text = render_module(&ns);
        let heads: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("class") || l.starts_with("def"))
            .collect();
        assert_eq!(
            heads,
            vec!["class Alpha:", "class Mu:", "class Zeta:", "def afunc():", "def zfunc():"]
        );
    }

    #[test]
    fn classes_sort_by_native_name() {
        let mut ns = Namespace::new();
        confirm(&mut ns, "GtkWidget", "Widget", &[]);
        confirm(&mut ns, "GdkColor", "Color", &[]);
        ns.add_constant("HAS_FOCUS", "HAS_FOCUS = 1");
        let text = render_module(&ns);
        let heads: Vec<&str> = text.lines().filter(|l| !l.is_empty() && !l.starts_with(' ')).collect();
        assert_eq!(heads, vec!["class Color:", "class Widget:", "HAS_FOCUS = 1"]);
    }

    #[test]
    fn module_layout() {
        let mut ns = Namespace::new();
        ns.add_constant("STATE_NORMAL", "STATE_NORMAL = 0");
        ns.add_function(
            FunctionDescriptor::function("main", vec![], vec![], "none", vec![]),
            None,
        );
        assert_eq!(render_module(&ns), "STATE_NORMAL = 0\n\ndef main():\n  pass\n");
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut ns = build(
            r#"
(define-object Button (in-module "Gtk") (parent "GtkBin") (c-name "GtkButton"))
(define-method clicked (of-object "GtkButton") (c-name "gtk_button_clicked") (return-type "none"))
(define-method frob (of-object "GtkFrob") (c-name "gtk_frob_frob") (return-type "gint"))
"#,
        );
        ns.add_constant("RELIEF_NONE", "RELIEF_NONE = 2");
        let first = render_module(&ns);
        let second = render_module(&ns);
        assert_eq!(first, second);
        assert!(ns.class("GtkButton").unwrap().methods.get(CONSTRUCTOR).is_none());
    }

    #[test]
    fn output_paths() {
        assert_eq!(
            output_path(Path::new("/out"), "gtk.gdk"),
            PathBuf::from("/out/gtk/gdk.pi")
        );
        assert_eq!(output_path(Path::new("/out"), "atk"), PathBuf::from("/out/atk.pi"));
    }

    #[test]
    fn write_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut ns = Namespace::new();
        ns.add_constant("A", "A = 1");
        let path = write_module(&ns, dir.path(), "gnome.ui").unwrap();
        assert_eq!(path, dir.path().join("gnome").join("ui.pi"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A = 1\n");

        ns.add_constant("B", "B = 2");
        write_module(&ns, dir.path(), "gnome.ui").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A = 1\nB = 2\n");
    }
}
