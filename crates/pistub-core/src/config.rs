//! Generator configuration: documentation URL style, the module list and
//! environment overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{PistubError, PistubResult};

pub const PYGTK_DOC_BASE_URL: &str = "http://www.pygtk.org/docs/pygtk";
pub const GNOME_DOC_BASE_URL: &str = "http://developer.gnome.org/doc/API/2.0";

/// Which documentation site `Docs:` lines point at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocUrlStyle {
    #[default]
    PyGtk,
    Gnome,
}

impl DocUrlStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pygtk" => Some(DocUrlStyle::PyGtk),
            "gnome" => Some(DocUrlStyle::Gnome),
            _ => None,
        }
    }

    /// `PISTUB_DOC_STYLE`, falling back to the PyGTK reference.
    pub fn from_env() -> Self {
        match std::env::var("PISTUB_DOC_STYLE") {
            Ok(val) => Self::parse(&val).unwrap_or_default(),
            Err(_) => DocUrlStyle::default(),
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            DocUrlStyle::PyGtk => PYGTK_DOC_BASE_URL,
            DocUrlStyle::Gnome => GNOME_DOC_BASE_URL,
        }
    }
}

/// Settings shared by every module of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub doc_style: DocUrlStyle,
    /// Whether to import the target module to harvest enum/flag constants.
    pub introspect: bool,
    /// Extra directories put on the interpreter's module search path.
    pub search_paths: Vec<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            doc_style: DocUrlStyle::default(),
            introspect: true,
            search_paths: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Self {
        Self {
            doc_style: DocUrlStyle::from_env(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Module list
// ---------------------------------------------------------------------------

/// A logical module and the defs files describing it.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ModuleSpec {
    pub module: String,
    #[serde(rename = "defs")]
    pub defs_files: Vec<PathBuf>,
}

/// Modules of pygtk, gnome-python, gnome-python-desktop and
/// gnome-python-extras, with defs paths relative to the source tree.
const DEFAULT_MODULES: &[(&str, &[&str])] = &[
    // pygtk
    (
        "gtk._gtk",
        &["gtk/gtk-base.defs", "gtk/gtk-2.10.defs", "gtk/gtk.defs"],
    ),
    (
        "gtk.gdk",
        &["gtk/gdk-base.defs", "gtk/gdk-2.10.defs", "gtk/gdk.defs"],
    ),
    ("gtk.glade", &["gtk/libglade.defs"]),
    ("atk", &["atk.defs"]),
    ("pango", &["pango.defs"]),
    ("pangocairo", &["pangocairo.defs"]),
    // gnome-python
    ("gnome._gnome", &["gnome/gnome.defs"]),
    ("gnome.ui", &["ui.defs"]),
    ("gconf", &["gconf/gconf.defs"]),
    ("gnomecanvas", &["gnomecanvas/canvas.defs"]),
    // gnome-python-desktop
    ("gnomeapplet", &["gnomeapplet/applet.defs"]),
    (
        "gnomedesktop._gnomedesktop",
        &["gnomedesktop/_gnomedesktop.defs"],
    ),
    ("gnomekeyring", &["gnomekeyring/gnomekeyring.defs"]),
    ("gnomeprint._print", &["gnomeprint/print.defs"]),
    ("gnomeprint.ui", &["gnomeprint/printui.defs"]),
    ("gtksourceview", &["gtksourceview/gtksourceview.defs"]),
    ("mediaprofiles", &["mediaprofiles/mediaprofiles.defs"]),
    ("metacity", &["metacity/metacity.defs"]),
    ("nautilusburn", &["nautilusburn/nautilus_burn.defs"]),
    ("rsvg", &["rsvg/rsvg.defs"]),
    ("totem.plparser", &["totem/plparser.defs"]),
    ("wnck", &["wnck/wnck.defs"]),
    // gnome-python-extras
    ("egg.tray", &["egg/tray/trayicon.defs"]),
    ("egg.recent", &["egg/recent/eggrecent.defs"]),
    ("gda", &["gda/gda.defs"]),
    ("gdl", &["gdl/gdl.defs"]),
    ("gksu._gksu", &["gksu/gksu.defs"]),
    ("gksu.ui", &["gksu/gksuui.defs"]),
    ("gtkhtml2", &["gtkhtml2/gtkhtml2.defs"]),
    ("gtkmozembed", &["gtkmozembed/gtkmozembed.defs"]),
    ("gtkspell", &["gtkspell/gtkspell.defs"]),
];

/// The built-in module list rooted at `source_dir`.
pub fn default_module_list(source_dir: &Path) -> Vec<ModuleSpec> {
    DEFAULT_MODULES
        .iter()
        .map(|(module, defs)| ModuleSpec {
            module: module.to_string(),
            defs_files: defs.iter().map(|d| source_dir.join(d)).collect(),
        })
        .collect()
}

/// Load a JSON module list (`[{"module": ..., "defs": [...]}]`). Relative
/// defs paths are resolved against `source_dir`.
pub fn load_module_list(list_path: &Path, source_dir: &Path) -> PistubResult<Vec<ModuleSpec>> {
    let text = std::fs::read_to_string(list_path)?;
    let specs: Vec<ModuleSpec> = serde_json::from_str(&text)?;
    specs
        .into_iter()
        .map(|spec| {
            if spec.module.trim().is_empty() {
                return Err(PistubError::Config(format!(
                    "empty module name in {}",
                    list_path.display()
                )));
            }
            Ok(ModuleSpec {
                defs_files: spec
                    .defs_files
                    .iter()
                    .map(|d| source_dir.join(d))
                    .collect(),
                module: spec.module,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_style_parse() {
        assert_eq!(DocUrlStyle::parse("gnome"), Some(DocUrlStyle::Gnome));
        assert_eq!(DocUrlStyle::parse(" PyGTK "), Some(DocUrlStyle::PyGtk));
        assert_eq!(DocUrlStyle::parse("devhelp"), None);
        assert_eq!(DocUrlStyle::Gnome.base_url(), GNOME_DOC_BASE_URL);
    }

    #[test]
    fn default_list_is_rooted() {
        let list = default_module_list(Path::new("/src/pygtk"));
        let gtk = list.iter().find(|m| m.module == "gtk._gtk").unwrap();
        assert_eq!(gtk.defs_files[0], PathBuf::from("/src/pygtk/gtk/gtk-base.defs"));
        assert_eq!(gtk.defs_files.len(), 3);
        assert!(list.iter().any(|m| m.module == "gtkspell"));
    }

    #[test]
    fn json_module_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("modules.json");
        std::fs::write(
            &list,
            r#"[{"module": "foo.bar", "defs": ["foo/bar.defs", "/abs/extra.defs"]}]"#,
        )
        .unwrap();
        let specs = load_module_list(&list, Path::new("/src")).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].module, "foo.bar");
        assert_eq!(
            specs[0].defs_files,
            vec![PathBuf::from("/src/foo/bar.defs"), PathBuf::from("/abs/extra.defs")]
        );
    }

    #[test]
    fn json_module_list_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("modules.json");
        std::fs::write(&list, r#"[{"module": " ", "defs": []}]"#).unwrap();
        assert!(matches!(
            load_module_list(&list, dir.path()),
            Err(PistubError::Config(_))
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("modules.json");
        std::fs::write(&list, "{not json").unwrap();
        assert!(matches!(
            load_module_list(&list, dir.path()),
            Err(PistubError::Json(_))
        ));
    }
}
