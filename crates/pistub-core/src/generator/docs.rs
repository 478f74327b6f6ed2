//! Best-effort documentation links for generated classes and methods.
//!
//! Links are only reliably right for the `gtk` module; other modules often
//! land on a missing page.

use crate::config::DocUrlStyle;
use crate::models::CONSTRUCTOR;

/// URL for a class (or one of its methods). `method` is the display method
/// name for the PyGTK style and the native function name for the GNOME
/// style. No module means no URL.
pub fn doc_url(
    style: DocUrlStyle,
    module: Option<&str>,
    class_c_name: &str,
    method: Option<&str>,
) -> Option<String> {
    let module = module?;
    let base = style.base_url();

    let url = match style {
        DocUrlStyle::PyGtk => {
            let class = class_c_name.to_lowercase();
            match method {
                Some(CONSTRUCTOR) => format!("{base}/class-{class}.html#constructor-{class}"),
                Some(m) => format!(
                    "{base}/class-{class}.html#method-{class}--{}",
                    m.to_lowercase().replace('_', "-")
                ),
                None => format!("{base}/class-{class}.html"),
            }
        }
        DocUrlStyle::Gnome => {
            let mut url_mod = module.to_lowercase();
            if url_mod == "g" {
                url_mod = "gobject".to_string();
            }
            match method {
                Some(m) => format!("{base}/{url_mod}/{class_c_name}.html#{}", m.replace('_', "-")),
                None => format!("{base}/{url_mod}/{class_c_name}.html"),
            }
        }
    };
    Some(url)
}

/// The `Docs:` comment line, if a URL can be built.
pub fn doc_line(
    style: DocUrlStyle,
    module: Option<&str>,
    class_c_name: &str,
    method: Option<&str>,
) -> Option<String> {
    doc_url(style, module, class_c_name, method).map(|url| format!("Docs: {url}"))
}
