//! Defs file parsing: `include` expansion, `ifdef` splicing and
//! normalization of `define-*` forms into [`DefinitionRecord`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{info, warn};

use crate::defs::read_source;
use crate::defs::reader::{read_forms, SExpr, TopLevel};
use crate::errors::{PistubError, PistubResult};
use crate::models::{DefKind, DefinitionRecord};

fn cache_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Read forms of every defs file loaded during one generation run, keyed by
/// canonical path. Files included from several modules are read once.
#[derive(Debug, Default)]
pub struct ParseCache {
    forms: HashMap<PathBuf, Rc<Vec<TopLevel>>>,
    reads: usize,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forms of `path`, reading and parsing the file only on first use.
    pub fn load(&mut self, path: &Path) -> PistubResult<Rc<Vec<TopLevel>>> {
        let key = cache_key(path);
        if let Some(forms) = self.forms.get(&key) {
            return Ok(Rc::clone(forms));
        }
        let source = read_source(path)?;
        let forms = Rc::new(read_forms(&source, path)?);
        self.reads += 1;
        self.forms.insert(key, Rc::clone(&forms));
        Ok(forms)
    }

    /// Number of files actually read from disk.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.forms.contains_key(&cache_key(path))
    }
}

/// Expands one defs file (and everything it includes) into records, in
/// source order.
pub struct DefsParser<'a> {
    cache: &'a mut ParseCache,
    /// Files currently being expanded; an include of one of these is a cycle.
    active: Vec<PathBuf>,
}

impl<'a> DefsParser<'a> {
    pub fn new(cache: &'a mut ParseCache) -> Self {
        Self {
            cache,
            active: Vec::new(),
        }
    }

    pub fn parse_file(&mut self, path: &Path) -> PistubResult<Vec<DefinitionRecord>> {
        let mut records = Vec::new();
        self.parse_into(path, &mut records)?;
        Ok(records)
    }

    fn parse_into(&mut self, path: &Path, out: &mut Vec<DefinitionRecord>) -> PistubResult<()> {
        let key = cache_key(path);
        if self.active.contains(&key) {
            warn!(path = %path.display(), "Skipping cyclic include");
            return Ok(());
        }

        info!("Parsing defs file {}", path.display());
        let forms = self.cache.load(path)?;
        self.active.push(key);
        let result = forms
            .iter()
            .try_for_each(|top| self.expand(path, top.line, &top.expr, out));
        self.active.pop();
        result
    }

    fn expand(
        &mut self,
        path: &Path,
        line: usize,
        form: &SExpr,
        out: &mut Vec<DefinitionRecord>,
    ) -> PistubResult<()> {
        let items = form.as_list().ok_or_else(|| {
            PistubError::parse(path, line, format!("expected a list form, found {}", form.render()))
        })?;
        if items.is_empty() {
            return Ok(());
        }

        match items[0].text() {
            Some("include") => {
                let target = items.get(1).and_then(SExpr::text).ok_or_else(|| {
                    PistubError::parse(path, line, "include without a file name")
                })?;
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                self.parse_into(&dir.join(target), out)
            }
            // Conditions are not evaluated: every branch is active.
            Some("ifdef") | Some("ifndef") => {
                let body = match items.get(1) {
                    Some(SExpr::List(_)) => &items[1..],
                    _ => items.get(2..).unwrap_or(&[]),
                };
                body.iter()
                    .try_for_each(|child| self.expand(path, line, child, out))
            }
            _ => {
                out.push(normalize(form, path, line)?);
                Ok(())
            }
        }
    }
}

/// Turn a `(define-xxx name (tag value...)...)` form into a record.
pub fn normalize(form: &SExpr, path: &Path, line: usize) -> PistubResult<DefinitionRecord> {
    let bad = |message: String| PistubError::parse(path, line, message);

    let items = form
        .as_list()
        .ok_or_else(|| bad(format!("expected a list form, found {}", form.render())))?;
    let head = items
        .first()
        .and_then(SExpr::text)
        .ok_or_else(|| bad(format!("form without a head symbol: {}", form.render())))?;
    let kind = DefKind::from_head(head)
        .ok_or_else(|| bad(format!("unrecognized top-level form `{head}`")))?;
    let name = items
        .get(1)
        .and_then(SExpr::text)
        .ok_or_else(|| bad(format!("`{head}` without a name")))?;

    let mut record = DefinitionRecord::new(kind, name.trim());
    for child in &items[2..] {
        let tag = child
            .as_list()
            .and_then(|c| c.first())
            .and_then(SExpr::text)
            .ok_or_else(|| bad(format!("malformed entry {} in `{name}`", child.render())))?;
        let values = child.as_list().map(|c| &c[1..]).unwrap_or(&[]);
        record.push(tag, values.iter().cloned());
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn normalizes_define_forms() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.defs",
            r#"
(define-function gtk_widget_show
  (c-name "gtk_widget_show")
  (return-type "none")
  (parameters '("GtkWidget*" "widget")))
"#,
        );
        let mut cache = ParseCache::new();
        let records = DefsParser::new(&mut cache).parse_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.kind, DefKind::Function);
        assert_eq!(rec.name, "gtk_widget_show");
        assert_eq!(rec.first_text("return-type"), Some("none"));
        assert_eq!(rec.values("parameters").len(), 1);
    }

    #[test]
    fn repeated_tags_concatenate() {
        let form = read_forms(
            "(define-object Foo (implements \"A\") (implements \"B\" \"C\"))",
            Path::new("x.defs"),
        )
        .unwrap()
        .remove(0);
        let rec = normalize(&form.expr, Path::new("x.defs"), form.line).unwrap();
        let names: Vec<&str> = rec.values("implements").iter().filter_map(SExpr::text).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn latin1_comment_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gtk.defs");
        let mut bytes = b"; Copyright Jos".to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"\n(define-function gtk_main (c-name \"gtk_main\"))\n");
        fs::write(&path, bytes).unwrap();
        let mut cache = ParseCache::new();
        let records = DefsParser::new(&mut cache).parse_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "gtk_main");
    }

    #[test]
    fn include_is_relative_to_including_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("gtk")).unwrap();
        write(
            &dir.path().join("gtk"),
            "gtk-types.defs",
            "(define-object Widget (c-name \"GtkWidget\"))",
        );
        let main = write(
            &dir.path().join("gtk"),
            "gtk.defs",
            "(include \"gtk-types.defs\")\n(define-function gtk_main (c-name \"gtk_main\"))",
        );
        let mut cache = ParseCache::new();
        let records = DefsParser::new(&mut cache).parse_file(&main).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Widget", "gtk_main"]);
    }

    #[test]
    fn ifdef_branches_are_spliced() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.defs",
            r#"
(ifdef HAVE_GTK_2_10
  (define-function new_api (c-name "new_api"))
  (define-function other_api (c-name "other_api")))
(define-function base (c-name "base"))
"#,
        );
        let mut cache = ParseCache::new();
        let records = DefsParser::new(&mut cache).parse_file(&path).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new_api", "other_api", "base"]);
    }

    #[test]
    fn include_cycle_terminates_and_reads_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(
            dir.path(),
            "a.defs",
            "(include \"b.defs\")\n(define-function fa (c-name \"fa\"))",
        );
        write(
            dir.path(),
            "b.defs",
            "(include \"a.defs\")\n(define-function fb (c-name \"fb\"))",
        );
        let mut cache = ParseCache::new();
        let records = DefsParser::new(&mut cache).parse_file(&a).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["fb", "fa"]);
        assert_eq!(cache.reads(), 2);

        // A second pass is served from the cache.
        let again = DefsParser::new(&mut cache).parse_file(&a).unwrap();
        assert_eq!(again, records);
        assert_eq!(cache.reads(), 2);
        assert!(cache.contains(&a));
    }

    #[test]
    fn unrecognized_form_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.defs", "(define-object Ok (c-name \"X\"))\n(frobnicate 1)");
        let mut cache = ParseCache::new();
        let err = DefsParser::new(&mut cache).parse_file(&path).unwrap_err();
        match err {
            PistubError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("frobnicate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_atom_at_top_level_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.defs", "stray");
        let mut cache = ParseCache::new();
        assert!(matches!(
            DefsParser::new(&mut cache).parse_file(&path),
            Err(PistubError::Parse { .. })
        ));
    }

    #[test]
    fn missing_include_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.defs", "(include \"nope.defs\")");
        let mut cache = ParseCache::new();
        assert!(matches!(
            DefsParser::new(&mut cache).parse_file(&path),
            Err(PistubError::Io(_))
        ));
    }

    #[test]
    fn empty_forms_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.defs", "()\n(define-function f (c-name \"f\"))");
        let mut cache = ParseCache::new();
        let records = DefsParser::new(&mut cache).parse_file(&path).unwrap();
        assert_eq!(records.len(), 1);
    }
}
