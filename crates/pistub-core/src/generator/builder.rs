//! Applies normalized definition records to a [`Namespace`].

use tracing::{debug, warn};

use crate::config::DocUrlStyle;
use crate::defs::reader::SExpr;
use crate::errors::{PistubError, PistubResult};
use crate::generator::docs::doc_line;
use crate::generator::types::{NONE_TAG, UNSPECIFIED_TAG};
use crate::models::{
    ClassDefinition, DefKind, DefinitionRecord, FunctionDescriptor, Namespace, CONSTRUCTOR,
};

/// Translate a C default-value literal into stub syntax.
pub fn translate_default(value: &str) -> String {
    if value == "NULL" {
        "None".to_string()
    } else if let Some(rest) = value.strip_prefix("GDK_") {
        rest.to_string()
    } else if let Some(rest) = value.strip_prefix("GTK_") {
        rest.to_string()
    } else if value.eq_ignore_ascii_case("true") {
        "1".to_string()
    } else if value.eq_ignore_ascii_case("false") {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Some defs entries carry function-pointer or pointer syntax in the name.
fn clean_arg_name(raw: &str) -> String {
    let name = raw.trim();
    let name = name.strip_prefix("(*").unwrap_or(name);
    let name = name.strip_prefix('*').unwrap_or(name);
    name.to_string()
}

/// `(type name [(default value)] ...)` entries into (name, type) pairs and
/// rendered parameter strings.
fn parse_parameters(values: &[SExpr], owner: &str) -> (Vec<(String, String)>, Vec<String>) {
    let mut param_types = Vec::new();
    let mut params = Vec::new();
    for value in values {
        let entry = match value.as_list() {
            Some(items) if items.len() >= 2 => items,
            _ => {
                warn!("Skipping malformed parameter {} of {owner}", value.render());
                continue;
            }
        };
        let (Some(ctype), Some(raw_name)) = (entry[0].text(), entry[1].text()) else {
            warn!("Skipping malformed parameter {} of {owner}", value.render());
            continue;
        };
        let arg_name = clean_arg_name(raw_name);
        let default = entry[2..]
            .iter()
            .find(|extra| extra.head() == Some("default"))
            .and_then(|extra| extra.as_list()?.last()?.text());

        param_types.push((arg_name.clone(), ctype.trim().to_string()));
        match default {
            Some(d) => params.push(format!("{arg_name}={}", translate_default(d.trim()))),
            None => params.push(arg_name),
        }
    }
    (param_types, params)
}

/// Builds the namespace of one module, record by record.
pub struct NamespaceBuilder<'a> {
    ns: &'a mut Namespace,
    doc_style: DocUrlStyle,
}

impl<'a> NamespaceBuilder<'a> {
    pub fn new(ns: &'a mut Namespace, doc_style: DocUrlStyle) -> Self {
        Self { ns, doc_style }
    }

    pub fn apply_all(&mut self, records: &[DefinitionRecord]) -> PistubResult<()> {
        records.iter().try_for_each(|r| self.apply(r))
    }

    pub fn apply(&mut self, record: &DefinitionRecord) -> PistubResult<()> {
        if record.kind.is_class_like() {
            self.apply_class(record)
        } else {
            self.apply_callable(record)
        }
    }

    fn apply_class(&mut self, record: &DefinitionRecord) -> PistubResult<()> {
        let c_name = record
            .first_text("c-name")
            .ok_or_else(|| PistubError::MissingField {
                kind: record.kind.label().to_string(),
                name: record.name.clone(),
                field: "c-name",
            })?;
        let module = record.first_text("in-module").map(str::to_string);

        let mut parents: Vec<String> = record
            .first_text("parent")
            .map(str::to_string)
            .into_iter()
            .collect();
        parents.extend(
            record
                .values("implements")
                .iter()
                .filter_map(SExpr::text)
                .map(|s| s.trim().to_string()),
        );

        let fields = record
            .values("fields")
            .iter()
            .filter_map(|f| {
                let items = f.as_list()?;
                let ctype = items.first()?.text()?;
                let name = items.get(1)?.text()?;
                Some((name.trim().to_string(), ctype.trim().to_string()))
            })
            .collect();

        let comments = doc_line(self.doc_style, module.as_deref(), c_name, None)
            .into_iter()
            .collect();

        self.ns.confirm_class(
            c_name,
            ClassDefinition {
                name: record.name.clone(),
                module,
                parents,
                fields,
                comments,
            },
        );
        Ok(())
    }

    fn apply_callable(&mut self, record: &DefinitionRecord) -> PistubResult<()> {
        let mut kind = record.kind.clone();
        if !matches!(kind, DefKind::Function | DefKind::Method) {
            debug!("Ignoring define-{} {}", kind.label(), record.name);
            return Ok(());
        }

        let mut name = record.name.clone();
        let c_name = record.first_text("c-name");
        let (mut param_types, mut params) = parse_parameters(record.values("parameters"), &name);
        let mut returns = record
            .first_text("return-type")
            .unwrap_or(NONE_TAG)
            .to_string();

        let mut comments = Vec::new();
        if record.has("deprecated") {
            match record.first_text("deprecated") {
                Some(text) => comments.push(format!("Deprecated: {text}")),
                None => comments.push("Deprecated".to_string()),
            }
        }
        if let Some(c) = c_name {
            comments.push(format!("C impl: {c}()"));
        }

        let mut owner = record.first_text("of-object");
        if let Some(class) = record.first_text("is-constructor-of") {
            name = CONSTRUCTOR.to_string();
            kind = DefKind::Method;
            owner = Some(class);
            returns = class.to_string();
            // Property-based constructors take keyword arguments only.
            if record.has("properties") {
                let props: Vec<String> = record
                    .values("properties")
                    .iter()
                    .filter_map(|p| match p {
                        SExpr::List(items) => items.first()?.text(),
                        other => other.text(),
                    })
                    .map(|p| p.trim().to_string())
                    .collect();
                param_types = props
                    .iter()
                    .map(|p| (p.clone(), UNSPECIFIED_TAG.to_string()))
                    .collect();
                params = props;
            }
        }

        if kind == DefKind::Function {
            let function = FunctionDescriptor::function(name, param_types, params, returns, comments);
            self.ns.add_function(function, c_name);
            return Ok(());
        }

        let owner = owner.ok_or_else(|| PistubError::MissingField {
            kind: kind.label().to_string(),
            name: record.name.clone(),
            field: "of-object",
        })?;
        let module = self.ns.class_or_placeholder(owner).module.clone();
        if let Some(c) = c_name {
            let doc_target = match self.doc_style {
                DocUrlStyle::PyGtk => name.as_str(),
                DocUrlStyle::Gnome => c,
            };
            if let Some(line) = doc_line(self.doc_style, module.as_deref(), owner, Some(doc_target)) {
                comments.push(line);
            }
        }
        let method = FunctionDescriptor::method(name, param_types, params, returns, comments);
        self.ns.add_method(owner, method, c_name);
        Ok(())
    }
}
