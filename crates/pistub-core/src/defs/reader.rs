//! Builds nested [`SExpr`] trees from the token stream.

use std::path::Path;

use crate::defs::lexer::{lex, line_of, Token};
use crate::errors::{PistubError, PistubResult};

/// A node of the parsed defs tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SExpr {
    Atom(String),
    Str(String),
    List(Vec<SExpr>),
}

impl SExpr {
    /// Text of an atom or string; `None` for lists.
    pub fn text(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) | SExpr::Str(s) => Some(s),
            SExpr::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Head symbol of a list form, e.g. `define-object` or `default`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.text()
    }

    /// Rendered back to defs syntax; used in error messages.
    pub fn render(&self) -> String {
        match self {
            SExpr::Atom(s) => s.clone(),
            SExpr::Str(s) => format!("{s:?}"),
            SExpr::List(items) => {
                let inner: Vec<String> = items.iter().map(SExpr::render).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

/// A top-level form together with the line it starts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopLevel {
    pub line: usize,
    pub expr: SExpr,
}

/// Read every top-level form from `source`. `path` is only used for error
/// reporting.
pub fn read_forms(source: &str, path: &Path) -> PistubResult<Vec<TopLevel>> {
    let mut stack: Vec<(usize, Vec<SExpr>)> = Vec::new();
    let mut top = Vec::new();

    for (token, span) in lex(source) {
        let mut start = span.start;
        let node = match token {
            Token::LParen => {
                stack.push((span.start, Vec::new()));
                continue;
            }
            Token::RParen => match stack.pop() {
                Some((open, items)) => {
                    start = open;
                    SExpr::List(items)
                }
                None => {
                    return Err(PistubError::parse(
                        path,
                        line_of(source, span.start),
                        "unexpected ')'",
                    ))
                }
            },
            // Quoted lists read the same as plain ones.
            Token::Quote => continue,
            Token::Str(s) => SExpr::Str(s),
            Token::Atom(s) => SExpr::Atom(s),
            Token::Error => {
                return Err(PistubError::parse(
                    path,
                    line_of(source, span.start),
                    format!("invalid token {:?}", &source[span.start..span.end]),
                ))
            }
        };
        match stack.last_mut() {
            Some((_, items)) => items.push(node),
            None => top.push(TopLevel {
                line: line_of(source, start),
                expr: node,
            }),
        }
    }

    if let Some((start, _)) = stack.last() {
        return Err(PistubError::parse(
            path,
            line_of(source, *start),
            "unclosed '('",
        ));
    }
    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(src: &str) -> PistubResult<Vec<SExpr>> {
        read_forms(src, Path::new("test.defs")).map(|forms| forms.into_iter().map(|f| f.expr).collect())
    }

    #[test]
    fn nested_lists() {
        let forms = read("(define-method show (of-object \"GtkWidget\") (parameters '(\"int\" \"x\")))")
            .unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].head(), Some("define-method"));
        let items = forms[0].as_list().unwrap();
        assert_eq!(items[1], SExpr::Atom("show".into()));
        assert_eq!(
            items[3],
            SExpr::List(vec![
                SExpr::Atom("parameters".into()),
                SExpr::List(vec![SExpr::Str("int".into()), SExpr::Str("x".into())]),
            ])
        );
    }

    #[test]
    fn multiple_top_level_forms() {
        let forms = read("(a) (b \"c\")\n()").unwrap();
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[2], SExpr::List(vec![]));
    }

    #[test]
    fn top_level_lines() {
        let forms = read_forms("(a)\n\n(b\n c)", Path::new("x.defs")).unwrap();
        assert_eq!(forms[0].line, 1);
        assert_eq!(forms[1].line, 3);
    }

    #[test]
    fn unclosed_paren_reports_line() {
        let err = read("(a)\n(b\n").unwrap_err();
        match err {
            PistubError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("unclosed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stray_close_paren() {
        assert!(matches!(read("(a))"), Err(PistubError::Parse { .. })));
    }

    #[test]
    fn render_round_trips_for_messages() {
        let forms = read("(c-name \"gtk_main\")").unwrap();
        assert_eq!(forms[0].render(), "(c-name \"gtk_main\")");
    }
}
