//! Tokenizer for the defs s-expression language.
//!
//! Defs files are a small Scheme dialect: parenthesized lists, double-quoted
//! strings, bare atoms (`define-object`, `#t`, `GtkWidget*`), the quote
//! prefix `'` and `;` line comments.

use logos::Logos;

/// Byte-offset span within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

fn unescape(lex: &mut logos::Lexer<Token>) -> String {
    let raw = lex.slice();
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+", skip r";[^\n]*")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("'")]
    Quote,
    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    Str(String),
    #[regex(r#"[^ \t\r\n\f()'";]+"#, |lex| lex.slice().to_owned())]
    Atom(String),

    /// Invalid / unrecognised byte sequence (e.g. an unterminated string).
    Error,
}

/// Lex `source` into (token, span) pairs. Invalid input produces
/// [`Token::Error`] rather than stopping the scan.
pub fn lex(source: &str) -> Vec<(Token, Span)> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| {
            let tok = result.unwrap_or(Token::Error);
            (
                tok,
                Span {
                    start: span.start,
                    end: span.end,
                },
            )
        })
        .collect()
}

/// 1-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        lex(src).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn define_form() {
        assert_eq!(
            tokens("(define-object Widget (c-name \"GtkWidget\"))"),
            vec![
                Token::LParen,
                Token::Atom("define-object".into()),
                Token::Atom("Widget".into()),
                Token::LParen,
                Token::Atom("c-name".into()),
                Token::Str("GtkWidget".into()),
                Token::RParen,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn quote_and_pointer_atoms() {
        assert_eq!(
            tokens("'(\"GtkWidget*\" widget) #t"),
            vec![
                Token::Quote,
                Token::LParen,
                Token::Str("GtkWidget*".into()),
                Token::Atom("widget".into()),
                Token::RParen,
                Token::Atom("#t".into()),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let src = "; -*- scheme -*-\n(include \"gtk-types.defs\") ; trailing\n";
        assert_eq!(
            tokens(src),
            vec![
                Token::LParen,
                Token::Atom("include".into()),
                Token::Str("gtk-types.defs".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokens(r#""say \"hi\"\n""#),
            vec![Token::Str("say \"hi\"\n".into())]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        assert!(tokens("(c-name \"GtkWidget)").contains(&Token::Error));
    }

    #[test]
    fn line_numbers() {
        let src = "a\nb\nc";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 2), 2);
        assert_eq!(line_of(src, 4), 3);
        assert_eq!(line_of(src, 100), 3);
    }
}
