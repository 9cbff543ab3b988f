//! Lossless C# syntax trees.
//!
//! [`SyntaxTree::parse`] never fails: malformed input yields a tree with
//! [`SyntaxError`]s attached. Rendering the token stream (trivia included)
//! reproduces the original text byte for byte, which is what lets repairs
//! edit text and reparse without disturbing anything they did not touch.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

use std::path::{Path, PathBuf};

use serde::Serialize;

pub use ast::{CompilationUnit, TokenRange};
pub use span::{LineIndex, LinePosition, Location, Span};
pub use token::{Token, TokenId, TokenKind, Trivia, TriviaKind};

/// A recoverable lexing or parsing problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

/// Line terminator style of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    Lf,
    CrLf,
}

impl Newline {
    pub fn as_str(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    path: PathBuf,
    text: String,
    tokens: Vec<Token>,
    root: CompilationUnit,
    line_index: LineIndex,
    errors: Vec<SyntaxError>,
}

impl SyntaxTree {
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let text = text.into();
        let lexed = lexer::lex(&text);
        let (root, parse_errors) = parser::parse(&text, &lexed.tokens);
        let mut errors = lexed.errors;
        errors.extend(parse_errors);
        let line_index = LineIndex::new(&text);
        Self {
            path,
            text,
            tokens: lexed.tokens,
            root,
            line_index,
            errors,
        }
    }

    /// Reparses new text under the same path.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::parse(self.path.clone(), text)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn root(&self) -> &CompilationUnit {
        &self.root
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// The token at `id`, clamped to the end-of-file token.
    pub fn token(&self, id: TokenId) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[id.min(last)]
    }

    pub fn token_text(&self, id: TokenId) -> &str {
        self.span_text(self.token(id).span)
    }

    pub fn span_text(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    pub fn trivia_text(&self, trivia: &Trivia) -> &str {
        self.span_text(trivia.span)
    }

    /// Byte span covered by a token range, excluding leading trivia.
    pub fn range_span(&self, range: TokenRange) -> Span {
        match range.last() {
            Some(last) => Span::new(self.token(range.start).span.start, self.token(last).span.end),
            None => Span::empty(self.token(range.start).span.start),
        }
    }

    pub fn slice(&self, range: TokenRange) -> &str {
        self.span_text(self.range_span(range))
    }

    pub fn position(&self, offset: usize) -> LinePosition {
        self.line_index.position(&self.text, offset)
    }

    pub fn location(&self, span: Span) -> Location {
        Location {
            path: self.path.clone(),
            span,
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }

    /// Concatenation of every trivia and token in order.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        for token in &self.tokens {
            for trivia in &token.leading {
                out.push_str(self.trivia_text(trivia));
            }
            out.push_str(self.span_text(token.span));
        }
        out
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn line_indent(&self, offset: usize) -> &str {
        let line = self.line_index.line_of(offset);
        let start = self.line_index.line_start(line);
        let rest = &self.text[start..];
        let width = rest
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(rest.len());
        &rest[..width]
    }

    /// Byte offset just past the end of the line containing `offset`,
    /// including its terminator.
    pub fn line_end(&self, offset: usize) -> usize {
        match self.text[offset.min(self.text.len())..].find('\n') {
            Some(idx) => offset + idx + 1,
            None => self.text.len(),
        }
    }

    /// Dominant newline style, `\n` for single-line texts.
    pub fn newline(&self) -> Newline {
        let crlf = self.text.matches("\r\n").count();
        let lf = self.text.matches('\n').count() - crlf;
        if crlf > lf {
            Newline::CrLf
        } else {
            Newline::Lf
        }
    }

    /// Whether the line containing `offset` ends without a terminator.
    pub fn is_last_line(&self, offset: usize) -> bool {
        !self.text[offset.min(self.text.len())..].contains('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_round_trips_source() {
        let text = "// header\r\nnamespace N {\r\n  class C { /* c */ int x; } // trailing\r\n}\r\n";
        let tree = SyntaxTree::parse("a.cs", text);
        assert_eq!(tree.render(), text);
        assert_eq!(tree.newline(), Newline::CrLf);
    }

    #[test]
    fn line_helpers() {
        let text = "class C\n{\n    int x;\n}";
        let tree = SyntaxTree::parse("a.cs", text);
        let offset = text.find("int").unwrap_or_default();
        assert_eq!(tree.line_indent(offset), "    ");
        assert_eq!(&text[tree.line_end(offset)..], "}");
        assert!(tree.is_last_line(text.len() - 1));
        assert_eq!(tree.newline(), Newline::Lf);
        let location = tree.location(Span::new(offset, offset + 3));
        assert_eq!(location.to_string(), "a.cs:3:5");
    }
}
