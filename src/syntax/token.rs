//! Tokens and trivia produced by the lexer.

use super::span::Span;

/// Index of a token in [`super::SyntaxTree::tokens`].
pub type TokenId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriviaKind {
    Whitespace,
    EndOfLine,
    LineComment,
    DocComment,
    BlockComment,
    Directive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: Span,
}

impl Trivia {
    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            TriviaKind::LineComment | TriviaKind::DocComment | TriviaKind::BlockComment
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    IntLiteral,
    RealLiteral,
    StringLiteral,
    CharLiteral,
    Punct,
    Eof,
}

/// A token with the trivia that precedes it.
///
/// Every piece of trivia is leading trivia; the end-of-file token carries
/// whatever follows the last real token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub leading: Vec<Trivia>,
}

impl Token {
    /// Span covering the leading trivia and the token itself.
    pub fn full_span(&self) -> Span {
        match self.leading.first() {
            Some(first) => Span::new(first.span.start, self.span.end),
            None => self.span,
        }
    }
}

pub const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

pub const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "char", "decimal", "double", "float", "int", "long", "object", "sbyte",
    "short", "string", "uint", "ulong", "ushort", "void",
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.binary_search(&text).is_ok()
}

pub fn is_predefined_type(text: &str) -> bool {
    PREDEFINED_TYPES.contains(&text)
}
