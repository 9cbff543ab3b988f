//! The `// SIG: <message>` marker comment grammar.
//!
//! A marker is a two-part grammar: a prefix literal and a free-text message.
//! The grammar sits behind [`MarkerGrammar`] so validation, synthesis and
//! repair never look at comment text themselves.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::syntax::ast::{MethodDecl, TokenRange};
use crate::syntax::{Span, SyntaxTree, TokenId, TriviaKind};

pub const DEFAULT_PREFIX: &str = "SIG";

static DEFAULT_PATTERN: Lazy<Regex> =
    Lazy::new(|| build_pattern(DEFAULT_PREFIX).expect("default marker pattern is valid"));

fn build_pattern(prefix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?s){}\s*:\s*(.+)", regex::escape(prefix)))
}

pub trait MarkerGrammar: Send + Sync {
    /// Message carried by a line comment's content (the text after `//`),
    /// or `None` when the comment is not a marker.
    fn recognize(&self, content: &str) -> Option<String>;
}

/// `<prefix> : <message>`, case-sensitive, anywhere in the comment.
#[derive(Debug, Clone)]
pub struct SigMarker {
    pattern: Regex,
}

impl SigMarker {
    pub fn with_prefix(prefix: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: build_pattern(prefix)?,
        })
    }
}

impl Default for SigMarker {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }
}

impl MarkerGrammar for SigMarker {
    fn recognize(&self, content: &str) -> Option<String> {
        let captures = self.pattern.captures(content)?;
        let message = captures.get(1)?.as_str().trim();
        (!message.is_empty()).then(|| message.to_string())
    }
}

/// A recognized marker comment inside a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerComment {
    pub message: String,
    /// Span of the comment trivia, `//` included.
    pub span: Span,
    /// Token whose leading trivia holds the comment.
    pub owner: TokenId,
    /// Position of the comment within the owner's leading trivia.
    pub trivia_index: usize,
}

/// Markers found in the leading trivia of `range`, in source order.
pub fn markers_in(
    grammar: &dyn MarkerGrammar,
    tree: &SyntaxTree,
    range: TokenRange,
) -> Vec<MarkerComment> {
    let mut markers = Vec::new();
    for owner in range.start..range.end {
        for (trivia_index, trivia) in tree.token(owner).leading.iter().enumerate() {
            if trivia.kind != TriviaKind::LineComment {
                continue;
            }
            let text = tree.trivia_text(trivia);
            let content = text.strip_prefix("//").unwrap_or(text);
            if let Some(message) = grammar.recognize(content) {
                markers.push(MarkerComment {
                    message,
                    span: trivia.span,
                    owner,
                    trivia_index,
                });
            }
        }
        if tree.token(owner).kind == crate::syntax::TokenKind::Eof {
            break;
        }
    }
    markers
}

/// Markers inside a method body, including the trivia before its closing
/// brace.
pub fn method_markers(
    grammar: &dyn MarkerGrammar,
    tree: &SyntaxTree,
    method: &MethodDecl,
) -> Vec<MarkerComment> {
    match method.body_range() {
        Some(range) => markers_in(grammar, tree, range),
        None => Vec::new(),
    }
}
