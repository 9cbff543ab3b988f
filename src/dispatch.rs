//! Recognition of dispatch call sites: `field.Member(args)` and
//! `this.field.Member(args)`.

use crate::syntax::ast::TokenRange;
use crate::syntax::{SyntaxTree, TokenId, TokenKind};

/// One argument of a dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgument {
    /// `name:` of a named argument
    pub name: Option<String>,
    /// `ref`, `out` or `in`
    pub modifier: Option<String>,
    /// The argument expression, modifier and name excluded.
    pub expression: TokenRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchCall {
    /// First token of the call: `this` or the field name.
    pub start: TokenId,
    pub member: String,
    pub member_token: TokenId,
    pub open_paren: TokenId,
    pub close_paren: Option<TokenId>,
    pub arguments: Vec<CallArgument>,
}

/// Whether a dispatch call through `field` starts at `at`.
pub fn starts_dispatch_call(tree: &SyntaxTree, at: TokenId, field: &str) -> bool {
    member_access(tree, at, field).is_some()
}

/// `(member token, open paren)` when `at` starts `[this.]field.Member(`.
fn member_access(tree: &SyntaxTree, at: TokenId, field: &str) -> Option<(TokenId, TokenId)> {
    let mut id = at;
    if tree.token_text(id) == "this" && tree.token_text(id + 1) == "." {
        id += 2;
    }
    let is_field = tree.token(id).kind == TokenKind::Identifier
        && identifier_text(tree.token_text(id)) == field;
    if !is_field || tree.token_text(id + 1) != "." {
        return None;
    }
    let member = id + 2;
    if tree.token(member).kind != TokenKind::Identifier || tree.token_text(member + 1) != "(" {
        return None;
    }
    Some((member, member + 1))
}

/// Parses the dispatch call starting at `at`.
pub fn match_dispatch_call(tree: &SyntaxTree, at: TokenId, field: &str) -> Option<DispatchCall> {
    let (member_token, open_paren) = member_access(tree, at, field)?;
    let close_paren = matching_close(tree, open_paren);
    let end = close_paren.unwrap_or(tree.tokens().len().saturating_sub(1));
    Some(DispatchCall {
        start: at,
        member: identifier_text(tree.token_text(member_token)).to_string(),
        member_token,
        open_paren,
        close_paren,
        arguments: split_arguments(tree, TokenRange::new(open_paren + 1, end)),
    })
}

/// Every dispatch call in `range`, in source order. A match must not be the
/// tail of a longer member access (`other.signals.M()`).
pub fn dispatch_calls_in(tree: &SyntaxTree, range: TokenRange, field: &str) -> Vec<DispatchCall> {
    let mut calls = Vec::new();
    let mut id = range.start;
    while id < range.end {
        let preceded_by_dot = id > 0 && matches!(tree.token_text(id - 1), "." | "?.");
        if !preceded_by_dot {
            if let Some(call) = match_dispatch_call(tree, id, field) {
                // nested calls in arguments are found by continuing inside
                id = call.open_paren + 1;
                calls.push(call);
                continue;
            }
        }
        id += 1;
    }
    calls
}

fn identifier_text(text: &str) -> &str {
    text.strip_prefix('@').unwrap_or(text)
}

fn matching_close(tree: &SyntaxTree, open: TokenId) -> Option<TokenId> {
    let mut depth = 0usize;
    for id in open..tree.tokens().len() {
        match tree.token(id).kind {
            TokenKind::Eof => return None,
            TokenKind::Punct => match tree.token_text(id) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(id);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    None
}

/// Splits the tokens between the parentheses on top-level commas.
fn split_arguments(tree: &SyntaxTree, inner: TokenRange) -> Vec<CallArgument> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut piece_start = inner.start;
    let mut id = inner.start;
    while id < inner.end {
        if tree.token(id).kind == TokenKind::Punct {
            match tree.token_text(id) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "<" => {
                    if let Some(close) = generic_arguments_end(tree, id, inner.end) {
                        id = close + 1;
                        continue;
                    }
                }
                "," if depth == 0 => {
                    pieces.push(TokenRange::new(piece_start, id));
                    piece_start = id + 1;
                }
                _ => {}
            }
        }
        id += 1;
    }
    if piece_start < inner.end || !pieces.is_empty() {
        pieces.push(TokenRange::new(piece_start, inner.end));
    }
    pieces
        .into_iter()
        .map(|range| argument(tree, range))
        .collect()
}

/// End of `<...>` when the `<` at `open` starts type arguments rather than
/// a comparison.
fn generic_arguments_end(tree: &SyntaxTree, open: TokenId, end: TokenId) -> Option<TokenId> {
    if open == 0 || tree.token(open - 1).kind != TokenKind::Identifier {
        return None;
    }
    let mut depth = 0usize;
    for id in open..end {
        let token = tree.token(id);
        match (token.kind, tree.token_text(id)) {
            (TokenKind::Punct, "<") => depth += 1,
            (TokenKind::Punct, ">") => {
                depth -= 1;
                if depth == 0 {
                    let follows = id + 1 >= end
                        || matches!(
                            tree.token_text(id + 1),
                            "(" | ")" | "]" | "}" | ";" | "," | "." | "{" | "[" | "?."
                        );
                    return follows.then_some(id);
                }
            }
            (TokenKind::Punct, "," | "." | "?" | "[" | "]" | "::" | "*") => {}
            (TokenKind::Identifier | TokenKind::Keyword, _) => {}
            _ => return None,
        }
    }
    None
}

fn argument(tree: &SyntaxTree, range: TokenRange) -> CallArgument {
    let mut start = range.start;
    let mut name = None;
    if range.end >= start + 2
        && tree.token(start).kind == TokenKind::Identifier
        && tree.token_text(start + 1) == ":"
    {
        name = Some(identifier_text(tree.token_text(start)).to_string());
        start += 2;
    }
    let mut modifier = None;
    if start < range.end && matches!(tree.token_text(start), "ref" | "out" | "in") {
        modifier = Some(tree.token_text(start).to_string());
        start += 1;
    }
    CallArgument {
        name,
        modifier,
        expression: TokenRange::new(start, range.end),
    }
}
