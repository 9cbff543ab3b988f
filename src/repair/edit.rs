//! Byte-range text edits.

use crate::syntax::Span;

/// Replace `span` with `new_text`. An empty span inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub new_text: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            span: Span::empty(at),
            new_text: text.into(),
        }
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: text.into(),
        }
    }

    pub fn delete(span: Span) -> Self {
        Self::replace(span, "")
    }
}

/// Applies non-overlapping edits, last first so earlier offsets stay valid.
/// Edits outside the text or not on character boundaries are skipped.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.span.start.cmp(&a.span.start).then(b.span.end.cmp(&a.span.end)));

    let mut result = text.to_string();
    let mut limit = text.len();
    for edit in sorted {
        let Span { start, end } = edit.span;
        let valid = start <= end
            && end <= limit
            && result.is_char_boundary(start)
            && result.is_char_boundary(end);
        if !valid {
            continue;
        }
        result.replace_range(start..end, &edit.new_text);
        limit = start;
    }
    result
}
