//! Lossless C# lexer.
//!
//! Every byte of the input ends up either in a token or in a piece of
//! trivia, so concatenating the token stream reproduces the source exactly.
//! Malformed input (unterminated literals or comments) is reported through
//! [`SyntaxError`]s; lexing itself never fails.

use super::span::Span;
use super::token::{is_keyword, Token, TokenKind, Trivia, TriviaKind};
use super::SyntaxError;

/// Result of lexing one source text.
#[derive(Debug, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<SyntaxError>,
}

pub fn lex(text: &str) -> LexOutput {
    let mut lexer = Lexer::new(text);
    lexer.run();
    LexOutput {
        tokens: lexer.tokens,
        errors: lexer.errors,
    }
}

const THREE_CHAR_PUNCT: &[&str] = &["<<=", "??="];

const TWO_CHAR_PUNCT: &[&str] = &[
    "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "<<", "::", "->", "..",
];

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    at_line_start: bool,
    pending: Vec<Trivia>,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            at_line_start: true,
            pending: Vec::new(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(&mut self) {
        loop {
            self.lex_trivia();
            if self.pos >= self.bytes.len() {
                let leading = std::mem::take(&mut self.pending);
                self.tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span::empty(self.bytes.len()),
                    leading,
                });
                return;
            }
            let start = self.pos;
            let kind = self.lex_token();
            debug_assert!(self.pos > start, "lexer must make progress");
            let leading = std::mem::take(&mut self.pending);
            self.tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
                leading,
            });
            self.at_line_start = false;
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn push_trivia(&mut self, kind: TriviaKind, start: usize) {
        self.pending.push(Trivia {
            kind,
            span: Span::new(start, self.pos),
        });
    }

    fn error(&mut self, message: &str, start: usize) {
        self.errors.push(SyntaxError {
            message: message.to_string(),
            span: Span::new(start, self.pos),
        });
    }

    fn lex_trivia(&mut self) {
        while let Some(byte) = self.peek(0) {
            let start = self.pos;
            match byte {
                b' ' | b'\t' | 0x0b | 0x0c => {
                    while matches!(self.peek(0), Some(b' ' | b'\t' | 0x0b | 0x0c)) {
                        self.pos += 1;
                    }
                    self.push_trivia(TriviaKind::Whitespace, start);
                }
                b'\r' => {
                    self.pos += if self.peek(1) == Some(b'\n') { 2 } else { 1 };
                    self.push_trivia(TriviaKind::EndOfLine, start);
                    self.at_line_start = true;
                }
                b'\n' => {
                    self.pos += 1;
                    self.push_trivia(TriviaKind::EndOfLine, start);
                    self.at_line_start = true;
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    let is_doc = self.peek(2) == Some(b'/') && self.peek(3) != Some(b'/');
                    self.skip_to_line_end();
                    let kind = if is_doc {
                        TriviaKind::DocComment
                    } else {
                        TriviaKind::LineComment
                    };
                    self.push_trivia(kind, start);
                    self.at_line_start = false;
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.pos += 2;
                    let mut closed = false;
                    while self.pos < self.bytes.len() {
                        if self.bytes[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                            self.pos += 2;
                            closed = true;
                            break;
                        }
                        self.pos += 1;
                    }
                    if !closed {
                        self.error("unterminated block comment", start);
                    }
                    self.push_trivia(TriviaKind::BlockComment, start);
                    self.at_line_start = false;
                }
                b'#' if self.at_line_start => {
                    self.skip_to_line_end();
                    self.push_trivia(TriviaKind::Directive, start);
                }
                _ => return,
            }
        }
    }

    fn skip_to_line_end(&mut self) {
        while let Some(byte) = self.peek(0) {
            if byte == b'\n' || byte == b'\r' {
                break;
            }
            self.pos += 1;
        }
    }

    fn lex_token(&mut self) -> TokenKind {
        let start = self.pos;
        let byte = self.bytes[self.pos];
        match (byte, self.peek(1), self.peek(2)) {
            (b'@', Some(b'"'), _) => {
                self.pos += 1;
                self.scan_verbatim_string(start);
                TokenKind::StringLiteral
            }
            (b'$', _, _) | (b'@', Some(b'$'), _) => {
                if self.scan_interpolated_string(start) {
                    TokenKind::StringLiteral
                } else {
                    self.pos = start + 1;
                    TokenKind::Punct
                }
            }
            (b'@', Some(next), _) if is_ident_start(next as char) || next >= 0x80 => {
                self.pos += 1;
                self.scan_identifier();
                TokenKind::Identifier
            }
            (b'"', _, _) => {
                self.scan_string(start);
                TokenKind::StringLiteral
            }
            (b'\'', _, _) => {
                self.scan_char(start);
                TokenKind::CharLiteral
            }
            (b'0'..=b'9', _, _) => self.scan_number(),
            (b'.', Some(b'0'..=b'9'), _) => self.scan_number(),
            _ => {
                if let Some(ch) = self.current_char() {
                    if is_ident_start(ch) {
                        self.scan_identifier();
                        return if is_keyword(&self.text[start..self.pos]) {
                            TokenKind::Keyword
                        } else {
                            TokenKind::Identifier
                        };
                    }
                }
                self.scan_punct();
                TokenKind::Punct
            }
        }
    }

    fn scan_identifier(&mut self) {
        while let Some(ch) = self.current_char() {
            if is_ident_continue(ch) {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn scan_punct(&mut self) {
        let rest = &self.text[self.pos..];
        for table in [THREE_CHAR_PUNCT, TWO_CHAR_PUNCT] {
            if let Some(op) = table.iter().find(|op| rest.starts_with(**op)) {
                self.pos += op.len();
                return;
            }
        }
        let width = self.current_char().map(char::len_utf8).unwrap_or(1);
        self.pos += width;
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut real = false;
        if self.peek(0) == Some(b'0') && matches!(self.peek(1), Some(b'x' | b'X' | b'b' | b'B')) {
            self.pos += 2;
            while matches!(self.peek(0), Some(b) if b.is_ascii_hexdigit() || b == b'_') {
                self.pos += 1;
            }
        } else {
            self.eat_digits();
            if self.peek(0) == Some(b'.') && matches!(self.peek(1), Some(b'0'..=b'9')) {
                real = true;
                self.pos += 1;
                self.eat_digits();
            }
            if matches!(self.peek(0), Some(b'e' | b'E')) {
                let sign = usize::from(matches!(self.peek(1), Some(b'+' | b'-')));
                if matches!(self.peek(1 + sign), Some(b'0'..=b'9')) {
                    real = true;
                    self.pos += 1 + sign;
                    self.eat_digits();
                }
            }
        }
        while let Some(suffix) = self.peek(0) {
            match suffix {
                b'f' | b'F' | b'd' | b'D' | b'm' | b'M' => {
                    real = true;
                    self.pos += 1;
                }
                b'u' | b'U' | b'l' | b'L' => self.pos += 1,
                _ => break,
            }
        }
        if real {
            TokenKind::RealLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(0), Some(b) if b.is_ascii_digit() || b == b'_') {
            self.pos += 1;
        }
    }

    fn scan_char(&mut self, start: usize) {
        self.pos += 1;
        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' => {
                    self.pos += 1;
                    self.skip_one_char();
                }
                b'\'' => {
                    self.pos += 1;
                    return;
                }
                b'\n' | b'\r' => break,
                _ => self.skip_one_char(),
            }
        }
        self.error("unterminated character literal", start);
    }

    fn skip_one_char(&mut self) {
        let width = self.current_char().map(char::len_utf8).unwrap_or(1);
        self.pos += width;
    }

    fn scan_string(&mut self, start: usize) {
        let quotes = self.count_quotes();
        if quotes >= 3 {
            self.scan_raw_string(start, quotes);
            return;
        }
        self.pos += 1;
        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' => {
                    self.pos += 1;
                    self.skip_one_char();
                }
                b'"' => {
                    self.pos += 1;
                    return;
                }
                b'\n' | b'\r' => break,
                _ => self.skip_one_char(),
            }
        }
        self.error("unterminated string literal", start);
    }

    fn count_quotes(&self) -> usize {
        self.bytes[self.pos..]
            .iter()
            .take_while(|b| **b == b'"')
            .count()
    }

    fn scan_raw_string(&mut self, start: usize, quotes: usize) {
        self.pos += quotes;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'"' {
                let run = self.count_quotes();
                self.pos += run;
                if run >= quotes {
                    return;
                }
            } else {
                self.skip_one_char();
            }
        }
        self.error("unterminated raw string literal", start);
    }

    /// Positioned on the opening quote, `@` already consumed.
    fn scan_verbatim_string(&mut self, start: usize) {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'"' {
                if self.peek(1) == Some(b'"') {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return;
            }
            self.skip_one_char();
        }
        self.error("unterminated verbatim string literal", start);
    }

    /// Scans `$"..."`, `$@"..."`, `@$"..."` and `$"""..."""` forms.
    /// Returns false (without consuming) when no string follows the prefix.
    fn scan_interpolated_string(&mut self, start: usize) -> bool {
        let mut verbatim = false;
        let mut probe = self.pos;
        while let Some(byte) = self.bytes.get(probe) {
            match byte {
                b'$' => probe += 1,
                b'@' if !verbatim => {
                    verbatim = true;
                    probe += 1;
                }
                _ => break,
            }
        }
        if self.bytes.get(probe) != Some(&b'"') {
            return false;
        }
        self.pos = probe;
        let quotes = self.count_quotes();
        if quotes >= 3 {
            self.scan_raw_string(start, quotes);
            return true;
        }
        self.pos += 1;
        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' if !verbatim => {
                    self.pos += 1;
                    self.skip_one_char();
                }
                b'"' if verbatim && self.peek(1) == Some(b'"') => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return true;
                }
                b'{' if self.peek(1) == Some(b'{') => self.pos += 2,
                b'{' => {
                    self.pos += 1;
                    self.scan_interpolation_hole();
                }
                b'\n' | b'\r' if !verbatim => break,
                _ => self.skip_one_char(),
            }
        }
        self.error("unterminated interpolated string literal", start);
        true
    }

    fn scan_interpolation_hole(&mut self) {
        let mut depth = 0usize;
        while let Some(byte) = self.peek(0) {
            let start = self.pos;
            match byte {
                b'{' | b'(' | b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                b'}' | b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                b'"' => self.scan_string(start),
                b'\'' => self.scan_char(start),
                b'@' if self.peek(1) == Some(b'"') => {
                    self.pos += 1;
                    self.scan_verbatim_string(start);
                }
                b'$' | b'@' => {
                    if !self.scan_interpolated_string(start) {
                        self.pos += 1;
                    }
                }
                b'\n' | b'\r' => return,
                _ => self.skip_one_char(),
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}
