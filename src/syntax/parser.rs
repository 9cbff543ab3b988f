//! Tolerant recursive-descent parser for the C# subset the pipeline reads.
//!
//! The parser understands declarations (namespaces, types, fields,
//! properties, methods) and statement structure. Expressions are kept as
//! token ranges; the semantic layer inspects them on demand. Anything it
//! does not model is skipped with balanced-bracket scanning so that one odd
//! construct never derails the rest of the file.

use super::ast::*;
use super::token::{is_predefined_type, Token, TokenId, TokenKind};
use super::SyntaxError;

pub fn parse(text: &str, tokens: &[Token]) -> (CompilationUnit, Vec<SyntaxError>) {
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
        errors: Vec::new(),
        lambda_bodies: None,
    };
    let (usings, members) = parser.parse_namespace_body(false);
    (CompilationUnit { usings, members }, parser.errors)
}

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "readonly", "sealed", "abstract",
    "virtual", "override", "extern", "unsafe", "volatile", "new", "const",
];

/// Contextual keywords that act as modifiers only before another word.
const CONTEXTUAL_MODIFIERS: &[&str] = &["partial", "async", "required", "file"];

const PARAMETER_MODIFIERS: &[&str] = &["ref", "out", "in", "params", "this", "scoped"];

struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: TokenId,
    errors: Vec<SyntaxError>,
    /// Lambda and anonymous-method blocks met while skipping the expressions
    /// of the statement being parsed. `None` outside statements.
    lambda_bodies: Option<Vec<Block>>,
}

impl<'a> Parser<'a> {
    // ── Token access ────────────────────────────────────────────────────

    fn token(&self, id: TokenId) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[id.min(last)]
    }

    fn text_of(&self, id: TokenId) -> &'a str {
        let span = self.token(id).span;
        &self.text[span.start..span.end]
    }

    fn kind_of(&self, id: TokenId) -> TokenKind {
        self.token(id).kind
    }

    fn cur_text(&self) -> &'a str {
        self.text_of(self.pos)
    }

    fn peek_text(&self, ahead: usize) -> &'a str {
        self.text_of(self.pos + ahead)
    }

    fn is_eof(&self) -> bool {
        self.kind_of(self.pos) == TokenKind::Eof
    }

    fn at(&self, text: &str) -> bool {
        !self.is_eof() && self.is_symbolic(self.pos) && self.cur_text() == text
    }

    fn peek_is(&self, ahead: usize, text: &str) -> bool {
        let id = self.pos + ahead;
        self.kind_of(id) != TokenKind::Eof && self.is_symbolic(id) && self.text_of(id) == text
    }

    fn is_symbolic(&self, id: TokenId) -> bool {
        matches!(
            self.kind_of(id),
            TokenKind::Punct | TokenKind::Keyword | TokenKind::Identifier
        )
    }

    fn at_identifier(&self) -> bool {
        self.kind_of(self.pos) == TokenKind::Identifier
    }

    fn is_word(&self, id: TokenId) -> bool {
        matches!(self.kind_of(id), TokenKind::Identifier | TokenKind::Keyword)
    }

    fn bump(&mut self) -> TokenId {
        let id = self.pos;
        if !self.is_eof() {
            self.pos += 1;
        }
        id
    }

    fn eat(&mut self, text: &str) -> Option<TokenId> {
        self.at(text).then(|| self.bump())
    }

    fn expect(&mut self, text: &str) -> Option<TokenId> {
        let found = self.eat(text);
        if found.is_none() {
            self.error(format!("expected `{text}`"));
        }
        found
    }

    fn error(&mut self, message: String) {
        let span = self.token(self.pos).span;
        self.errors.push(SyntaxError { message, span });
    }

    /// Normalized spelling of a token range: words separated by a space,
    /// a space after commas, nothing else.
    fn join(&self, start: TokenId, end: TokenId) -> String {
        let mut out = String::new();
        for id in start..end {
            if id > start {
                let prev = id - 1;
                if self.text_of(prev) == "," || (self.is_word(prev) && self.is_word(id)) {
                    out.push(' ');
                }
            }
            out.push_str(self.text_of(id));
        }
        out
    }

    // ── Skipping ────────────────────────────────────────────────────────

    fn closer_of(open: &str) -> Option<&'static str> {
        match open {
            "(" => Some(")"),
            "[" => Some("]"),
            "{" => Some("}"),
            _ => None,
        }
    }

    /// Skips a bracketed group starting at the current token.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        loop {
            if self.is_eof() {
                self.error("unbalanced brackets".to_string());
                return;
            }
            if depth > 0 && self.collect_lambda_body() {
                continue;
            }
            let text = self.cur_text();
            if self.is_symbolic(self.pos) {
                if Self::closer_of(text).is_some() {
                    depth += 1;
                } else if matches!(text, ")" | "]" | "}") {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
            }
            self.bump();
        }
    }

    fn skip_parens(&mut self) {
        if self.at("(") {
            self.skip_balanced();
        }
    }

    /// Skips until one of `stops` at bracket depth zero, without consuming
    /// it. Also stops before an unmatched closer.
    fn skip_until(&mut self, stops: &[&str]) {
        while !self.is_eof() {
            if self.is_symbolic(self.pos) {
                let text = self.cur_text();
                if stops.contains(&text) {
                    return;
                }
                if text == "<" && self.skip_generic_arguments() {
                    continue;
                }
                if self.collect_lambda_body() {
                    continue;
                }
                if Self::closer_of(text).is_some() {
                    self.skip_balanced();
                    continue;
                }
                if matches!(text, ")" | "]" | "}") {
                    return;
                }
            }
            self.bump();
        }
    }

    /// Whether the current `{` opens the block body of `=> { }`,
    /// `delegate { }` or `delegate (...) { }`.
    fn at_lambda_body(&self) -> bool {
        if !self.at("{") || self.pos == 0 {
            return false;
        }
        let before = self.pos - 1;
        match self.text_of(before) {
            "=>" | "delegate" => true,
            ")" if self.is_symbolic(before) => {
                let mut depth = 0usize;
                for id in (0..=before).rev() {
                    if !self.is_symbolic(id) {
                        continue;
                    }
                    match self.text_of(id) {
                        ")" => depth += 1,
                        "(" => {
                            depth -= 1;
                            if depth == 0 {
                                return id > 0 && self.text_of(id - 1) == "delegate";
                            }
                        }
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    /// Parses a lambda block body at the current token into the enclosing
    /// statement. A body already collected (after backtracking) is skipped
    /// without being recorded twice.
    fn collect_lambda_body(&mut self) -> bool {
        if self.lambda_bodies.is_none() || !self.at_lambda_body() {
            return false;
        }
        let open = self.pos;
        let block = self.parse_block();
        if let Some(bodies) = self.lambda_bodies.as_mut() {
            if !bodies.iter().any(|body| body.open == open) {
                bodies.push(block);
            }
        }
        true
    }

    /// Skips `<...>` after an identifier inside an expression when it reads
    /// as a type argument list (`new Dictionary<int, string>()`).
    fn skip_generic_arguments(&mut self) -> bool {
        if self.pos == 0 || self.kind_of(self.pos - 1) != TokenKind::Identifier {
            return false;
        }
        let save = self.pos;
        if self.parse_type_arguments() {
            let follows = self.is_eof()
                || matches!(
                    self.cur_text(),
                    "(" | ")" | "]" | "}" | ";" | "," | "." | "{" | "[" | "?." | ":"
                );
            if follows {
                return true;
            }
        }
        self.pos = save;
        false
    }

    /// Skips `< ... >` when the current token opens a type parameter list.
    fn skip_angles(&mut self) -> Option<String> {
        if !self.at("<") {
            return None;
        }
        let start = self.pos;
        let mut depth = 0usize;
        while !self.is_eof() {
            match self.cur_text() {
                "<" => depth += 1,
                ">" => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return Some(self.join(start, self.pos));
                    }
                }
                ";" | "{" | "}" => break,
                _ => {}
            }
            self.bump();
        }
        self.error("unterminated type parameter list".to_string());
        Some(self.join(start, self.pos))
    }

    // ── Namespaces ──────────────────────────────────────────────────────

    fn parse_namespace_body(&mut self, braced: bool) -> (Vec<UsingDirective>, Vec<NamespaceMember>) {
        let mut usings = Vec::new();
        let mut members = Vec::new();
        loop {
            if self.is_eof() || (braced && self.at("}")) {
                break;
            }
            let before = self.pos;
            if self.at("extern") {
                self.skip_until(&[";"]);
                self.eat(";");
            } else if self.at("global") && self.peek_is(1, "using") {
                self.bump();
                usings.push(self.parse_using());
            } else if self.at("using") && !self.peek_is(1, "(") {
                usings.push(self.parse_using());
            } else if self.at("namespace") {
                members.push(NamespaceMember::Namespace(self.parse_namespace()));
            } else if let Some(Member::Type(ty)) = self.parse_member(None) {
                members.push(NamespaceMember::Type(ty));
            }
            if self.pos == before {
                self.bump();
            }
        }
        (usings, members)
    }

    fn parse_using(&mut self) -> UsingDirective {
        let start = self.pos;
        self.bump();
        let is_static = self.eat("static").is_some();
        let mut alias = None;
        if self.at_identifier() && self.peek_is(1, "=") {
            alias = Some(self.cur_text().to_string());
            self.bump();
            self.bump();
        }
        let target_start = self.pos;
        self.skip_until(&[";"]);
        let target = self.join(target_start, self.pos);
        self.expect(";");
        UsingDirective {
            alias,
            target,
            is_static,
            range: TokenRange::new(start, self.pos),
        }
    }

    fn parse_namespace(&mut self) -> NamespaceDecl {
        let start = self.bump();
        let name_start = self.pos;
        while !self.is_eof() && !self.at("{") && !self.at(";") {
            self.bump();
        }
        let name = self.join(name_start, self.pos);
        if self.eat(";").is_some() {
            let (usings, members) = self.parse_namespace_body(false);
            return NamespaceDecl {
                name,
                file_scoped: true,
                usings,
                members,
                range: TokenRange::new(start, self.pos),
            };
        }
        self.expect("{");
        let (usings, members) = self.parse_namespace_body(true);
        self.expect("}");
        self.eat(";");
        NamespaceDecl {
            name,
            file_scoped: false,
            usings,
            members,
            range: TokenRange::new(start, self.pos),
        }
    }

    // ── Members ─────────────────────────────────────────────────────────

    fn parse_attributes(&mut self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        while self.at("[") {
            self.bump();
            if self.is_word(self.pos) && self.peek_is(1, ":") {
                self.bump();
                self.bump();
            }
            loop {
                let start = self.pos;
                if self.is_word(self.pos) {
                    self.parse_qualified_name();
                    let name = self.join(start, self.pos);
                    self.skip_parens();
                    attributes.push(Attribute {
                        name,
                        range: TokenRange::new(start, self.pos),
                    });
                }
                if self.eat(",").is_some() {
                    continue;
                }
                break;
            }
            self.skip_until(&["]"]);
            self.expect("]");
        }
        attributes
    }

    fn parse_qualified_name(&mut self) {
        loop {
            if self.is_word(self.pos) {
                self.bump();
            }
            if (self.at(".") || self.at("::")) && self.is_word(self.pos + 1) {
                self.bump();
                continue;
            }
            break;
        }
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            let text = self.cur_text();
            let is_modifier = match self.kind_of(self.pos) {
                TokenKind::Keyword => MODIFIERS.contains(&text) && self.is_word(self.pos + 1),
                TokenKind::Identifier => {
                    CONTEXTUAL_MODIFIERS.contains(&text) && self.is_word(self.pos + 1)
                }
                _ => false,
            };
            if !is_modifier {
                return modifiers;
            }
            let token = self.bump();
            modifiers.push(Modifier {
                text: text.to_string(),
                token,
            });
        }
    }

    /// Parses one type member (or namespace-level declaration).
    fn parse_member(&mut self, enclosing: Option<&str>) -> Option<Member> {
        let start = self.pos;
        let attributes = self.parse_attributes();
        let modifiers = self.parse_modifiers();

        let kind = match self.cur_text() {
            "class" => Some(TypeKind::Class),
            "struct" => Some(TypeKind::Struct),
            "interface" => Some(TypeKind::Interface),
            "record" if self.at_identifier() && self.is_word(self.pos + 1) => {
                if self.peek_is(1, "struct") {
                    Some(TypeKind::RecordStruct)
                } else {
                    Some(TypeKind::Record)
                }
            }
            _ => None,
        };
        if let Some(kind) = kind {
            return Some(Member::Type(
                self.parse_type_decl(start, kind, attributes, modifiers),
            ));
        }

        if matches!(self.cur_text(), "enum" | "delegate" | "event" | "~" | "implicit" | "explicit") {
            return Some(self.skip_member(start));
        }

        let after_modifiers = self.pos;
        let Some(ty) = self.parse_type() else {
            return Some(self.skip_member(start));
        };
        if self.at("(") && enclosing == Some(ty.text.as_str()) {
            // Constructor.
            self.pos = after_modifiers;
            return Some(self.skip_member(start));
        }
        if !self.at_identifier() {
            return Some(self.skip_member(start));
        }
        let mut name_token = self.bump();
        while self.at(".") && self.kind_of(self.pos + 1) == TokenKind::Identifier {
            self.bump();
            name_token = self.bump();
        }
        let name = self.text_of(name_token).to_string();

        if self.at("(") || self.at("<") {
            let method = self.parse_method_tail(start, modifiers, ty, name, name_token);
            return Some(Member::Method(method));
        }
        if self.at("{") {
            self.skip_balanced();
            if self.eat("=").is_some() {
                self.skip_until(&[";"]);
                self.expect(";");
            }
            return Some(Member::Property(PropertyDecl {
                modifiers,
                ty,
                name,
                range: TokenRange::new(start, self.pos),
            }));
        }
        if self.eat("=>").is_some() {
            self.skip_until(&[";"]);
            self.expect(";");
            return Some(Member::Property(PropertyDecl {
                modifiers,
                ty,
                name,
                range: TokenRange::new(start, self.pos),
            }));
        }
        if self.at("=") || self.at(";") || self.at(",") {
            let declarators = self.parse_declarators_after_first(name, name_token);
            return Some(Member::Field(FieldDecl {
                modifiers,
                ty,
                declarators,
                range: TokenRange::new(start, self.pos),
            }));
        }
        Some(self.skip_member(start))
    }

    /// Skips an unmodelled member and returns it as [`Member::Other`].
    fn skip_member(&mut self, start: TokenId) -> Member {
        while !self.is_eof() {
            if self.at("}") {
                break;
            }
            if self.at(";") {
                self.bump();
                break;
            }
            if self.at("=>") {
                self.skip_until(&[";"]);
                self.eat(";");
                break;
            }
            if self.at("{") {
                self.skip_balanced();
                if self.eat("=").is_some() {
                    self.skip_until(&[";"]);
                    self.eat(";");
                } else {
                    self.eat(";");
                }
                break;
            }
            if self.at("(") || self.at("[") {
                self.skip_balanced();
                continue;
            }
            self.bump();
        }
        Member::Other(TokenRange::new(start, self.pos))
    }

    fn parse_type_decl(
        &mut self,
        start: TokenId,
        kind: TypeKind,
        attributes: Vec<Attribute>,
        modifiers: Vec<Modifier>,
    ) -> TypeDecl {
        let keyword = self.bump();
        if kind == TypeKind::RecordStruct || (kind == TypeKind::Record && self.at("class")) {
            self.bump();
        }
        let name_token = self.pos;
        let name = if self.at_identifier() {
            self.bump();
            self.text_of(name_token).to_string()
        } else {
            self.error("expected type name".to_string());
            String::new()
        };
        let type_parameters = self.skip_angles();
        self.skip_parens();
        self.skip_until(&["{", ";"]);

        let mut members = Vec::new();
        let mut open_brace = None;
        let mut close_brace = None;
        if let Some(open) = self.eat("{") {
            open_brace = Some(open);
            loop {
                if let Some(close) = self.eat("}") {
                    close_brace = Some(close);
                    break;
                }
                if self.is_eof() {
                    self.error(format!("expected `}}` to close `{name}`"));
                    break;
                }
                let before = self.pos;
                if let Some(member) = self.parse_member(Some(&name)) {
                    members.push(member);
                }
                if self.pos == before {
                    self.bump();
                }
            }
        }
        self.eat(";");

        TypeDecl {
            kind,
            name,
            name_token,
            keyword,
            type_parameters,
            attributes,
            modifiers,
            open_brace,
            close_brace,
            members,
            range: TokenRange::new(start, self.pos),
        }
    }

    fn parse_method_tail(
        &mut self,
        start: TokenId,
        modifiers: Vec<Modifier>,
        return_type: TypeSyntax,
        name: String,
        name_token: TokenId,
    ) -> MethodDecl {
        self.skip_angles();
        let parameters = self.parse_parameters();
        while self.at("where") || self.at(":") {
            self.bump();
            self.skip_until(&["{", "=>", ";", "where"]);
        }
        let body = if self.at("{") {
            MethodBody::Block(self.parse_block())
        } else if self.eat("=>").is_some() {
            let body_start = self.pos;
            self.skip_until(&[";"]);
            let range = TokenRange::new(body_start, self.pos);
            self.expect(";");
            MethodBody::Expression(range)
        } else {
            self.expect(";");
            MethodBody::None
        };
        MethodDecl {
            modifiers,
            return_type,
            name,
            name_token,
            parameters,
            body,
            range: TokenRange::new(start, self.pos),
        }
    }

    fn parse_parameters(&mut self) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        if self.expect("(").is_none() {
            return parameters;
        }
        loop {
            if self.eat(")").is_some() || self.is_eof() {
                break;
            }
            let before = self.pos;
            self.parse_attributes();
            let mut modifier = None;
            while PARAMETER_MODIFIERS.contains(&self.cur_text()) && self.is_word(self.pos + 1) {
                modifier = Some(self.cur_text().to_string());
                self.bump();
            }
            if let Some(ty) = self.parse_type() {
                if self.at_identifier() {
                    let name = self.cur_text().to_string();
                    self.bump();
                    parameters.push(Parameter { modifier, ty, name });
                }
            }
            self.skip_until(&[",", ")"]);
            self.eat(",");
            if self.pos == before {
                self.bump();
            }
        }
        parameters
    }

    /// Declarators after the first name has been consumed.
    fn parse_declarators_after_first(
        &mut self,
        name: String,
        name_token: TokenId,
    ) -> Vec<VariableDeclarator> {
        let mut declarators = Vec::new();
        let mut current = Some((name, name_token));
        while let Some((name, name_token)) = current.take() {
            let initializer = if self.eat("=").is_some() {
                let init_start = self.pos;
                self.skip_until(&[",", ";"]);
                Some(TokenRange::new(init_start, self.pos))
            } else {
                None
            };
            declarators.push(VariableDeclarator {
                name,
                name_token,
                initializer,
            });
            if self.eat(",").is_some() && self.at_identifier() {
                let token = self.bump();
                current = Some((self.text_of(token).to_string(), token));
            }
        }
        self.expect(";");
        declarators
    }

    // ── Types ───────────────────────────────────────────────────────────

    /// Parses a type at the current position, restoring the position when
    /// the tokens do not form one.
    fn parse_type(&mut self) -> Option<TypeSyntax> {
        let start = self.pos;
        if !self.parse_type_core() {
            self.pos = start;
            return None;
        }
        Some(TypeSyntax {
            text: self.join(start, self.pos),
            range: TokenRange::new(start, self.pos),
        })
    }

    fn parse_type_core(&mut self) -> bool {
        if self.at("(") {
            self.bump();
            loop {
                if !self.parse_type_core() {
                    return false;
                }
                if self.at_identifier() {
                    self.bump();
                }
                if self.eat(",").is_some() {
                    continue;
                }
                if self.eat(")").is_some() {
                    break;
                }
                return false;
            }
        } else if self.kind_of(self.pos) == TokenKind::Keyword && is_predefined_type(self.cur_text())
        {
            self.bump();
        } else if self.at_identifier() {
            self.parse_type_name();
        } else {
            return false;
        }

        loop {
            if self.at("?") {
                self.bump();
            } else if self.at("[") {
                let save = self.pos;
                self.bump();
                while self.eat(",").is_some() {}
                if self.eat("]").is_none() {
                    self.pos = save;
                    break;
                }
            } else if self.at("*") {
                self.bump();
            } else {
                break;
            }
        }
        true
    }

    fn parse_type_name(&mut self) {
        loop {
            self.bump();
            if self.at("<") {
                let save = self.pos;
                if !self.parse_type_arguments() {
                    self.pos = save;
                }
            }
            if (self.at(".") || self.at("::")) && self.kind_of(self.pos + 1) == TokenKind::Identifier
            {
                self.bump();
                continue;
            }
            break;
        }
    }

    fn parse_type_arguments(&mut self) -> bool {
        self.bump();
        loop {
            if self.eat(">").is_some() {
                return true;
            }
            if self.eat(",").is_some() {
                continue;
            }
            if !self.parse_type_core() {
                return false;
            }
            if self.eat(",").is_some() {
                continue;
            }
            return self.eat(">").is_some();
        }
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Block {
        let open = self.bump();
        let mut statements = Vec::new();
        loop {
            if let Some(close) = self.eat("}") {
                return Block {
                    open,
                    close: Some(close),
                    statements,
                };
            }
            if self.is_eof() {
                self.error("expected `}` to close block".to_string());
                return Block {
                    open,
                    close: None,
                    statements,
                };
            }
            let before = self.pos;
            statements.push(self.parse_statement());
            if self.pos == before {
                self.bump();
            }
        }
    }

    fn parse_statement(&mut self) -> Statement {
        let start = self.pos;
        let outer = self.lambda_bodies.replace(Vec::new());
        let kind = self.parse_statement_kind();
        let lambda_bodies = std::mem::replace(&mut self.lambda_bodies, outer).unwrap_or_default();
        Statement {
            kind,
            range: TokenRange::new(start, self.pos),
            lambda_bodies,
        }
    }

    fn parse_embedded(&mut self) -> Box<Statement> {
        Box::new(self.parse_statement())
    }

    fn parse_statement_kind(&mut self) -> StatementKind {
        if self.is_symbolic(self.pos) {
            match self.cur_text() {
                "{" => return StatementKind::Block(self.parse_block()),
                ";" => {
                    self.bump();
                    return StatementKind::Other;
                }
                "if" => {
                    self.bump();
                    self.skip_parens();
                    let then_branch = self.parse_embedded();
                    let else_branch = self.eat("else").map(|_| self.parse_embedded());
                    return StatementKind::If {
                        then_branch,
                        else_branch,
                    };
                }
                "while" | "lock" | "fixed" => {
                    self.bump();
                    let variables = self.parse_header_declaration();
                    let body = self.parse_embedded();
                    return StatementKind::Loop { variables, body };
                }
                "using" if self.peek_is(1, "(") => {
                    self.bump();
                    let variables = self.parse_header_declaration();
                    let body = self.parse_embedded();
                    return StatementKind::Loop { variables, body };
                }
                "for" => {
                    self.bump();
                    let variables = self.parse_header_declaration();
                    let body = self.parse_embedded();
                    return StatementKind::Loop { variables, body };
                }
                "foreach" => return self.parse_foreach(),
                "await" if self.peek_is(1, "foreach") => {
                    self.bump();
                    return self.parse_foreach();
                }
                "do" => {
                    self.bump();
                    let body = self.parse_embedded();
                    if self.eat("while").is_some() {
                        self.skip_parens();
                    }
                    self.expect(";");
                    return StatementKind::Loop {
                        variables: Vec::new(),
                        body,
                    };
                }
                "try" => return self.parse_try(),
                "switch" if self.peek_is(1, "(") => {
                    self.bump();
                    self.skip_parens();
                    let sections = if self.at("{") {
                        self.parse_switch_sections()
                    } else {
                        Vec::new()
                    };
                    return StatementKind::Switch { sections };
                }
                "checked" | "unchecked" | "unsafe" if self.peek_is(1, "{") => {
                    self.bump();
                    return StatementKind::Block(self.parse_block());
                }
                "return" | "throw" | "break" | "continue" | "goto" | "yield" => {
                    self.skip_simple();
                    return StatementKind::Other;
                }
                _ => {}
            }
        }
        if self.at_identifier() && self.peek_is(1, ":") {
            self.bump();
            self.bump();
            return StatementKind::Labeled(self.parse_embedded());
        }
        if let Some(function) = self.try_local_function() {
            return StatementKind::LocalFunction(Box::new(function));
        }
        self.parse_simple_statement()
    }

    /// `( ... )` header of `for`/`using`/`fixed`/`while`, returning any
    /// variables declared at its start.
    fn parse_header_declaration(&mut self) -> Vec<LocalVariable> {
        if !self.at("(") {
            return Vec::new();
        }
        let open = self.pos;
        self.bump();
        let mut variables = Vec::new();
        if let Some(ty) = self.try_declaration_head() {
            let declarators = self.parse_header_declarators();
            variables = declarators
                .into_iter()
                .map(|d| LocalVariable {
                    ty: ty.clone(),
                    name: d.name,
                    name_token: d.name_token,
                    initializer: d.initializer,
                })
                .collect();
        }
        self.pos = open;
        self.skip_balanced();
        variables
    }

    fn parse_header_declarators(&mut self) -> Vec<VariableDeclarator> {
        let mut declarators = Vec::new();
        while self.at_identifier() {
            let name_token = self.bump();
            let initializer = if self.eat("=").is_some() {
                let init_start = self.pos;
                self.skip_until(&[",", ";"]);
                Some(TokenRange::new(init_start, self.pos))
            } else {
                None
            };
            declarators.push(VariableDeclarator {
                name: self.text_of(name_token).to_string(),
                name_token,
                initializer,
            });
            if self.eat(",").is_none() {
                break;
            }
        }
        declarators
    }

    fn parse_foreach(&mut self) -> StatementKind {
        self.bump();
        let mut variables = Vec::new();
        if self.at("(") {
            let open = self.pos;
            self.bump();
            if let Some(ty) = self.parse_type() {
                if self.at_identifier() && self.peek_is(1, "in") {
                    let name_token = self.bump();
                    variables.push(LocalVariable {
                        ty,
                        name: self.text_of(name_token).to_string(),
                        name_token,
                        initializer: None,
                    });
                }
            }
            self.pos = open;
            self.skip_balanced();
        }
        let body = self.parse_embedded();
        StatementKind::Loop { variables, body }
    }

    fn parse_try(&mut self) -> StatementKind {
        self.bump();
        let block = self.parse_block_or_empty();
        let mut catches = Vec::new();
        while self.eat("catch").is_some() {
            let mut variable = None;
            if self.at("(") {
                let open = self.pos;
                self.bump();
                if let Some(ty) = self.parse_type() {
                    if self.at_identifier() {
                        let name_token = self.bump();
                        variable = Some(LocalVariable {
                            ty,
                            name: self.text_of(name_token).to_string(),
                            name_token,
                            initializer: None,
                        });
                    }
                }
                self.pos = open;
                self.skip_balanced();
            }
            if self.eat("when").is_some() {
                self.skip_parens();
            }
            let block = self.parse_block_or_empty();
            catches.push(CatchClause { variable, block });
        }
        let finally = self.eat("finally").map(|_| self.parse_block_or_empty());
        StatementKind::Try {
            block,
            catches,
            finally,
        }
    }

    fn parse_block_or_empty(&mut self) -> Block {
        if self.at("{") {
            self.parse_block()
        } else {
            self.error("expected block".to_string());
            Block {
                open: self.pos,
                close: None,
                statements: Vec::new(),
            }
        }
    }

    fn at_switch_label(&self) -> bool {
        self.at("case") || (self.at("default") && self.peek_is(1, ":"))
    }

    fn parse_switch_sections(&mut self) -> Vec<SwitchSection> {
        self.bump();
        let mut sections = Vec::new();
        loop {
            if self.eat("}").is_some() || self.is_eof() {
                break;
            }
            let label_start = self.pos;
            while self.at_switch_label() {
                self.bump();
                self.skip_until(&[":"]);
                self.expect(":");
            }
            let labels = TokenRange::new(label_start, self.pos);
            let mut statements = Vec::new();
            while !self.at_switch_label() && !self.at("}") && !self.is_eof() {
                let before = self.pos;
                statements.push(self.parse_statement());
                if self.pos == before {
                    self.bump();
                }
            }
            sections.push(SwitchSection { labels, statements });
            if self.pos == label_start {
                self.bump();
            }
        }
        sections
    }

    /// Recognizes `[modifiers] Type Name` followed by `=`, `;` or `,`,
    /// leaving the parser on the name. Restores the position otherwise.
    fn try_declaration_head(&mut self) -> Option<TypeSyntax> {
        let start = self.pos;
        loop {
            match self.cur_text() {
                "const" | "ref" | "readonly" | "scoped" | "using" => {
                    self.bump();
                }
                "await" if self.peek_is(1, "using") => {
                    self.bump();
                }
                _ => break,
            }
        }
        if let Some(ty) = self.parse_type() {
            if self.at_identifier()
                && (self.peek_is(1, "=") || self.peek_is(1, ";") || self.peek_is(1, ","))
            {
                return Some(ty);
            }
        }
        self.pos = start;
        None
    }

    fn try_local_function(&mut self) -> Option<MethodDecl> {
        let start = self.pos;
        let modifiers = self.parse_modifiers();
        let Some(return_type) = self.parse_type() else {
            self.pos = start;
            return None;
        };
        if !self.at_identifier() {
            self.pos = start;
            return None;
        }
        let name_token = self.bump();
        let after_name = self.pos;
        self.skip_angles();
        if !self.at("(") {
            self.pos = start;
            return None;
        }
        self.skip_balanced();
        while self.at("where") {
            self.bump();
            self.skip_until(&["{", "=>", ";", "where"]);
        }
        if !(self.at("{") || self.at("=>")) {
            self.pos = start;
            return None;
        }
        self.pos = after_name;
        let name = self.text_of(name_token).to_string();
        Some(self.parse_method_tail(start, modifiers, return_type, name, name_token))
    }

    fn parse_simple_statement(&mut self) -> StatementKind {
        if let Some(ty) = self.try_declaration_head() {
            let name_token = self.bump();
            let name = self.text_of(name_token).to_string();
            let declarators = self.parse_declarators_after_first(name, name_token);
            let variables = declarators
                .into_iter()
                .map(|d| LocalVariable {
                    ty: ty.clone(),
                    name: d.name,
                    name_token: d.name_token,
                    initializer: d.initializer,
                })
                .collect();
            return StatementKind::LocalDeclaration(variables);
        }
        self.skip_simple();
        StatementKind::Expression
    }

    fn skip_simple(&mut self) {
        self.skip_until(&[";"]);
        self.expect(";");
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::SyntaxTree;
    use crate::syntax::ast::*;

    fn parse(text: &str) -> SyntaxTree {
        SyntaxTree::parse("test.cs", text)
    }

    fn first_type(tree: &SyntaxTree) -> &TypeDecl {
        fn find(members: &[NamespaceMember]) -> Option<&TypeDecl> {
            members.iter().find_map(|m| match m {
                NamespaceMember::Type(ty) => Some(ty),
                NamespaceMember::Namespace(ns) => find(&ns.members),
            })
        }
        find(&tree.root().members).expect("a type declaration")
    }

    #[test]
    fn parses_namespaces_usings_and_types() {
        let tree = parse(
            "using System;\nusing Alias = Foo.Bar;\nnamespace A.B\n{\n    [SignalsSource]\n    public partial class C<T> : Base where T : new()\n    {\n    }\n}\n",
        );
        assert!(tree.errors().is_empty(), "{:?}", tree.errors());
        let root = tree.root();
        assert_eq!(root.usings.len(), 2);
        assert_eq!(root.usings[1].alias.as_deref(), Some("Alias"));
        assert_eq!(root.usings[1].target, "Foo.Bar");
        let NamespaceMember::Namespace(ns) = &root.members[0] else {
            panic!("expected namespace");
        };
        assert_eq!(ns.name, "A.B");
        let ty = first_type(&tree);
        assert_eq!(ty.name, "C");
        assert_eq!(ty.type_parameters.as_deref(), Some("<T>"));
        assert_eq!(ty.attributes[0].name, "SignalsSource");
        assert!(ty.is_partial() && ty.is_public());
    }

    #[test]
    fn parses_file_scoped_namespace() {
        let tree = parse("namespace A.B;\nclass C { }\nclass D { }\n");
        let NamespaceMember::Namespace(ns) = &tree.root().members[0] else {
            panic!("expected namespace");
        };
        assert!(ns.file_scoped);
        assert_eq!(ns.members.len(), 2);
    }

    #[test]
    fn parses_members() {
        let tree = parse(
            r#"class C
{
    public partial class SignalsMultiplex { }
    public readonly SignalsMultiplex signals = new SignalsMultiplex(), other;
    private int _count;
    public string Name { get; set; } = "x";
    public int Size => _count;
    public C(int count) : base() { _count = count; }
    public event EventHandler Changed;
    enum Kind { A, B }
    public void Method(int a, ref string b, params object[] rest) { }
    int Twice(int x) => x * 2;
    public abstract void Abstract();
}
"#,
        );
        assert!(tree.errors().is_empty(), "{:?}", tree.errors());
        let ty = first_type(&tree);
        assert_eq!(ty.nested_types().count(), 1);
        let fields: Vec<&FieldDecl> = ty.fields().collect();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].ty.text, "SignalsMultiplex");
        let names: Vec<&str> = fields[0].declarators.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["signals", "other"]);
        let props: Vec<&str> = ty.properties().map(|p| p.name.as_str()).collect();
        assert_eq!(props, vec!["Name", "Size"]);
        let methods: Vec<&MethodDecl> = ty.methods().collect();
        assert_eq!(methods.len(), 3);
        assert_eq!(methods[0].parameters.len(), 3);
        assert_eq!(methods[0].parameters[1].modifier.as_deref(), Some("ref"));
        assert_eq!(methods[0].parameters[2].ty.text, "object[]");
        assert!(matches!(methods[1].body, MethodBody::Expression(_)));
        assert!(matches!(methods[2].body, MethodBody::None));
    }

    #[test]
    fn parses_statement_structure() {
        let tree = parse(
            r#"class C
{
    void M(int[] xs)
    {
        int a = 10, b;
        int? n = null;
        Tuple<int, int> t = Tuple.Create(a, a);
        var list = new List<string> { "x" };
        signals.M_Begin(a, n);
        if (a > 1) { b = 2; } else b = 3;
        foreach (var x in xs) { }
        for (int i = 0; i < 3; i++) Console.WriteLine(i);
        try { } catch (Exception e) when (e != null) { } finally { }
        switch (a) { case 1: break; default: return; }
        Action f = () => { Run(); };
        int Local(int q) { return q; }
        label: a++;
    }
}
"#,
        );
        assert!(tree.errors().is_empty(), "{:?}", tree.errors());
        let method = first_type(&tree).methods().next().expect("method");
        let block = method.block().expect("block body");
        let kinds: Vec<&'static str> = block
            .statements
            .iter()
            .map(|s| match &s.kind {
                StatementKind::Block(_) => "block",
                StatementKind::LocalDeclaration(_) => "local",
                StatementKind::Expression => "expr",
                StatementKind::If { .. } => "if",
                StatementKind::Loop { .. } => "loop",
                StatementKind::Try { .. } => "try",
                StatementKind::Switch { .. } => "switch",
                StatementKind::LocalFunction(_) => "function",
                StatementKind::Labeled(_) => "label",
                StatementKind::Other => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "local", "local", "local", "local", "expr", "if", "loop", "loop", "try", "switch",
                "local", "function", "label"
            ]
        );

        let mut declared = Vec::new();
        for statement in &block.statements {
            statement.walk(&mut |s| {
                for v in s.declared_variables() {
                    declared.push((v.name.clone(), v.ty.text.clone()));
                }
            });
        }
        assert!(declared.contains(&("b".to_string(), "int".to_string())));
        assert!(declared.contains(&("n".to_string(), "int?".to_string())));
        assert!(declared.contains(&("t".to_string(), "Tuple<int, int>".to_string())));
        assert!(declared.contains(&("x".to_string(), "var".to_string())));
        assert!(declared.contains(&("i".to_string(), "int".to_string())));
        assert!(declared.contains(&("e".to_string(), "Exception".to_string())));
    }

    #[test]
    fn keeps_lambda_and_anonymous_method_blocks() {
        let tree = parse(
            r#"class C
{
    void M()
    {
        Action a = () => { Run(); Stop(); };
        Task.Run(async () =>
        {
            await Go(x => x + 1);
            list.ForEach(delegate (int i) { Use(i); });
        });
        handler += delegate { Done(); };
        Func<int, int> f = x => x * 2;
    }
}
"#,
        );
        assert!(tree.errors().is_empty(), "{:?}", tree.errors());
        let method = first_type(&tree).methods().next().expect("method");
        let statements = &method.block().expect("block body").statements;
        let counts: Vec<usize> = statements.iter().map(|s| s.lambda_bodies.len()).collect();
        assert_eq!(counts, vec![1, 1, 1, 0]);
        assert_eq!(statements[0].lambda_bodies[0].statements.len(), 2);

        let outer = &statements[1].lambda_bodies[0];
        assert_eq!(outer.statements.len(), 2);
        assert!(outer.statements[0].lambda_bodies.is_empty());
        assert_eq!(outer.statements[1].lambda_bodies.len(), 1);

        let mut lists = 0;
        method
            .block()
            .expect("block body")
            .visit_statement_lists(&mut |_| lists += 1);
        assert_eq!(lists, 5);
    }

    #[test]
    fn tolerates_broken_input() {
        let tree = parse("class C { void M() { int x = ; ");
        assert!(!tree.errors().is_empty());
        assert_eq!(first_type(&tree).name, "C");
    }
}
