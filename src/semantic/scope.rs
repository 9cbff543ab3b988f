//! Names visible inside a method body and static typing of simple
//! expressions.
//!
//! Typing is deliberately shallow: it covers what dispatch arguments look
//! like in practice (locals, parameters, members, literals, constructions,
//! casts, arithmetic). Anything else is `None` and callers fall back to
//! `object`.

use crate::syntax::ast::{MethodDecl, TokenRange};
use crate::syntax::{SyntaxTree, TokenId, TokenKind};

use super::display::display_type;
use super::{NamedType, SymbolTable};

const MAX_INFERENCE_DEPTH: usize = 8;

#[derive(Debug, Clone)]
struct Local {
    name: String,
    /// Declared type text; `None` for `var` and untyped out variables.
    ty: Option<String>,
    initializer: Option<TokenRange>,
    visible_from: TokenId,
}

/// Lexical scope of one method of an annotated type.
pub struct MethodScope<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    owner: &'s NamedType<'a>,
    tree: &'a SyntaxTree,
    locals: Vec<Local>,
}

impl<'s, 'a> MethodScope<'s, 'a> {
    pub fn new(
        symbols: &'s SymbolTable<'a>,
        owner: &'s NamedType<'a>,
        tree: &'a SyntaxTree,
        method: &'a MethodDecl,
    ) -> Self {
        let mut locals: Vec<Local> = method
            .parameters
            .iter()
            .map(|p| Local {
                name: p.name.clone(),
                ty: Some(p.ty.text.clone()),
                initializer: None,
                visible_from: 0,
            })
            .collect();

        if let Some(block) = method.block() {
            for statement in &block.statements {
                statement.walk(&mut |s| {
                    for variable in s.declared_variables() {
                        locals.push(Local {
                            name: variable.name.clone(),
                            ty: (!variable.ty.is_var()).then(|| variable.ty.text.clone()),
                            initializer: variable.initializer,
                            visible_from: variable.name_token,
                        });
                    }
                });
            }
        }
        if let Some(body) = method.body_range() {
            locals.extend(out_variables(tree, body));
        }
        locals.sort_by_key(|l| l.visible_from);

        Self {
            symbols,
            owner,
            tree,
            locals,
        }
    }

    fn text(&self, id: TokenId) -> &'a str {
        self.tree.token_text(id)
    }

    fn kind(&self, id: TokenId) -> TokenKind {
        self.tree.token(id).kind
    }

    /// Display type of a name visible at `at`.
    pub fn lookup(&self, name: &str, at: TokenId) -> Option<String> {
        self.lookup_at_depth(name, at, 0)
    }

    fn lookup_at_depth(&self, name: &str, at: TokenId, depth: usize) -> Option<String> {
        let local = self
            .locals
            .iter()
            .rev()
            .find(|l| l.name == name && l.visible_from <= at);
        if let Some(local) = local {
            return match (&local.ty, local.initializer) {
                (Some(ty), _) => Some(display_type(ty)),
                (None, Some(init)) if depth < MAX_INFERENCE_DEPTH => {
                    self.type_at_depth(init, depth + 1)
                }
                _ => None,
            };
        }
        self.member_of_owner(name)
    }

    fn member_of_owner(&self, name: &str) -> Option<String> {
        if let Some(ty) = self.owner.member_type(name) {
            return Some(display_type(&ty.text));
        }
        self.owner.containing().iter().rev().find_map(|outer| {
            outer
                .fields()
                .find(|f| f.declarators.iter().any(|d| d.name == name))
                .map(|f| display_type(&f.ty.text))
                .or_else(|| {
                    outer
                        .properties()
                        .find(|p| p.name == name)
                        .map(|p| display_type(&p.ty.text))
                })
        })
    }

    /// Member `name` of a value of display type `ty`, for types declared in
    /// the compilation.
    fn member_of_type(&self, ty: &str, name: &str) -> Option<String> {
        let base = ty.trim_end_matches('?');
        let simple = base.split('<').next().unwrap_or(base);
        let simple = simple.rsplit('.').next().unwrap_or(simple);
        if simple == self.owner.name {
            return self.member_of_owner(name);
        }
        self.symbols
            .by_simple_name(simple)
            .find_map(|candidate| candidate.member_type(name))
            .map(|t| display_type(&t.text))
    }

    /// Static display type of the expression spanning `range`.
    pub fn type_of(&self, range: TokenRange) -> Option<String> {
        self.type_at_depth(range, 0)
    }

    fn type_at_depth(&self, range: TokenRange, depth: usize) -> Option<String> {
        let TokenRange { start, end } = range;
        if start >= end || depth > MAX_INFERENCE_DEPTH {
            return None;
        }
        let operators = self.top_level_operators(range);

        // Conditional `c ? a : b`.
        if let Some(&question) = operators.iter().find(|&&id| self.text(id) == "?") {
            if let Some(&colon) = operators
                .iter()
                .find(|&&id| id > question && self.text(id) == ":")
            {
                return self.type_at_depth(TokenRange::new(question + 1, colon), depth);
            }
        }
        if let Some(&coalesce) = operators.iter().find(|&&id| self.text(id) == "??") {
            let left = self.type_at_depth(TokenRange::new(start, coalesce), depth);
            return left
                .map(|t| t.trim_end_matches('?').to_string())
                .or_else(|| self.type_at_depth(TokenRange::new(coalesce + 1, end), depth));
        }
        if let Some(&as_op) = operators.iter().find(|&&id| self.text(id) == "as") {
            let ty = self.tree.slice(TokenRange::new(as_op + 1, end));
            return Some(display_type(ty));
        }
        let creation = self.text(start) == "new";
        if operators.iter().any(|&id| match self.text(id) {
            "==" | "!=" | "<=" | ">=" | "&&" | "||" | "is" => true,
            "<" | ">" => !creation,
            _ => false,
        }) {
            return Some("bool".to_string());
        }

        let arithmetic: Vec<TokenId> = operators
            .iter()
            .copied()
            .filter(|&id| id > start && matches!(self.text(id), "+" | "-" | "*" | "/" | "%"))
            .filter(|&id| !self.is_operator_position(id - 1))
            .collect();
        if !arithmetic.is_empty() {
            let mut operand_types = Vec::new();
            let mut from = start;
            for &op in arithmetic.iter().chain(std::iter::once(&end)) {
                operand_types.push(self.type_at_depth(TokenRange::new(from, op), depth));
                from = op + 1;
            }
            return combine_arithmetic(&operand_types);
        }

        self.type_of_unary(range, depth)
    }

    fn type_of_unary(&self, range: TokenRange, depth: usize) -> Option<String> {
        let TokenRange { start, end } = range;
        match self.text(start) {
            "!" => return Some("bool".to_string()),
            "-" | "+" | "~" | "++" | "--" => {
                return self.type_at_depth(TokenRange::new(start + 1, end), depth)
            }
            "await" if self.kind(start) == TokenKind::Identifier && end - start > 1 => {
                return None;
            }
            _ => {}
        }
        if end - start > 1 && matches!(self.text(end - 1), "++" | "--") {
            return self.type_at_depth(TokenRange::new(start, end - 1), depth);
        }
        self.type_of_primary(range, depth)
    }

    fn type_of_primary(&self, range: TokenRange, depth: usize) -> Option<String> {
        let TokenRange { start, end } = range;
        let first = self.text(start);

        if first == "(" {
            let close = self.matching(start, end)?;
            if close + 1 == end {
                return self.type_at_depth(TokenRange::new(start + 1, close), depth);
            }
            if self.looks_like_type(TokenRange::new(start + 1, close)) {
                return Some(display_type(self.tree.slice(TokenRange::new(start + 1, close))));
            }
            return None;
        }

        match self.kind(start) {
            TokenKind::IntLiteral if end - start == 1 => return Some(int_literal_type(first)),
            TokenKind::RealLiteral if end - start == 1 => return Some(real_literal_type(first)),
            TokenKind::StringLiteral if end - start == 1 => return Some("string".to_string()),
            TokenKind::CharLiteral if end - start == 1 => return Some("char".to_string()),
            _ => {}
        }

        match first {
            "true" | "false" => return Some("bool".to_string()),
            "null" => return None,
            "nameof" => return Some("string".to_string()),
            "typeof" => return Some("System.Type".to_string()),
            "sizeof" => return Some("int".to_string()),
            "default" if self.text(start + 1) == "(" => {
                let close = self.matching(start + 1, end)?;
                return Some(display_type(
                    self.tree.slice(TokenRange::new(start + 2, close)),
                ));
            }
            "new" => return self.type_of_creation(range),
            _ => {}
        }

        self.type_of_member_chain(range, depth)
    }

    fn type_of_creation(&self, range: TokenRange) -> Option<String> {
        let TokenRange { start, end } = range;
        let type_start = start + 1;
        let mut cursor = type_start;
        let mut angle = 0usize;
        while cursor < end {
            match self.text(cursor) {
                "<" => angle += 1,
                ">" => angle = angle.saturating_sub(1),
                "(" | "{" | "[" if angle == 0 => break,
                _ => {}
            }
            cursor += 1;
        }
        if cursor == type_start {
            // `new()` and `new[] { ... }` take their type from context.
            return None;
        }
        let ty = display_type(self.tree.slice(TokenRange::new(type_start, cursor)));
        if cursor < end && self.text(cursor) == "[" {
            let close = self.matching(cursor, end)?;
            let commas = (cursor + 1..close).filter(|&id| self.text(id) == ",").count();
            return Some(format!("{ty}[{}]", ",".repeat(commas)));
        }
        Some(ty)
    }

    /// `name`, `this.name`, `a.b.c`, `a[i]`.
    fn type_of_member_chain(&self, range: TokenRange, depth: usize) -> Option<String> {
        let TokenRange { start, end } = range;
        let mut cursor = start;
        let mut current = if self.text(start) == "this" {
            cursor += 1;
            Some(self.owner.name.clone())
        } else if self.kind(start) == TokenKind::Identifier
            || (self.kind(start) == TokenKind::Keyword && is_type_keyword(self.text(start)))
        {
            cursor += 1;
            let name = self.text(start);
            match self.lookup_at_depth(name.trim_start_matches('@'), start, depth) {
                Some(ty) => Some(ty),
                None => self.symbols.by_simple_name(name).next().map(|t| t.name.clone()),
            }
        } else {
            None
        };

        while cursor < end {
            let ty = current.take()?;
            match self.text(cursor) {
                "." | "?." if cursor + 1 < end && self.kind(cursor + 1) == TokenKind::Identifier => {
                    let member = self.text(cursor + 1);
                    if cursor + 2 < end && self.text(cursor + 2) == "(" {
                        return None;
                    }
                    current = if ty == self.owner.name && start + 1 == cursor && self.text(start) == "this" {
                        self.member_of_owner(member)
                    } else {
                        self.member_of_type(&ty, member)
                    };
                    cursor += 2;
                }
                "[" => {
                    let close = self.matching(cursor, end)?;
                    current = ty
                        .strip_suffix("[]")
                        .map(str::to_string)
                        .or_else(|| (ty == "string").then(|| "char".to_string()));
                    cursor = close + 1;
                }
                "!" => {
                    current = Some(ty);
                    cursor += 1;
                }
                _ => return None,
            }
        }
        current
    }

    fn looks_like_type(&self, range: TokenRange) -> bool {
        !range.is_empty()
            && (range.start..range.end).all(|id| match self.kind(id) {
                TokenKind::Identifier => true,
                TokenKind::Keyword => is_type_keyword(self.text(id)),
                TokenKind::Punct => {
                    matches!(self.text(id), "." | "<" | ">" | "," | "?" | "[" | "]" | "::")
                }
                _ => false,
            })
    }

    fn matching(&self, open: TokenId, end: TokenId) -> Option<TokenId> {
        let mut depth = 0usize;
        for id in open..end {
            match self.text(id) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(id);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Operator tokens outside any bracket.
    fn top_level_operators(&self, range: TokenRange) -> Vec<TokenId> {
        let mut depth = 0usize;
        let mut found = Vec::new();
        for id in range.start..range.end {
            if self.kind(id) == TokenKind::StringLiteral {
                continue;
            }
            match self.text(id) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "?" | ":" | "??" | "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "is"
                | "as" | "+" | "-" | "*" | "/" | "%"
                    if depth == 0 =>
                {
                    found.push(id)
                }
                _ => {}
            }
        }
        found
    }

    /// Whether the token makes a following `+`/`-` unary.
    fn is_operator_position(&self, id: TokenId) -> bool {
        self.kind(id) == TokenKind::Punct && !matches!(self.text(id), ")" | "]" | "++" | "--")
    }
}

fn is_type_keyword(text: &str) -> bool {
    crate::syntax::token::is_predefined_type(text)
}

fn out_variables(tree: &SyntaxTree, body: TokenRange) -> Vec<Local> {
    let mut found = Vec::new();
    for id in body.start..body.end {
        if tree.token_text(id) != "out" {
            continue;
        }
        // `out T name` followed by `)` or `,`.
        let mut cursor = id + 1;
        while cursor < body.end && !matches!(tree.token_text(cursor), ")" | "," | ";" | "(") {
            cursor += 1;
        }
        let name_token = cursor.saturating_sub(1);
        if name_token <= id + 1 || tree.token(name_token).kind != TokenKind::Identifier {
            continue;
        }
        let ty = tree.slice(TokenRange::new(id + 1, name_token)).to_string();
        found.push(Local {
            name: tree.token_text(name_token).to_string(),
            ty: (ty != "var").then_some(ty),
            initializer: None,
            visible_from: name_token,
        });
    }
    found
}

fn int_literal_type(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let ty = if lower.ends_with("ul") || lower.ends_with("lu") {
        "ulong"
    } else if lower.ends_with('u') {
        "uint"
    } else if lower.ends_with('l') {
        "long"
    } else {
        "int"
    };
    ty.to_string()
}

fn real_literal_type(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let ty = if lower.ends_with('f') {
        "float"
    } else if lower.ends_with('m') {
        "decimal"
    } else {
        "double"
    };
    ty.to_string()
}

fn numeric_rank(ty: &str) -> Option<u8> {
    Some(match ty {
        "byte" | "sbyte" | "short" | "ushort" | "char" | "int" => 0,
        "uint" => 1,
        "long" => 2,
        "ulong" => 3,
        "float" => 4,
        "double" => 5,
        "decimal" => 6,
        _ => return None,
    })
}

fn combine_arithmetic(operands: &[Option<String>]) -> Option<String> {
    if operands.iter().any(|t| t.as_deref() == Some("string")) {
        return Some("string".to_string());
    }
    let mut best: Option<(u8, &str)> = None;
    for operand in operands {
        let ty = operand.as_deref()?;
        let rank = numeric_rank(ty)?;
        if best.map_or(true, |(r, _)| rank > r) {
            best = Some((rank, if rank == 0 { "int" } else { ty }));
        }
    }
    best.map(|(_, ty)| ty.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::Compilation;
    use crate::syntax::ast::StatementKind;
    use indoc::indoc;
    use std::path::PathBuf;

    const SOURCE: &str = indoc! {r#"
        namespace App
        {
            public class Route { public Point Destination; }
            public class Point { public double X { get; set; } }

            public partial class Client
            {
                private readonly Route _route = new Route();
                public string Name { get; }

                public void Method(int a, ref long b)
                {
                    var c = a + 10;
                    var total = c * 2.5;
                    var label = "x" + a;
                    int.TryParse("1", out var parsed);
                    int.TryParse("2", out short explicitOut);
                    var items = new List<string>();
                    var grid = new int[3, 4];
                    Probe(a, b, c, total, label, _route, this.Name, _route.Destination.X, (float)a, a > 1, 5u, 'q', items, grid, parsed, explicitOut, Helper(), null, new(), -a);
                }
            }
        }
    "#};

    fn probe_types() -> Vec<Option<String>> {
        let compilation =
            Compilation::from_sources(vec![(PathBuf::from("client.cs"), SOURCE.to_string())]);
        let symbols = compilation.symbols();
        let owner = symbols.get("App.Client", 0).expect("client");
        let (fragment, method) = owner.methods().next().expect("method");
        let scope = MethodScope::new(&symbols, owner, fragment.tree, method);
        let block = method.block().expect("body");
        let probe = block
            .statements
            .iter()
            .find(|s| {
                matches!(s.kind, StatementKind::Expression)
                    && fragment.tree.token_text(s.range.start) == "Probe"
            })
            .expect("probe call");

        let open = probe.range.start + 1;
        let mut args = Vec::new();
        let mut depth = 0usize;
        let mut from = open + 1;
        for id in open..probe.range.end {
            match fragment.tree.token_text(id) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth -= 1;
                    if depth == 0 {
                        args.push(TokenRange::new(from, id));
                        break;
                    }
                }
                "," if depth == 1 => {
                    args.push(TokenRange::new(from, id));
                    from = id + 1;
                }
                _ => {}
            }
        }
        args.into_iter().map(|range| scope.type_of(range)).collect()
    }

    #[test]
    fn infers_argument_types() {
        let types = probe_types();
        let expected = [
            Some("int"),
            Some("long"),
            Some("int"),
            Some("double"),
            Some("string"),
            Some("Route"),
            Some("string"),
            Some("double"),
            Some("float"),
            Some("bool"),
            Some("uint"),
            Some("char"),
            Some("List<string>"),
            Some("int[,]"),
            None,
            Some("short"),
            None,
            None,
            None,
            Some("int"),
        ];
        let actual: Vec<Option<&str>> = types.iter().map(|t| t.as_deref()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn combines_numeric_operands() {
        let ops = |tys: &[&str]| {
            combine_arithmetic(&tys.iter().map(|t| Some(t.to_string())).collect::<Vec<_>>())
        };
        assert_eq!(ops(&["short", "byte"]).as_deref(), Some("int"));
        assert_eq!(ops(&["int", "long"]).as_deref(), Some("long"));
        assert_eq!(ops(&["int", "string"]).as_deref(), Some("string"));
        assert_eq!(combine_arithmetic(&[Some("int".into()), None]), None);
    }
}
