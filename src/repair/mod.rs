//! Localized edits that resolve one diagnostic each.
//!
//! A repair re-locates its target in the current text, so it can be applied
//! to a document that changed since the diagnostic was produced. When the
//! target already satisfies the check the plan is empty and the document is
//! returned unchanged.

pub mod edit;

use tracing::debug;

use crate::config::SigmuxConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::dispatch::starts_dispatch_call;
use crate::errors::RepairError;
use crate::synthesis::descriptor::marker_member_name;
use crate::syntax::ast::{MethodDecl, NamespaceMember, TypeDecl};
use crate::syntax::{Span, SyntaxTree, TokenId, TriviaKind};
use crate::validator::declaration_span;

pub use edit::{apply_text_edits, TextEdit};

const ACCESSIBILITY: &[&str] = &["private", "protected", "internal", "public"];

/// Inputs a repair needs beyond the document.
#[derive(Debug, Clone)]
pub struct RepairContext<'c> {
    pub config: &'c SigmuxConfig,
    /// Dispatcher field declared on the type in any document, if one exists.
    pub field_name: Option<String>,
}

impl<'c> RepairContext<'c> {
    pub fn new(config: &'c SigmuxConfig) -> Self {
        Self {
            config,
            field_name: None,
        }
    }

    pub fn with_field_name(mut self, field_name: Option<String>) -> Self {
        self.field_name = field_name;
        self
    }

    fn dispatcher_type(&self) -> &str {
        &self.config.generation.dispatcher_type
    }
}

/// Short description of the fix for a diagnostic kind.
pub fn fix_title(kind: DiagnosticKind) -> &'static str {
    match kind {
        DiagnosticKind::NonPartialType => "Make type partial",
        DiagnosticKind::MissingMultiplexType => "Add dispatcher partial class",
        DiagnosticKind::MultiplexNotPublic => "Make dispatcher public",
        DiagnosticKind::MultiplexNotPartial => "Make dispatcher partial",
        DiagnosticKind::MissingMultiplexField => "Add dispatcher field",
        DiagnosticKind::MarkerWithoutDispatch => "Add dispatch call",
    }
}

/// Applies the repair for `diagnostic` and reparses.
pub fn repair(
    diagnostic: &Diagnostic,
    tree: &SyntaxTree,
    ctx: &RepairContext<'_>,
) -> Result<SyntaxTree, RepairError> {
    let edits = plan(diagnostic, tree, ctx)?;
    if edits.is_empty() {
        debug!(id = diagnostic.id(), "repair target already satisfied");
        return Ok(tree.clone());
    }
    Ok(tree.with_text(apply_text_edits(tree.text(), &edits)))
}

/// Edits that resolve `diagnostic` in `tree`; empty when nothing is left
/// to do.
pub fn plan(
    diagnostic: &Diagnostic,
    tree: &SyntaxTree,
    ctx: &RepairContext<'_>,
) -> Result<Vec<TextEdit>, RepairError> {
    let kind = diagnostic.kind;
    match kind {
        DiagnosticKind::NonPartialType => {
            let candidates = type_declarations(tree, diagnostic)?;
            let target = candidates
                .iter()
                .find(|decl| !decl.is_partial())
                .copied()
                .unwrap_or(candidates[0]);
            Ok(make_partial(tree, target))
        }
        DiagnosticKind::MissingMultiplexType => {
            let decl = annotated_declaration(tree, diagnostic)?;
            if find_dispatcher(decl, ctx.dispatcher_type()).is_some() {
                return Ok(Vec::new());
            }
            let member = format!("public partial class {} {{ }}", ctx.dispatcher_type());
            Ok(vec![insert_first_member(tree, decl, &member, ctx, kind)?])
        }
        DiagnosticKind::MultiplexNotPublic => {
            let dispatcher = dispatcher_declaration(tree, diagnostic, ctx)?;
            Ok(make_public(tree, dispatcher))
        }
        DiagnosticKind::MultiplexNotPartial => {
            let dispatcher = dispatcher_declaration(tree, diagnostic, ctx)?;
            Ok(make_partial(tree, dispatcher))
        }
        DiagnosticKind::MissingMultiplexField => {
            let decl = annotated_declaration(tree, diagnostic)?;
            let dispatcher_type = ctx.dispatcher_type();
            let has_field = decl.fields().any(|field| field.ty.simple_name() == dispatcher_type);
            if has_field || ctx.field_name.is_some() {
                return Ok(Vec::new());
            }
            let member = format!(
                "public readonly {dispatcher_type} {} = new {dispatcher_type}();",
                ctx.config.repair.field_name
            );
            let direct = decl
                .nested_types()
                .find(|nested| nested.name == dispatcher_type);
            let edit = match direct {
                Some(dispatcher) => insert_after_member(tree, decl, dispatcher, &member, ctx, kind)?,
                None => insert_first_member(tree, decl, &member, ctx, kind)?,
            };
            Ok(vec![edit])
        }
        DiagnosticKind::MarkerWithoutDispatch => add_dispatch_call(diagnostic, tree, ctx),
    }
}

fn target_not_found(kind: DiagnosticKind, detail: String) -> RepairError {
    RepairError::TargetNotFound { kind, detail }
}

/// Every type declared in `tree` with its qualified name, outermost first.
pub fn declared_types(tree: &SyntaxTree) -> Vec<(String, &TypeDecl)> {
    fn qualify(prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        }
    }
    fn collect_type<'t>(decl: &'t TypeDecl, prefix: &str, out: &mut Vec<(String, &'t TypeDecl)>) {
        let name = qualify(prefix, &decl.name);
        for nested in decl.nested_types() {
            collect_type(nested, &name, out);
        }
        out.push((name, decl));
    }
    fn collect<'t>(members: &'t [NamespaceMember], prefix: &str, out: &mut Vec<(String, &'t TypeDecl)>) {
        for member in members {
            match member {
                NamespaceMember::Namespace(ns) => collect(&ns.members, &qualify(prefix, &ns.name), out),
                NamespaceMember::Type(decl) => collect_type(decl, prefix, out),
            }
        }
    }

    let mut out = Vec::new();
    collect(&tree.root().members, "", &mut out);
    out.sort_by_key(|(_, decl)| decl.range.start);
    out
}

/// Declarations of the diagnostic's type in `tree`, the one at the
/// diagnostic's location first.
fn type_declarations<'t>(
    tree: &'t SyntaxTree,
    diagnostic: &Diagnostic,
) -> Result<Vec<&'t TypeDecl>, RepairError> {
    let mut candidates: Vec<&TypeDecl> = declared_types(tree)
        .into_iter()
        .filter(|(name, decl)| *name == diagnostic.type_name && decl.arity() == diagnostic.arity)
        .map(|(_, decl)| decl)
        .collect();
    if candidates.is_empty() {
        return Err(target_not_found(
            diagnostic.kind,
            format!("type {} in {}", diagnostic.type_name, tree.path().display()),
        ));
    }
    if diagnostic.location.path == tree.path() {
        let at = diagnostic.location.span.start;
        candidates.sort_by_key(|decl| declaration_span(tree, decl).start != at);
    }
    Ok(candidates)
}

fn annotated_declaration<'t>(
    tree: &'t SyntaxTree,
    diagnostic: &Diagnostic,
) -> Result<&'t TypeDecl, RepairError> {
    type_declarations(tree, diagnostic).map(|candidates| candidates[0])
}

fn find_dispatcher<'t>(decl: &'t TypeDecl, dispatcher_type: &str) -> Option<&'t TypeDecl> {
    decl.descendant_types()
        .into_iter()
        .find(|nested| nested.name == dispatcher_type)
}

fn dispatcher_declaration<'t>(
    tree: &'t SyntaxTree,
    diagnostic: &Diagnostic,
    ctx: &RepairContext<'_>,
) -> Result<&'t TypeDecl, RepairError> {
    type_declarations(tree, diagnostic)?
        .into_iter()
        .find_map(|decl| find_dispatcher(decl, ctx.dispatcher_type()))
        .ok_or_else(|| {
            target_not_found(
                diagnostic.kind,
                format!(
                    "{} in {} ({})",
                    ctx.dispatcher_type(),
                    diagnostic.type_name,
                    tree.path().display()
                ),
            )
        })
}

/// `partial` after the last modifier, or before the keyword.
fn make_partial(tree: &SyntaxTree, decl: &TypeDecl) -> Vec<TextEdit> {
    if decl.is_partial() {
        return Vec::new();
    }
    let edit = match decl.modifiers.last() {
        Some(last) => TextEdit::insert(tree.token(last.token).span.end, " partial"),
        None => TextEdit::insert(tree.token(decl.keyword).span.start, "partial "),
    };
    vec![edit]
}

/// `public` in place of any other accessibility modifiers.
fn make_public(tree: &SyntaxTree, decl: &TypeDecl) -> Vec<TextEdit> {
    if decl.is_public() {
        return Vec::new();
    }
    let access: Vec<TokenId> = decl
        .modifiers
        .iter()
        .filter(|m| ACCESSIBILITY.contains(&m.text.as_str()))
        .map(|m| m.token)
        .collect();
    let Some((&first, rest)) = access.split_first() else {
        let before = decl
            .modifiers
            .first()
            .map(|m| m.token)
            .unwrap_or(decl.keyword);
        return vec![TextEdit::insert(tree.token(before).span.start, "public ")];
    };
    let mut edits = vec![TextEdit::replace(tree.token(first).span, "public")];
    for &token in rest {
        let span = Span::new(tree.token(token - 1).span.end, tree.token(token).span.end);
        edits.push(TextEdit::delete(span));
    }
    edits
}

/// Indentation of the members of `decl`: one level deeper than its closing
/// brace.
fn member_indent(tree: &SyntaxTree, decl: &TypeDecl, ctx: &RepairContext<'_>) -> String {
    let anchor = decl.close_brace.unwrap_or(decl.keyword);
    format!(
        "{}{}",
        tree.line_indent(tree.token(anchor).span.start),
        ctx.config.repair.indent
    )
}

fn same_line(tree: &SyntaxTree, a: usize, b: usize) -> bool {
    let index = tree.line_index();
    index.line_of(a) == index.line_of(b)
}

/// `member` on its own line after the line ending at `after`, or inline
/// when the next token shares that line.
fn insert_after_token(
    tree: &SyntaxTree,
    after: TokenId,
    member: &str,
    indent: &str,
) -> TextEdit {
    let end = tree.token(after).span.end;
    if same_line(tree, end, tree.token(after + 1).span.start) {
        return TextEdit::insert(end, format!(" {member}"));
    }
    let newline = tree.newline().as_str();
    if tree.is_last_line(end) {
        return TextEdit::insert(tree.text().len(), format!("{newline}{indent}{member}"));
    }
    TextEdit::insert(tree.line_end(end), format!("{indent}{member}{newline}"))
}

fn insert_first_member(
    tree: &SyntaxTree,
    decl: &TypeDecl,
    member: &str,
    ctx: &RepairContext<'_>,
    kind: DiagnosticKind,
) -> Result<TextEdit, RepairError> {
    let open = decl
        .open_brace
        .ok_or_else(|| target_not_found(kind, format!("body of {}", decl.name)))?;
    Ok(insert_after_token(tree, open, member, &member_indent(tree, decl, ctx)))
}

fn insert_after_member(
    tree: &SyntaxTree,
    decl: &TypeDecl,
    previous: &TypeDecl,
    member: &str,
    ctx: &RepairContext<'_>,
    kind: DiagnosticKind,
) -> Result<TextEdit, RepairError> {
    let last = previous
        .range
        .last()
        .ok_or_else(|| target_not_found(kind, format!("end of {}", previous.name)))?;
    Ok(insert_after_token(tree, last, member, &member_indent(tree, decl, ctx)))
}

/// The marker comment starting at `start`: its owning token and span.
fn find_marker(tree: &SyntaxTree, start: usize) -> Option<(TokenId, Span)> {
    tree.tokens().iter().enumerate().find_map(|(id, token)| {
        token
            .leading
            .iter()
            .find(|t| t.kind == TriviaKind::LineComment && t.span.start == start)
            .map(|t| (id, t.span))
    })
}

fn enclosing_method(tree: &SyntaxTree, owner: TokenId) -> Option<&MethodDecl> {
    declared_types(tree).into_iter().find_map(|(_, decl)| {
        decl.methods().find(|method| {
            method
                .body_range()
                .is_some_and(|body| body.contains(owner))
        })
    })
}

/// Whether a statement can be inserted before `owner`: it starts a statement
/// in a statement list or closes a block.
fn starts_statement(method: &MethodDecl, owner: TokenId) -> bool {
    let Some(block) = method.block() else {
        return false;
    };
    let mut found = false;
    block.visit_statement_lists(&mut |list| {
        found |= list.close == Some(owner)
            || list.statements.iter().any(|s| s.range.start == owner);
    });
    found
}

/// Indentation of a call inserted below the marker at `span`. A marker that
/// trails code on its line (`{ // SIG: Go`) defers to the statement it owns,
/// or to one level inside the block that `owner` closes.
fn call_indent(tree: &SyntaxTree, owner: TokenId, span: Span, ctx: &RepairContext<'_>) -> String {
    let marker_indent = tree.line_indent(span.start);
    let index = tree.line_index();
    let line_start = index.line_start(index.line_of(span.start));
    if line_start + marker_indent.len() == span.start {
        return marker_indent.to_string();
    }
    let owner_indent = tree.line_indent(tree.token(owner).span.start);
    if tree.token_text(owner) == "}" {
        format!("{owner_indent}{}", ctx.config.repair.indent)
    } else {
        owner_indent.to_string()
    }
}

/// `<field>.<Method>_<Pascal>();` on the line below the marker, indented
/// like the marker.
fn add_dispatch_call(
    diagnostic: &Diagnostic,
    tree: &SyntaxTree,
    ctx: &RepairContext<'_>,
) -> Result<Vec<TextEdit>, RepairError> {
    let kind = diagnostic.kind;
    let (owner, span) = find_marker(tree, diagnostic.location.span.start).ok_or_else(|| {
        target_not_found(
            kind,
            format!(
                "marker '{}' at {}",
                diagnostic.argument, diagnostic.location
            ),
        )
    })?;
    let declared = ctx.field_name.clone().or_else(|| {
        let dispatcher_type = ctx.dispatcher_type();
        type_declarations(tree, diagnostic)
            .ok()?
            .into_iter()
            .flat_map(|decl| decl.fields())
            .find(|field| field.ty.simple_name() == dispatcher_type)
            .and_then(|field| field.declarators.first())
            .map(|declarator| declarator.name.clone())
    });
    let field = declared
        .as_deref()
        .unwrap_or(&ctx.config.repair.field_name);
    if starts_dispatch_call(tree, owner, field) {
        return Ok(Vec::new());
    }
    let line = tree.position(span.start).line;
    let unsupported = || RepairError::UnsupportedMarkerPosition {
        message: diagnostic.argument.clone(),
        line,
    };
    let method = enclosing_method(tree, owner).ok_or_else(unsupported)?;
    if !starts_statement(method, owner) {
        return Err(unsupported());
    }

    let member = marker_member_name(&method.name, &diagnostic.argument);
    let indent = call_indent(tree, owner, span, ctx);
    let newline = tree.newline().as_str();
    debug!(field, member = %member, line, "inserting dispatch call");
    Ok(vec![TextEdit::insert(
        tree.line_end(span.end),
        format!("{indent}{field}.{member}();{newline}"),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::marker::SigMarker;
    use crate::semantic::Compilation;
    use crate::validator::Validator;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn diagnostics(tree: &SyntaxTree) -> Vec<Diagnostic> {
        let compilation = Compilation::from_sources(vec![(
            tree.path().to_path_buf(),
            tree.text().to_string(),
        )]);
        let config = SigmuxConfig::default();
        Validator::new(&config, &SigMarker::default())
            .analyze(&compilation, &CancellationToken::new())
            .expect("not cancelled")
    }

    fn fix_first(text: &str, id: &str) -> String {
        let tree = SyntaxTree::parse(PathBuf::from("Signaller.cs"), text);
        let diagnostic = diagnostics(&tree)
            .into_iter()
            .find(|d| d.id() == id)
            .unwrap_or_else(|| panic!("no {id}"));
        let config = SigmuxConfig::default();
        let ctx = RepairContext::new(&config);
        let fixed = repair(&diagnostic, &tree, &ctx).expect("repairable");
        let again = repair(&diagnostic, &fixed, &ctx).expect("repairable");
        assert_eq!(again.text(), fixed.text(), "repair is idempotent");
        fixed.text().to_string()
    }

    #[test]
    fn makes_annotated_type_partial() {
        let fixed = fix_first(
            "using SharpSenz;\n[SignalsSource]\npublic sealed class Signaller\n{\n}\n",
            "SZ001",
        );
        assert_eq!(
            fixed,
            "using SharpSenz;\n[SignalsSource]\npublic sealed partial class Signaller\n{\n}\n"
        );
        let fixed = fix_first("using SharpSenz;\n[SignalsSource] class Signaller { }\n", "SZ001");
        assert_eq!(fixed, "using SharpSenz;\n[SignalsSource] partial class Signaller { }\n");
    }

    #[test]
    fn inserts_dispatcher_as_first_member() {
        let fixed = fix_first(
            indoc! {"
                using SharpSenz;
                namespace App
                {
                    [SignalsSource]
                    public partial class Signaller
                    {
                        void M() { }
                    }
                }
            "},
            "SZ002",
        );
        assert_eq!(
            fixed,
            indoc! {"
                using SharpSenz;
                namespace App
                {
                    [SignalsSource]
                    public partial class Signaller
                    {
                        public partial class SignalsMultiplex { }
                        void M() { }
                    }
                }
            "}
        );
    }

    #[test]
    fn inserts_field_after_dispatcher() {
        let fixed = fix_first(
            "using SharpSenz;\r\n[SignalsSource]\r\npublic partial class Signaller\r\n{\r\n\tpublic partial class SignalsMultiplex\r\n\t{\r\n\t}\r\n\tvoid M() { }\r\n}\r\n",
            "SZ005",
        );
        assert_eq!(
            fixed,
            "using SharpSenz;\r\n[SignalsSource]\r\npublic partial class Signaller\r\n{\r\n\tpublic partial class SignalsMultiplex\r\n\t{\r\n\t}\r\n    public readonly SignalsMultiplex signals = new SignalsMultiplex();\r\n\tvoid M() { }\r\n}\r\n"
        );
    }

    #[test]
    fn fixes_dispatcher_accessibility_and_partial() {
        let source = indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Signaller
            {
                protected internal sealed class SignalsMultiplex { }
                public SignalsMultiplex signals;
            }
        "};
        let public = fix_first(source, "SZ003");
        assert!(public.contains("    public sealed class SignalsMultiplex { }\n"));
        let partial = fix_first(source, "SZ004");
        assert!(partial.contains("    protected internal sealed partial class SignalsMultiplex { }\n"));

        let bare = "using SharpSenz;\n[SignalsSource]\npublic partial class S { partial class SignalsMultiplex { } SignalsMultiplex f; }";
        let fixed = fix_first(bare, "SZ003");
        assert!(fixed.contains("{ public partial class SignalsMultiplex { }"));
    }

    #[test]
    fn inserts_call_beneath_marker() {
        let fixed = fix_first(
            indoc! {"
                using SharpSenz;
                [SignalsSource]
                public partial class Signaller
                {
                    public partial class SignalsMultiplex { }
                    SignalsMultiplex probes;
                    void Run()
                    {
                        if (true)
                        {
                            // note
                            // SIG: deep inside
                        }
                    }
                }
            "},
            "SZ010",
        );
        assert!(fixed.contains(
            "            // SIG: deep inside\n            probes.Run_DeepInside();\n        }\n"
        ));
    }

    #[test]
    fn marker_trailing_a_brace_indents_like_the_body() {
        let owns_statement = fix_first(
            indoc! {"
                using SharpSenz;
                [SignalsSource]
                public partial class Signaller
                {
                    public partial class SignalsMultiplex { }
                    SignalsMultiplex signals;
                    void Run()
                    { // SIG: Go
                        Work();
                    }
                }
            "},
            "SZ010",
        );
        assert!(owns_statement.contains(
            "    { // SIG: Go\n        signals.Run_Go();\n        Work();\n"
        ));

        let owns_close = fix_first(
            indoc! {"
                using SharpSenz;
                [SignalsSource]
                public partial class Signaller
                {
                    public partial class SignalsMultiplex { }
                    SignalsMultiplex signals;
                    void Stop() { // SIG: Halt
                    }
                }
            "},
            "SZ010",
        );
        assert!(owns_close.contains(
            "    void Stop() { // SIG: Halt\n        signals.Stop_Halt();\n    }\n"
        ));
    }

    #[test]
    fn marker_before_else_is_not_repairable() {
        let source = indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Signaller
            {
                public partial class SignalsMultiplex { }
                SignalsMultiplex signals;
                void Run(bool x)
                {
                    if (x) { }
                    // SIG: between
                    else { }
                }
            }
        "};
        let tree = SyntaxTree::parse(PathBuf::from("Signaller.cs"), source);
        let diagnostic = diagnostics(&tree).remove(0);
        let config = SigmuxConfig::default();
        let err = repair(&diagnostic, &tree, &RepairContext::new(&config)).unwrap_err();
        assert_eq!(
            err,
            RepairError::UnsupportedMarkerPosition {
                message: "between".to_string(),
                line: 10
            }
        );
    }
}
