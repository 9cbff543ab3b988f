//! Structural validation of annotated types.
//!
//! A type is annotated when an attribute on any of its declarations binds to
//! the configured annotation type. Annotated types must be `partial`, nest a
//! public partial dispatcher type, hold a field of that type, and follow
//! every marker comment with a dispatch call through that field.

use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::cancellation::CancellationToken;
use crate::config::SigmuxConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::dispatch::starts_dispatch_call;
use crate::errors::Result;
use crate::marker::{method_markers, MarkerGrammar};
use crate::observability::{set_current_type, set_phase, Phase};
use crate::semantic::{Compilation, NamedType, SymbolTable, TypeFragment};
use crate::syntax::ast::{TokenRange, TypeDecl};
use crate::syntax::{Span, SyntaxTree};

/// An annotated type together with the scaffolding found for it.
///
/// Derived fresh on every pass; nothing here survives an edit.
#[derive(Debug, Clone)]
pub struct AnnotatedType<'s, 'a> {
    pub ty: &'s NamedType<'a>,
    /// Index into `ty.fragments` of the first declaration carrying the
    /// annotation.
    pub annotated_fragment: usize,
    pub dispatcher: Option<(&'s TypeFragment<'a>, &'a TypeDecl)>,
    pub field_name: Option<String>,
}

impl<'s, 'a> AnnotatedType<'s, 'a> {
    pub fn name(&self) -> &str {
        &self.ty.name
    }

    pub fn namespace(&self) -> &str {
        &self.ty.namespace
    }

    pub fn qualified_name(&self) -> &str {
        &self.ty.qualified_name
    }

    pub fn containing(&self) -> &[&'a TypeDecl] {
        self.ty.containing()
    }

    pub fn is_partial(&self) -> bool {
        self.ty.is_partial()
    }

    pub fn fragments(&self) -> &[TypeFragment<'a>] {
        &self.ty.fragments
    }

    pub fn fragment(&self) -> &TypeFragment<'a> {
        &self.ty.fragments[self.annotated_fragment]
    }
}

/// First declaration of `ty` whose attributes bind to `attribute`.
pub fn annotated_fragment(ty: &NamedType<'_>, symbols: &SymbolTable<'_>, attribute: &str) -> Option<usize> {
    ty.fragments
        .iter()
        .position(|fragment| fragment.has_attribute(attribute, symbols))
}

/// Name of the first declarator of the first field typed `dispatcher_type`.
pub fn dispatcher_field_name(ty: &NamedType<'_>, dispatcher_type: &str) -> Option<String> {
    ty.fields()
        .find(|(_, field)| field.ty.simple_name() == dispatcher_type)
        .and_then(|(_, field)| field.declarators.first())
        .map(|declarator| declarator.name.clone())
}

/// Declaration span from the first attribute through the closing brace.
pub fn declaration_span(tree: &SyntaxTree, decl: &TypeDecl) -> Span {
    let end = decl
        .close_brace
        .map(|close| close + 1)
        .unwrap_or(decl.range.end);
    tree.range_span(TokenRange::new(decl.range.start, end))
}

/// Annotated view of `ty`, or `None` when no declaration is annotated.
pub fn annotate<'s, 'a>(
    ty: &'s NamedType<'a>,
    symbols: &SymbolTable<'_>,
    config: &SigmuxConfig,
) -> Option<AnnotatedType<'s, 'a>> {
    let annotated_fragment = annotated_fragment(ty, symbols, &config.annotation.type_name)?;
    let dispatcher_type = &config.generation.dispatcher_type;
    Some(AnnotatedType {
        ty,
        annotated_fragment,
        dispatcher: ty.nested_type(dispatcher_type),
        field_name: dispatcher_field_name(ty, dispatcher_type),
    })
}

/// Result of validating one type.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub annotated: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub field_name: Option<String>,
}

pub struct Validator<'c> {
    config: &'c SigmuxConfig,
    grammar: &'c dyn MarkerGrammar,
}

impl<'c> Validator<'c> {
    pub fn new(config: &'c SigmuxConfig, grammar: &'c dyn MarkerGrammar) -> Self {
        Self { config, grammar }
    }

    pub fn validate(
        &self,
        ty: &NamedType<'_>,
        symbols: &SymbolTable<'_>,
        cancel: &CancellationToken,
    ) -> Result<ValidationOutcome> {
        let Some(annotated) = annotate(ty, symbols, self.config) else {
            return Ok(ValidationOutcome::default());
        };
        let _type_guard = set_current_type(annotated.qualified_name());
        let fragment = annotated.fragment();
        let type_location = fragment
            .tree
            .location(declaration_span(fragment.tree, fragment.decl));
        let type_diagnostic = |kind| Diagnostic {
            kind,
            location: type_location.clone(),
            argument: annotated.name().to_string(),
            type_name: annotated.qualified_name().to_string(),
            arity: annotated.ty.arity,
        };

        let mut diagnostics = Vec::new();
        if !annotated.is_partial() {
            diagnostics.push(type_diagnostic(DiagnosticKind::NonPartialType));
        }

        let Some((_, dispatcher)) = annotated.dispatcher else {
            diagnostics.push(type_diagnostic(DiagnosticKind::MissingMultiplexType));
            debug!(ty = annotated.qualified_name(), "no dispatcher type, skipping member checks");
            return Ok(ValidationOutcome {
                annotated: true,
                diagnostics,
                field_name: annotated.field_name,
            });
        };
        if !dispatcher.is_public() {
            diagnostics.push(type_diagnostic(DiagnosticKind::MultiplexNotPublic));
        }
        if !dispatcher.is_partial() {
            diagnostics.push(type_diagnostic(DiagnosticKind::MultiplexNotPartial));
        }
        if annotated.field_name.is_none() {
            diagnostics.push(type_diagnostic(DiagnosticKind::MissingMultiplexField));
        }

        for (fragment, method) in annotated.ty.methods() {
            cancel.check()?;
            for marker in method_markers(self.grammar, fragment.tree, method) {
                let dispatched = annotated
                    .field_name
                    .as_deref()
                    .is_some_and(|field| starts_dispatch_call(fragment.tree, marker.owner, field));
                if !dispatched {
                    diagnostics.push(Diagnostic {
                        kind: DiagnosticKind::MarkerWithoutDispatch,
                        location: fragment.tree.location(marker.span),
                        argument: marker.message,
                        type_name: annotated.qualified_name().to_string(),
                        arity: annotated.ty.arity,
                    });
                }
            }
        }

        debug!(
            ty = annotated.qualified_name(),
            count = diagnostics.len(),
            "validated annotated type"
        );
        Ok(ValidationOutcome {
            annotated: true,
            diagnostics,
            field_name: annotated.field_name,
        })
    }

    /// Diagnostics for every type of `compilation`, validated in parallel and
    /// ordered by file, position and id.
    pub fn analyze(
        &self,
        compilation: &Compilation,
        cancel: &CancellationToken,
    ) -> Result<Vec<Diagnostic>> {
        let span = info_span!("validate", documents = compilation.documents().len());
        let _enter = span.enter();
        let symbols = compilation.symbols();
        let outcomes = symbols
            .types()
            .par_iter()
            .map(|ty| {
                let _phase = set_phase(Phase::Validation);
                cancel.check()?;
                self.validate(ty, &symbols, cancel)
            })
            .collect::<Result<Vec<_>>>()?;
        let mut diagnostics: Vec<Diagnostic> = outcomes
            .into_iter()
            .flat_map(|outcome| outcome.diagnostics)
            .collect();
        sort_diagnostics(&mut diagnostics);
        Ok(diagnostics)
    }
}

pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        (&a.location.path, a.location.span.start, a.kind)
            .cmp(&(&b.location.path, b.location.span.start, b.kind))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::SigMarker;
    use indoc::indoc;
    use std::path::PathBuf;

    fn run(source: &str) -> Vec<Diagnostic> {
        let compilation =
            Compilation::from_sources(vec![(PathBuf::from("Signaller.cs"), source.to_string())]);
        let config = SigmuxConfig::default();
        let grammar = SigMarker::default();
        Validator::new(&config, &grammar)
            .analyze(&compilation, &CancellationToken::new())
            .expect("not cancelled")
    }

    fn ids(diagnostics: &[Diagnostic]) -> Vec<&'static str> {
        diagnostics.iter().map(Diagnostic::id).collect()
    }

    #[test]
    fn conforming_type_is_clean() {
        let diagnostics = run(indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Signaller
            {
                public partial class SignalsMultiplex { }
                public readonly SignalsMultiplex signals = new SignalsMultiplex();
                public void Method()
                {
                    // SIG: Some Signal
                    signals.SomeSignal();
                    // SIG: Qualified
                    this.signals.Qualified();
                }
            }
        "});
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn unannotated_types_are_ignored() {
        let diagnostics = run("public class Plain { void M() { // SIG: x\n } }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_dispatcher_masks_member_checks() {
        let diagnostics = run(indoc! {"
            using SharpSenz;
            [SignalsSource]
            public class Signaller
            {
                void M()
                {
                    // SIG: masked
                }
            }
        "});
        assert_eq!(ids(&diagnostics), vec!["SZ001", "SZ002"]);
        assert_eq!(diagnostics[0].argument, "Signaller");
        assert_eq!(diagnostics[0].location.start.line, 2);
        assert_eq!(diagnostics[0].location.end.line, 9);
    }

    #[test]
    fn dispatcher_shape_problems_fire_together() {
        let diagnostics = run(indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Signaller
            {
                class SignalsMultiplex { }
            }
        "});
        assert_eq!(ids(&diagnostics), vec!["SZ003", "SZ004", "SZ005"]);
    }

    #[test]
    fn markers_without_field_all_fire() {
        let diagnostics = run(indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Signaller
            {
                public partial class SignalsMultiplex { }
                void M()
                {
                    // SIG: First
                    signals.First();
                }
            }
        "});
        assert_eq!(ids(&diagnostics), vec!["SZ005", "SZ010"]);
        assert_eq!(diagnostics[1].argument, "First");
    }

    #[test]
    fn marker_followed_by_other_statement_fires() {
        let diagnostics = run(indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Signaller
            {
                public partial class SignalsMultiplex { }
                public readonly SignalsMultiplex probes = new SignalsMultiplex();
                void M()
                {
                    // SIG: wrong receiver
                    signals.Wrong();
                    // SIG:   trailing
                }
            }
        "});
        assert_eq!(ids(&diagnostics), vec!["SZ010", "SZ010"]);
        assert_eq!(diagnostics[0].argument, "wrong receiver");
        assert_eq!(diagnostics[1].argument, "trailing");
        assert_eq!(diagnostics[1].location.start.line, 11);
        assert_eq!(diagnostics[1].location.start.column, 9);
    }

    #[test]
    fn cancelled_token_aborts() {
        let compilation = Compilation::from_sources(vec![(
            PathBuf::from("a.cs"),
            "using SharpSenz; [SignalsSource] class A { }".to_string(),
        )]);
        let config = SigmuxConfig::default();
        let grammar = SigMarker::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(Validator::new(&config, &grammar)
            .analyze(&compilation, &cancel)
            .is_err());
    }
}
