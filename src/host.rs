//! Capability traits for hosts that drive the pipeline, and their signal
//! implementations.
//!
//! A host owns the documents. It hands the pipeline an immutable
//! [`Compilation`] and receives diagnostics, generated sources or an edited
//! document back.

use std::path::PathBuf;

use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::config::SigmuxConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::{RepairError, Result, SigmuxError};
use crate::marker::SigMarker;
use crate::repair::{self, fix_title, RepairContext};
use crate::semantic::Compilation;
use crate::synthesis::{GenerationOutput, SignalsGenerator};
use crate::validator::{annotate, Validator};

/// Snapshot in, diagnostics out.
pub trait DiagnosticAnalyzer: Send + Sync {
    fn supported_kinds(&self) -> &'static [DiagnosticKind];

    fn analyze(
        &self,
        compilation: &Compilation,
        cancel: &CancellationToken,
    ) -> Result<Vec<Diagnostic>>;
}

/// Compilation in, named generated sources out.
pub trait SourceGenerator: Send + Sync {
    fn generate(
        &self,
        compilation: &Compilation,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutput>;
}

/// New text for one document of a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    /// Index into [`Compilation::documents`].
    pub document: usize,
    pub path: PathBuf,
    pub text: String,
}

/// Diagnostic in, edited document out.
pub trait CodeFixProvider: Send + Sync {
    fn fixable_kinds(&self) -> &'static [DiagnosticKind];

    fn title(&self, kind: DiagnosticKind) -> &'static str;

    /// The edited document. Its text equals the original when the
    /// diagnostic no longer applies.
    fn fix(&self, diagnostic: &Diagnostic, compilation: &Compilation) -> Result<DocumentChange>;
}

pub struct SignalsAnalyzer {
    config: SigmuxConfig,
    grammar: SigMarker,
}

impl SignalsAnalyzer {
    pub fn new(config: SigmuxConfig) -> Result<Self> {
        let grammar = config.marker_grammar().map_err(|e| {
            SigmuxError::config(format!("invalid marker prefix `{}`: {e}", config.marker.prefix))
        })?;
        Ok(Self { config, grammar })
    }
}

impl DiagnosticAnalyzer for SignalsAnalyzer {
    fn supported_kinds(&self) -> &'static [DiagnosticKind] {
        &DiagnosticKind::ALL
    }

    fn analyze(
        &self,
        compilation: &Compilation,
        cancel: &CancellationToken,
    ) -> Result<Vec<Diagnostic>> {
        Validator::new(&self.config, &self.grammar).analyze(compilation, cancel)
    }
}

impl SourceGenerator for SignalsGenerator {
    fn generate(
        &self,
        compilation: &Compilation,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutput> {
        SignalsGenerator::generate(self, compilation, cancel)
    }
}

pub struct SignalsCodeFix {
    config: SigmuxConfig,
}

impl SignalsCodeFix {
    pub fn new(config: SigmuxConfig) -> Self {
        Self { config }
    }
}

impl CodeFixProvider for SignalsCodeFix {
    fn fixable_kinds(&self) -> &'static [DiagnosticKind] {
        &DiagnosticKind::ALL
    }

    fn title(&self, kind: DiagnosticKind) -> &'static str {
        fix_title(kind)
    }

    /// Tries the diagnostic's own document first, then every other document
    /// declaring the type: the declaration to edit may live in another
    /// partial fragment.
    fn fix(&self, diagnostic: &Diagnostic, compilation: &Compilation) -> Result<DocumentChange> {
        let symbols = compilation.symbols();
        let ty = symbols.get(&diagnostic.type_name, diagnostic.arity);
        let field_name = ty
            .and_then(|ty| annotate(ty, &symbols, &self.config))
            .and_then(|annotated| annotated.field_name);
        let ctx = RepairContext::new(&self.config).with_field_name(field_name);

        let own = compilation
            .documents()
            .iter()
            .position(|tree| tree.path() == diagnostic.location.path)
            .ok_or_else(|| RepairError::DocumentNotFound(diagnostic.location.path.clone()))?;
        let mut candidates = vec![own];
        if let Some(ty) = ty {
            for fragment in &ty.fragments {
                if !candidates.contains(&fragment.document) {
                    candidates.push(fragment.document);
                }
            }
        }

        let mut first_error = None;
        let mut unchanged = None;
        for document in candidates {
            let Some(tree) = compilation.document(document) else {
                continue;
            };
            match repair::repair(diagnostic, tree, &ctx) {
                Ok(fixed) if fixed.text() != tree.text() => {
                    debug!(id = diagnostic.id(), path = %tree.path().display(), "fixed");
                    return Ok(DocumentChange {
                        document,
                        path: tree.path().to_path_buf(),
                        text: fixed.text().to_string(),
                    });
                }
                Ok(_) => {
                    unchanged.get_or_insert(DocumentChange {
                        document,
                        path: tree.path().to_path_buf(),
                        text: tree.text().to_string(),
                    });
                }
                Err(RepairError::TargetNotFound { .. }) if first_error.is_some() => {}
                Err(err @ RepairError::TargetNotFound { .. }) => first_error = Some(err),
                Err(err) => return Err(err.into()),
            }
        }
        match (unchanged, first_error) {
            (Some(change), _) => Ok(change),
            (None, Some(err)) => Err(err.into()),
            (None, None) => Err(RepairError::DocumentNotFound(diagnostic.location.path.clone()).into()),
        }
    }
}
