//! An owned, editable set of documents and the batch fix driver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::cancellation::CancellationToken;
use crate::config::SigmuxConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::{RepairError, Result, SigmuxError};
use crate::host::{CodeFixProvider, DiagnosticAnalyzer, SignalsAnalyzer, SignalsCodeFix};
use crate::io::walker::SourceWalker;
use crate::marker::{method_markers, SigMarker};
use crate::observability::{set_current_file, set_phase, Phase};
use crate::semantic::Compilation;
use crate::syntax::SyntaxTree;
use crate::validator::annotate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    pub id: &'static str,
    pub title: &'static str,
    pub path: PathBuf,
    pub argument: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFix {
    pub diagnostic: Diagnostic,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub applied: Vec<AppliedFix>,
    pub skipped: Vec<SkippedFix>,
    /// Diagnostics left after the last pass.
    pub remaining: Vec<Diagnostic>,
}

/// Identity of a diagnostic that survives edits elsewhere in the file: its
/// position among diagnostics of the same kind and argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DiagnosticKey {
    path: PathBuf,
    kind: DiagnosticKind,
    argument: String,
    ordinal: usize,
}

fn keyed(diagnostics: &[Diagnostic]) -> Vec<(DiagnosticKey, &Diagnostic)> {
    let mut seen: HashMap<(PathBuf, DiagnosticKind, String), usize> = HashMap::new();
    diagnostics
        .iter()
        .map(|d| {
            let counter = seen
                .entry((d.location.path.clone(), d.kind, d.argument.clone()))
                .or_default();
            let key = DiagnosticKey {
                path: d.location.path.clone(),
                kind: d.kind,
                argument: d.argument.clone(),
                ordinal: *counter,
            };
            *counter += 1;
            (key, d)
        })
        .collect()
}

pub struct Workspace {
    config: SigmuxConfig,
    grammar: SigMarker,
    analyzer: SignalsAnalyzer,
    fixer: SignalsCodeFix,
    documents: Vec<Arc<SyntaxTree>>,
    baseline: Vec<Arc<SyntaxTree>>,
}

impl Workspace {
    pub fn new(config: SigmuxConfig) -> Result<Self> {
        let grammar = config.marker_grammar().map_err(|e| {
            SigmuxError::config(format!("invalid marker prefix `{}`: {e}", config.marker.prefix))
        })?;
        Ok(Self {
            analyzer: SignalsAnalyzer::new(config.clone())?,
            fixer: SignalsCodeFix::new(config.clone()),
            grammar,
            config,
            documents: Vec::new(),
            baseline: Vec::new(),
        })
    }

    pub fn from_sources(config: SigmuxConfig, sources: Vec<(PathBuf, String)>) -> Result<Self> {
        let mut workspace = Self::new(config)?;
        workspace.set_documents(Compilation::from_sources(sources).documents().to_vec());
        Ok(workspace)
    }

    /// Discovers and parses every source file under `root`.
    pub fn load(root: &Path, config: SigmuxConfig) -> Result<Self> {
        let span = info_span!("parse", root = %root.display());
        let _enter = span.enter();
        let _phase = set_phase(Phase::Discovery);
        let files = SourceWalker::new(root.to_path_buf())
            .with_extensions(config.files.extensions.clone())
            .with_ignore_patterns(config.files.ignore.clone())
            .walk()?;
        debug!(files = files.len(), "discovered source files");

        let _phase = set_phase(Phase::Parsing);
        let sources = files
            .into_par_iter()
            .map(|path| {
                let _file = set_current_file(&path);
                std::fs::read_to_string(&path)
                    .map(|text| (path.clone(), text))
                    .map_err(|e| SigmuxError::io(path, e))
            })
            .collect::<Result<Vec<_>>>()?;
        let workspace = Self::from_sources(config, sources)?;
        for tree in &workspace.documents {
            if !tree.errors().is_empty() {
                warn!(
                    path = %tree.path().display(),
                    errors = tree.errors().len(),
                    "syntax errors; analysis continues on the recovered tree"
                );
            }
        }
        info!(documents = workspace.documents.len(), "workspace loaded");
        Ok(workspace)
    }

    fn set_documents(&mut self, documents: Vec<Arc<SyntaxTree>>) {
        self.baseline = documents.clone();
        self.documents = documents;
    }

    pub fn config(&self) -> &SigmuxConfig {
        &self.config
    }

    pub fn documents(&self) -> &[Arc<SyntaxTree>] {
        &self.documents
    }

    pub fn compilation(&self) -> Compilation {
        Compilation::new(self.documents.iter().cloned())
    }

    pub fn analyze(&self, cancel: &CancellationToken) -> Result<Vec<Diagnostic>> {
        self.analyzer.analyze(&self.compilation(), cancel)
    }

    /// Documents whose text differs from what was loaded, with the loaded
    /// text.
    pub fn changed_documents(&self) -> Vec<(&SyntaxTree, &str)> {
        self.documents
            .iter()
            .zip(&self.baseline)
            .filter(|(current, original)| current.text() != original.text())
            .map(|(current, original)| (current.as_ref(), original.text()))
            .collect()
    }

    /// Writes changed documents back to disk.
    pub fn write_changes(&self) -> Result<Vec<PathBuf>> {
        self.changed_documents()
            .into_iter()
            .map(|(tree, _)| {
                std::fs::write(tree.path(), tree.text())
                    .map(|()| tree.path().to_path_buf())
                    .map_err(|e| SigmuxError::io(tree.path(), e))
            })
            .collect()
    }

    /// Checks SZ002 hides: the field check and every marker of the type.
    fn masked_checks(&self, diagnostics: &[Diagnostic]) -> usize {
        let compilation = self.compilation();
        let symbols = compilation.symbols();
        diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::MissingMultiplexType)
            .map(|d| {
                let markers: usize = symbols
                    .get(&d.type_name, d.arity)
                    .and_then(|ty| annotate(ty, &symbols, &self.config))
                    .into_iter()
                    .flat_map(|annotated| {
                        annotated
                            .ty
                            .methods()
                            .map(|(fragment, method)| {
                                method_markers(&self.grammar, fragment.tree, method).len()
                            })
                            .collect::<Vec<_>>()
                    })
                    .sum();
                1 + markers
            })
            .sum()
    }

    /// Repairs diagnostics one at a time, re-analyzing after every edit,
    /// until none are fixable.
    ///
    /// Fails when an edit changes nothing or when more edits are needed than
    /// the initial diagnostics plus the checks hidden behind SZ002.
    pub fn fix_all(&mut self, cancel: &CancellationToken) -> Result<FixReport> {
        let span = info_span!("repair", documents = self.documents.len());
        let _enter = span.enter();
        let _phase = set_phase(Phase::Repair);

        let initial = self.analyze(cancel)?;
        let limit = initial.len() + self.masked_checks(&initial);
        debug!(initial = initial.len(), limit, "starting batch repair");

        let fixable = self.fixer.fixable_kinds();
        let mut report = FixReport::default();
        let mut skipped: Vec<DiagnosticKey> = Vec::new();
        let mut diagnostics = initial;
        loop {
            cancel.check()?;
            let next = keyed(&diagnostics)
                .into_iter()
                .find(|(key, d)| fixable.contains(&d.kind) && !skipped.contains(key))
                .map(|(key, d)| (key, d.clone()));
            let Some((key, diagnostic)) = next else {
                break;
            };
            if report.applied.len() >= limit {
                return Err(RepairError::IterationLimit { limit }.into());
            }

            let compilation = self.compilation();
            match self.fixer.fix(&diagnostic, &compilation) {
                Ok(change) => {
                    let current = &self.documents[change.document];
                    if change.text == current.text() {
                        return Err(RepairError::NoProgress {
                            kind: diagnostic.kind,
                            path: change.path,
                        }
                        .into());
                    }
                    debug!(id = diagnostic.id(), path = %change.path.display(), "applied fix");
                    self.documents[change.document] = Arc::new(current.with_text(change.text));
                    report.applied.push(AppliedFix {
                        id: diagnostic.id(),
                        title: self.fixer.title(diagnostic.kind),
                        path: change.path,
                        argument: diagnostic.argument.clone(),
                    });
                }
                Err(SigmuxError::Repair(err @ RepairError::UnsupportedMarkerPosition { .. })) => {
                    warn!("{err}");
                    skipped.push(key);
                    report.skipped.push(SkippedFix {
                        diagnostic,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
            diagnostics = self.analyze(cancel)?;
        }

        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            remaining = diagnostics.len(),
            "batch repair finished"
        );
        report.remaining = diagnostics;
        Ok(report)
    }
}
