//! Comment-driven signal instrumentation for C# sources.
//!
//! Methods of a type annotated as a signals source carry marker comments
//! (`// SIG: Begin of calc`). sigmux validates the scaffolding such a type
//! needs, synthesizes a receptor interface and a dispatcher from the markers,
//! and repairs missing scaffolding with minimal text edits.

pub mod cancellation;
pub mod cli;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod errors;
pub mod host;
pub mod io;
pub mod marker;
pub mod observability;
pub mod repair;
pub mod semantic;
pub mod synthesis;
pub mod syntax;
pub mod validator;
pub mod workspace;

pub use crate::cancellation::CancellationToken;
pub use crate::config::SigmuxConfig;
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use crate::errors::{RepairError, Result, SigmuxError};
pub use crate::host::{
    CodeFixProvider, DiagnosticAnalyzer, DocumentChange, SignalsAnalyzer, SignalsCodeFix,
    SourceGenerator,
};
pub use crate::marker::{MarkerGrammar, SigMarker};
pub use crate::semantic::Compilation;
pub use crate::synthesis::{GeneratedSource, GenerationOutput, SignalsGenerator};
pub use crate::syntax::SyntaxTree;
pub use crate::validator::Validator;
pub use crate::workspace::{FixReport, Workspace};
