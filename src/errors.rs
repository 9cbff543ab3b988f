//! Error types for sigmux operations.
//!
//! Structural problems in analyzed code are never errors: they are
//! [`crate::diagnostics::Diagnostic`]s. The types here cover infrastructure
//! failures only.

use std::path::PathBuf;
use thiserror::Error;

use crate::diagnostics::DiagnosticKind;

pub type Result<T> = std::result::Result<T, SigmuxError>;

#[derive(Debug, Error)]
pub enum SigmuxError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error{}: {message}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Config {
        path: Option<PathBuf>,
        message: String,
    },

    /// The cancellation token fired before the operation finished
    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Repair(#[from] RepairError),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

impl SigmuxError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            path: None,
            message: message.into(),
        }
    }
}

/// Why a code fix could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepairError {
    #[error("no document at {0}")]
    DocumentNotFound(PathBuf),

    #[error("{kind} target not found: {detail}")]
    TargetNotFound { kind: DiagnosticKind, detail: String },

    #[error("marker '{message}' at line {line} is not followed by a statement or closing brace")]
    UnsupportedMarkerPosition { message: String, line: usize },

    #[error("fixing {kind} in {} did not change the document", path.display())]
    NoProgress { kind: DiagnosticKind, path: PathBuf },

    #[error("fixes did not converge within {limit} iterations")]
    IterationLimit { limit: usize },
}
