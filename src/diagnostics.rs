//! Structural diagnostics reported for annotated types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::syntax::Location;

pub const CATEGORY: &str = "SharpSenz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticKind {
    NonPartialType,
    MissingMultiplexType,
    MultiplexNotPublic,
    MultiplexNotPartial,
    MissingMultiplexField,
    MarkerWithoutDispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
        }
    }
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 6] = [
        DiagnosticKind::NonPartialType,
        DiagnosticKind::MissingMultiplexType,
        DiagnosticKind::MultiplexNotPublic,
        DiagnosticKind::MultiplexNotPartial,
        DiagnosticKind::MissingMultiplexField,
        DiagnosticKind::MarkerWithoutDispatch,
    ];

    pub fn id(self) -> &'static str {
        match self {
            DiagnosticKind::NonPartialType => "SZ001",
            DiagnosticKind::MissingMultiplexType => "SZ002",
            DiagnosticKind::MultiplexNotPublic => "SZ003",
            DiagnosticKind::MultiplexNotPartial => "SZ004",
            DiagnosticKind::MissingMultiplexField => "SZ005",
            DiagnosticKind::MarkerWithoutDispatch => "SZ010",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn title(self) -> &'static str {
        match self {
            DiagnosticKind::NonPartialType => "Signals Source must be a partial class",
            DiagnosticKind::MissingMultiplexType => {
                "Signals Source must have a Signals Multiplex class declaration"
            }
            DiagnosticKind::MultiplexNotPublic => "Signals Multiplex class must be public",
            DiagnosticKind::MultiplexNotPartial => "Signals Multiplex class must be partial",
            DiagnosticKind::MissingMultiplexField => {
                "Signals Source must have a Signals Multiplex member"
            }
            DiagnosticKind::MarkerWithoutDispatch => {
                "Signals Multiplex member must be called on a signal"
            }
        }
    }

    /// Message with `{0}` standing for the diagnostic argument.
    pub fn message_format(self) -> &'static str {
        match self {
            DiagnosticKind::NonPartialType => {
                "Type {0} marked with the [SignalsSource] attribute has to be a partial class"
            }
            DiagnosticKind::MissingMultiplexType => {
                "Type {0} doesn't have a Signals Multiplex class declaration"
            }
            DiagnosticKind::MultiplexNotPublic => {
                "Type {0} Signals Multiplex nested class is not public"
            }
            DiagnosticKind::MultiplexNotPartial => {
                "Type {0} Signals Multiplex nested class is not partial"
            }
            DiagnosticKind::MissingMultiplexField => {
                "Type {0} doesn't have a Signals Multiplex member"
            }
            DiagnosticKind::MarkerWithoutDispatch => {
                "Signal '{0}' has no Signals Multiplex member call"
            }
        }
    }

    pub fn severity(self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One reported violation. Lives for a single analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Location,
    /// Type name for type-level kinds, marker message for SZ010.
    pub argument: String,
    /// Qualified name of the annotated type that produced it.
    pub type_name: String,
    /// Type parameter count of that type; `Box` and `Box<T>` are distinct.
    pub arity: usize,
}

impl Diagnostic {
    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn message(&self) -> String {
        self.kind.message_format().replace("{0}", &self.argument)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}]: {}",
            self.location,
            self.severity(),
            self.id(),
            self.message()
        )
    }
}
