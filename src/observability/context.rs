//! Thread-local context tracking for crash reports.
//!
//! Each thread records the pipeline phase, document and type it is working
//! on. Rayon workers carry their own context, so a panic report names the
//! unit that was actually being processed.

use std::cell::RefCell;
use std::path::PathBuf;

thread_local! {
    static CURRENT_CONTEXT: RefCell<PipelineContext> = const { RefCell::new(PipelineContext::new()) };
}

/// Snapshot of what the current thread was doing.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    pub phase: Option<Phase>,
    pub current_file: Option<PathBuf>,
    /// Qualified name of the annotated type being processed
    pub current_type: Option<String>,
}

impl PipelineContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_file: None,
            current_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discovery,
    Parsing,
    Validation,
    Synthesis,
    Repair,
    Output,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Parsing => write!(f, "parsing"),
            Self::Validation => write!(f, "validation"),
            Self::Synthesis => write!(f, "synthesis"),
            Self::Repair => write!(f, "repair"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Restores the previous context when dropped.
pub struct ContextGuard {
    previous: PipelineContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

fn update(f: impl FnOnce(&mut PipelineContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        f(&mut ctx.borrow_mut());
        ContextGuard { previous }
    })
}

#[must_use]
pub fn set_phase(phase: Phase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

#[must_use]
pub fn set_current_file(path: impl Into<PathBuf>) -> ContextGuard {
    let path = path.into();
    update(|ctx| ctx.current_file = Some(path))
}

#[must_use]
pub fn set_current_type(name: impl Into<String>) -> ContextGuard {
    let name = name.into();
    update(|ctx| ctx.current_type = Some(name))
}

#[must_use]
pub fn get_current_context() -> PipelineContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = PipelineContext::new();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_restore_previous_context() {
        reset_context();
        let _phase = set_phase(Phase::Validation);
        {
            let _file = set_current_file("Client.cs");
            let _ty = set_current_type("App.Client");
            let ctx = get_current_context();
            assert_eq!(ctx.phase, Some(Phase::Validation));
            assert_eq!(ctx.current_file, Some(PathBuf::from("Client.cs")));
            assert_eq!(ctx.current_type.as_deref(), Some("App.Client"));
        }
        let ctx = get_current_context();
        assert_eq!(ctx.phase, Some(Phase::Validation));
        assert!(ctx.current_file.is_none());
        assert!(ctx.current_type.is_none());
    }

    #[test]
    fn context_is_thread_local() {
        reset_context();
        let _phase = set_phase(Phase::Repair);
        let other = std::thread::spawn(|| get_current_context().phase)
            .join()
            .ok()
            .flatten();
        assert_eq!(other, None);
    }
}
