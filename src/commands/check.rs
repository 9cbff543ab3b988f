use anyhow::Result;
use std::path::Path;

use crate::cancellation::CancellationToken;
use crate::io::output::{create_writer, OutputFormat};

/// Prints diagnostics; `Ok(false)` when any were found.
pub fn check_project(config: Option<&Path>, path: &Path, format: OutputFormat) -> Result<bool> {
    let workspace = super::open_workspace(config, path)?;
    let diagnostics = workspace.analyze(&CancellationToken::new())?;
    create_writer(format).write_diagnostics(&diagnostics)?;
    Ok(diagnostics.is_empty())
}
