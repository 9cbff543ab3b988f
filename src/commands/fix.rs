use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::cancellation::CancellationToken;
use crate::io::output::{create_writer, unified_summary, OutputFormat};

/// Applies every fix; `Ok(false)` when diagnostics remain afterwards.
pub fn fix_project(
    config: Option<&Path>,
    path: &Path,
    dry_run: bool,
    format: OutputFormat,
) -> Result<bool> {
    let mut workspace = super::open_workspace(config, path)?;
    let report = workspace
        .fix_all(&CancellationToken::new())
        .context("Batch repair failed")?;

    if dry_run {
        if format == OutputFormat::Terminal {
            for (tree, original) in workspace.changed_documents() {
                print!("{}", unified_summary(tree.path(), original, tree.text()));
            }
        }
    } else {
        let written = workspace.write_changes()?;
        info!(files = written.len(), "wrote fixed documents");
    }

    create_writer(format).write_fix_report(&report)?;
    Ok(report.remaining.is_empty())
}
