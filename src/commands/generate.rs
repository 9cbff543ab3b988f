use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cancellation::CancellationToken;
use crate::io;
use crate::synthesis::{GeneratedSource, SignalsGenerator};

/// Default output directory, relative to the project.
pub const DEFAULT_OUT_DIR: &str = "obj/sigmux";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub path: PathBuf,
    pub out: Option<PathBuf>,
    /// Compare against the output directory instead of writing to it.
    pub check: bool,
}

impl GenerateOptions {
    fn out_dir(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| self.path.join(DEFAULT_OUT_DIR))
    }
}

/// Writes generated sources, or with `check` reports stale ones; `Ok(false)`
/// when anything is out of date.
pub fn generate_sources(config: Option<&Path>, options: &GenerateOptions) -> Result<bool> {
    let workspace = super::open_workspace(config, &options.path)?;
    let generator = SignalsGenerator::new(workspace.config().clone())
        .context("Failed to build generator")?;
    let output = generator.generate(&workspace.compilation(), &CancellationToken::new())?;
    let out_dir = options.out_dir();
    if options.check {
        let stale = stale_sources(&out_dir, &output.sources);
        for hint_name in &stale {
            println!("out of date: {}", out_dir.join(hint_name).display());
        }
        return Ok(stale.is_empty());
    }

    io::ensure_dir(&out_dir)?;
    for source in &output.sources {
        io::write_file(&out_dir.join(&source.hint_name), &source.text)?;
    }
    info!(
        sources = output.sources.len(),
        out = %out_dir.display(),
        "wrote generated sources"
    );
    println!(
        "Generated {} source{} in {}",
        output.sources.len(),
        if output.sources.len() == 1 { "" } else { "s" },
        out_dir.display()
    );
    Ok(true)
}

/// Hint names whose file is missing or differs.
fn stale_sources(out_dir: &Path, sources: &[GeneratedSource]) -> Vec<String> {
    sources
        .iter()
        .filter(|source| {
            std::fs::read_to_string(out_dir.join(&source.hint_name))
                .map(|existing| existing != source.text)
                .unwrap_or(true)
        })
        .map(|source| source.hint_name.clone())
        .collect()
}
