//! CLI command implementations.
//!
//! Each command loads the configuration, builds a [`Workspace`] over the
//! project directory and reports through [`crate::io::output`]. Commands
//! return whether the run was clean so `main` can pick the exit code.

pub mod check;
pub mod fix;
pub mod generate;
pub mod init;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{load_config_from, load_config_from_path, SigmuxConfig};
use crate::workspace::Workspace;

pub use check::check_project;
pub use fix::fix_project;
pub use generate::{generate_sources, GenerateOptions};
pub use init::init_config;

/// An explicit config file wins; otherwise the nearest one above `project`.
pub fn resolve_config(explicit: Option<&Path>, project: &Path) -> Result<SigmuxConfig> {
    match explicit {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(load_config_from(project)),
    }
}

pub(crate) fn open_workspace(explicit: Option<&Path>, project: &Path) -> Result<Workspace> {
    let config = resolve_config(explicit, project)?;
    Workspace::load(project, config)
        .with_context(|| format!("Failed to load sources under {}", project.display()))
}
