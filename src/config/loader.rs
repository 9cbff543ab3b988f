use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::SigmuxConfig;
use crate::errors::SigmuxError;

pub const CONFIG_FILE_NAME: &str = ".sigmux.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

pub(crate) fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse a TOML document, replacing invalid values with defaults.
pub fn parse_and_validate_config(contents: &str) -> Result<SigmuxConfig, String> {
    let mut config = toml::from_str::<SigmuxConfig>(contents)
        .map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))?;

    for problem in config.sanitize() {
        log::warn!("Invalid configuration: {}. Using the default.", problem);
    }

    Ok(config)
}

/// Load a specific config file, failing on I/O and parse errors.
pub fn load_config_from_path(path: &Path) -> Result<SigmuxConfig, SigmuxError> {
    let contents = read_config_file(path).map_err(|source| SigmuxError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_and_validate_config(&contents).map_err(|message| SigmuxError::Config {
        path: Some(path.to_path_buf()),
        message,
    })
}

pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<SigmuxConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{}. Using defaults.", e);
            None
        }
    }
}

pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // "not found" is the normal case while walking up
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// `start` and its ancestors, nearest first, at most `max_depth` entries.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find the nearest `.sigmux.toml` at or above `start`.
pub fn load_config_from(start: &Path) -> SigmuxConfig {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            SigmuxConfig::default()
        })
}

pub fn load_config() -> SigmuxConfig {
    match std::env::current_dir() {
        Ok(dir) => load_config_from(&dir),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            SigmuxConfig::default()
        }
    }
}

/// The file `sigmux init` writes.
pub fn default_config_toml() -> String {
    r#"# Sigmux configuration

[annotation]
# Attribute that marks a type as a signals source
type = "SharpSenz.SignalsSourceAttribute"

[marker]
# Comments of the form `// SIG: message`
prefix = "SIG"

[generation]
runtime_namespace = "SharpSenz"
context_type = "SignalContext"
receptor_interface = "ISignalsReceptor"
dispatcher_type = "SignalsMultiplex"
receptor_list = "Receptors"

[repair]
field_name = "signals"
indent = "    "

[files]
ignore = ["bin/**", "obj/**", "*.g.cs"]
extensions = ["cs"]
"#
    .to_string()
}
