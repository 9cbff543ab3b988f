mod core;
mod loader;

pub use core::{
    is_identifier, AnnotationConfig, FilesConfig, GenerationConfig, MarkerConfig, RepairConfig,
    SigmuxConfig,
};

pub use loader::{
    default_config_toml, directory_ancestors, load_config, load_config_from,
    load_config_from_path, parse_and_validate_config, CONFIG_FILE_NAME,
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_file_parses_to_defaults() {
        let config = parse_and_validate_config(&default_config_toml()).expect("parses");
        assert_eq!(config, SigmuxConfig::default());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn partial_files_keep_defaults_for_missing_keys() {
        let config = parse_and_validate_config(
            r#"
[annotation]
type = "Acme.Telemetry.TracedAttribute"

[repair]
field_name = "probes"
"#,
        )
        .expect("parses");
        assert_eq!(config.annotation.type_name, "Acme.Telemetry.TracedAttribute");
        assert_eq!(config.repair.field_name, "probes");
        assert_eq!(config.repair.indent, "    ");
        assert_eq!(config.marker.prefix, "SIG");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = parse_and_validate_config(
            r#"
[generation]
dispatcher_type = "Signals Multiplex"
context_type = "Ctx"

[repair]
indent = "--"
"#,
        )
        .expect("parses");
        assert_eq!(config.generation.dispatcher_type, "SignalsMultiplex");
        assert_eq!(config.generation.context_type, "Ctx");
        assert_eq!(config.repair.indent, "    ");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(parse_and_validate_config("[annotation\n").is_err());
    }

    #[test]
    fn discovers_config_in_ancestor_directory() {
        let dir = TempDir::new().expect("temp dir");
        let nested = dir.path().join("src").join("app");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[marker]\nprefix = \"EVT\"\n",
        )
        .expect("write");
        let config = load_config_from(&nested);
        assert_eq!(config.marker.prefix, "EVT");
    }

    #[test]
    fn directory_ancestors_is_bounded() {
        let dirs: Vec<_> =
            directory_ancestors(std::path::PathBuf::from("/a/b/c/d"), 2).collect();
        assert_eq!(dirs.len(), 2);
    }
}
