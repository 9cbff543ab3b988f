use serde::{Deserialize, Serialize};

use crate::marker::{SigMarker, DEFAULT_PREFIX};

/// Root configuration structure, read from `.sigmux.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SigmuxConfig {
    /// The attribute that opts a type into signal dispatch
    pub annotation: AnnotationConfig,

    /// Marker comment grammar
    pub marker: MarkerConfig,

    /// Names used by generated sources
    pub generation: GenerationConfig,

    /// Defaults used when repairs insert code
    pub repair: RepairConfig,

    /// File discovery
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Fully qualified attribute type name
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            type_name: "SharpSenz.SignalsSourceAttribute".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarkerConfig {
    pub prefix: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Namespace imported by generated sources for the context type
    pub runtime_namespace: String,
    pub context_type: String,
    pub receptor_interface: String,
    /// Name of the nested dispatcher type the validator looks for
    pub dispatcher_type: String,
    pub receptor_list: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            runtime_namespace: "SharpSenz".to_string(),
            context_type: "SignalContext".to_string(),
            receptor_interface: "ISignalsReceptor".to_string(),
            dispatcher_type: "SignalsMultiplex".to_string(),
            receptor_list: "Receptors".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepairConfig {
    /// Dispatcher field name for inserted fields and calls
    pub field_name: String,
    /// One indentation level
    pub indent: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            field_name: "signals".to_string(),
            indent: "    ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilesConfig {
    /// Glob patterns excluded from discovery
    pub ignore: Vec<String>,
    /// Source file extensions
    pub extensions: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            ignore: vec![
                "bin/**".to_string(),
                "obj/**".to_string(),
                "*.g.cs".to_string(),
            ],
            extensions: vec!["cs".to_string()],
        }
    }
}

impl SigmuxConfig {
    pub fn marker_grammar(&self) -> Result<SigMarker, regex::Error> {
        SigMarker::with_prefix(&self.marker.prefix)
    }

    /// Problems with configured values, one message per offending key.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !is_qualified_identifier(&self.annotation.type_name) {
            problems.push(format!(
                "annotation.type `{}` is not a qualified type name",
                self.annotation.type_name
            ));
        }
        if self.marker.prefix.trim().is_empty() || self.marker.prefix.contains(char::is_whitespace)
        {
            problems.push(format!(
                "marker.prefix `{}` must be a non-empty word",
                self.marker.prefix
            ));
        }
        if !is_qualified_identifier(&self.generation.runtime_namespace) {
            problems.push(format!(
                "generation.runtime_namespace `{}` is not a namespace",
                self.generation.runtime_namespace
            ));
        }
        for (key, value) in [
            ("generation.context_type", &self.generation.context_type),
            ("generation.receptor_interface", &self.generation.receptor_interface),
            ("generation.dispatcher_type", &self.generation.dispatcher_type),
            ("generation.receptor_list", &self.generation.receptor_list),
            ("repair.field_name", &self.repair.field_name),
        ] {
            if !is_identifier(value) {
                problems.push(format!("{key} `{value}` is not an identifier"));
            }
        }
        if self.repair.indent.is_empty() || !self.repair.indent.chars().all(|c| c == ' ' || c == '\t')
        {
            problems.push("repair.indent must be spaces or tabs".to_string());
        }
        problems
    }

    /// Replaces every invalid value with its default, returning what was
    /// replaced.
    pub fn sanitize(&mut self) -> Vec<String> {
        let problems = self.validate();
        if problems.is_empty() {
            return problems;
        }
        let defaults = SigmuxConfig::default();
        if !is_qualified_identifier(&self.annotation.type_name) {
            self.annotation = defaults.annotation.clone();
        }
        if self.marker.prefix.trim().is_empty() || self.marker.prefix.contains(char::is_whitespace)
        {
            self.marker = defaults.marker.clone();
        }
        let generation = &mut self.generation;
        if !is_qualified_identifier(&generation.runtime_namespace) {
            generation.runtime_namespace = defaults.generation.runtime_namespace.clone();
        }
        for (value, default) in [
            (&mut generation.context_type, &defaults.generation.context_type),
            (&mut generation.receptor_interface, &defaults.generation.receptor_interface),
            (&mut generation.dispatcher_type, &defaults.generation.dispatcher_type),
            (&mut generation.receptor_list, &defaults.generation.receptor_list),
            (&mut self.repair.field_name, &defaults.repair.field_name),
        ] {
            if !is_identifier(value) {
                value.clone_from(default);
            }
        }
        if self.repair.indent.is_empty() || !self.repair.indent.chars().all(|c| c == ' ' || c == '\t')
        {
            self.repair.indent = defaults.repair.indent;
        }
        problems
    }
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn is_qualified_identifier(text: &str) -> bool {
    text.split('.').all(is_identifier)
}
