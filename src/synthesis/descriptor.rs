//! Signal descriptors: everything the templates need to emit one receptor
//! method and its dispatcher counterpart.

use serde::Serialize;

use crate::dispatch::{CallArgument, DispatchCall};
use crate::semantic::{display_type, MethodScope};
use crate::syntax::{SyntaxTree, TokenKind};

const UNKNOWN_TYPE: &str = "object";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Parameter {
    /// `ref`, `out` or `in`
    pub modifier: Option<String>,
    pub ty: String,
    pub name: String,
}

impl Parameter {
    /// `ref int count`
    pub fn declaration(&self) -> String {
        match &self.modifier {
            Some(modifier) => format!("{modifier} {} {}", self.ty, self.name),
            None => format!("{} {}", self.ty, self.name),
        }
    }

    /// `ref count`
    pub fn forward(&self) -> String {
        match &self.modifier {
            Some(modifier) => format!("{modifier} {}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalDescriptor {
    pub file_path: String,
    /// 1-based line of the call site, or of the marker when unpaired.
    pub line: usize,
    pub class_name: String,
    pub method_name: String,
    /// Marker text; empty for call sites without a marker.
    pub signal: String,
    pub member_name: String,
    pub parameters: Vec<Parameter>,
}

impl SignalDescriptor {
    /// Parameter types and modifiers, the part that must agree between two
    /// descriptors sharing a member name.
    pub fn signature(&self) -> Vec<(Option<&str>, &str)> {
        self.parameters
            .iter()
            .map(|p| (p.modifier.as_deref(), p.ty.as_str()))
            .collect()
    }

    pub fn declaration_list(&self) -> String {
        self.parameters
            .iter()
            .map(Parameter::declaration)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn forward_list(&self) -> String {
        self.parameters
            .iter()
            .map(Parameter::forward)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `"Begin of calc"` becomes `"BeginOfCalc"`. Words are split on anything
/// that cannot appear in an identifier; only their first letter changes.
pub fn pascal_case(message: &str) -> String {
    let words: String = message
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Signal".to_string()
    } else {
        words
    }
}

/// Member name for a marker without a dispatch call.
pub fn marker_member_name(method: &str, message: &str) -> String {
    format!("{method}_{}", pascal_case(message))
}

/// Receptor parameters for the arguments of `call`.
///
/// Named arguments keep their name; identifiers and member chains use the
/// last identifier; anything else is `argN`. Repeated names get a numeric
/// suffix.
pub fn call_parameters(scope: &MethodScope<'_, '_>, tree: &SyntaxTree, call: &DispatchCall) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = Vec::with_capacity(call.arguments.len());
    for (index, argument) in call.arguments.iter().enumerate() {
        let (name, ty) = name_and_type(scope, tree, argument);
        let base = name.unwrap_or_else(|| format!("arg{}", index + 1));
        let mut name = base.clone();
        let mut suffix = 2;
        while parameters.iter().any(|p| p.name == name) {
            name = format!("{base}{suffix}");
            suffix += 1;
        }
        parameters.push(Parameter {
            modifier: argument.modifier.clone(),
            ty: ty.unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            name,
        });
    }
    parameters
}

fn name_and_type(
    scope: &MethodScope<'_, '_>,
    tree: &SyntaxTree,
    argument: &CallArgument,
) -> (Option<String>, Option<String>) {
    let range = argument.expression;
    let Some(last) = range.last() else {
        return (argument.name.clone(), None);
    };

    // `out int x` / `out var x`
    let declares_variable = argument.modifier.as_deref() == Some("out")
        && range.end - range.start >= 2
        && tree.token(last).kind == TokenKind::Identifier
        && !matches!(tree.token_text(last - 1), "." | "?.");
    if declares_variable {
        let variable = tree.token_text(last);
        let ty = scope.lookup(variable.trim_start_matches('@'), last);
        return (Some(argument.name.clone().unwrap_or_else(|| variable.to_string())), ty);
    }

    let ty = scope.type_of(range).map(|t| display_type(&t));
    let name = argument
        .name
        .clone()
        .or_else(|| chain_tail(tree, range.start, range.end));
    (name, ty)
}

/// Last identifier of `a`, `this.a` or `a.b.c`.
fn chain_tail(tree: &SyntaxTree, start: usize, end: usize) -> Option<String> {
    let mut expect_name = true;
    let mut tail = None;
    for id in start..end {
        let text = tree.token_text(id);
        if expect_name {
            let is_name = tree.token(id).kind == TokenKind::Identifier
                || (id == start && text == "this");
            if !is_name {
                return None;
            }
            tail = (text != "this").then(|| text.to_string());
        } else if !matches!(text, "." | "?.") {
            return None;
        }
        expect_name = !expect_name;
    }
    if expect_name {
        // ends with a dot
        return None;
    }
    tail
}
