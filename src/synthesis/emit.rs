//! Text templates for the receptor interface and the dispatcher.
//!
//! Both sources reopen the annotated type (and every containing type) as
//! `partial` inside its namespace, so the nested declarations merge with the
//! hand-written ones.

use crate::config::GenerationConfig;

use super::descriptor::SignalDescriptor;

const INDENT: &str = "    ";
const HEADER: &str = "// <auto-generated/>";

/// Where generated members go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitTarget {
    /// Rendered file-level using directives, deduplicated, in emission order.
    pub usings: Vec<String>,
    /// Nested namespace blocks, outermost first. Empty for the global namespace.
    pub namespaces: Vec<NamespaceBlock>,
    /// `partial class Outer`, ..., `partial class Name<T>`, outermost first.
    pub type_headers: Vec<String>,
}

/// `namespace {name}` with the using directives declared at that level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBlock {
    /// Relative to the enclosing block.
    pub name: String,
    pub usings: Vec<String>,
}

struct CodeWriter {
    out: String,
    level: usize,
}

impl CodeWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            level: 0,
        }
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.level {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn open(&mut self, header: &str) {
        self.line(header);
        self.line("{");
        self.level += 1;
    }

    fn close(&mut self) {
        self.level = self.level.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Usings, namespaces and containing types around `body`.
fn wrap(target: &EmitTarget, body: impl FnOnce(&mut CodeWriter)) -> String {
    let mut writer = CodeWriter::new();
    writer.line(HEADER);
    for using in &target.usings {
        writer.line(using);
    }
    writer.line("");
    for block in &target.namespaces {
        writer.open(&format!("namespace {}", block.name));
        for using in &block.usings {
            writer.line(using);
        }
        if !block.usings.is_empty() {
            writer.line("");
        }
    }
    for header in &target.type_headers {
        writer.open(header);
    }
    body(&mut writer);
    for _ in 0..target.type_headers.len() + target.namespaces.len() {
        writer.close();
    }
    writer.finish()
}

/// A C# verbatim string literal.
pub fn verbatim_literal(text: &str) -> String {
    format!("@\"{}\"", text.replace('"', "\"\""))
}

pub fn receptor_source(
    target: &EmitTarget,
    descriptors: &[SignalDescriptor],
    names: &GenerationConfig,
) -> String {
    wrap(target, |w| {
        w.open(&format!("public interface {}", names.receptor_interface));
        for descriptor in descriptors {
            let mut parameters = format!("{} context", names.context_type);
            if !descriptor.parameters.is_empty() {
                parameters.push_str(", ");
                parameters.push_str(&descriptor.declaration_list());
            }
            w.line(&format!("void {}({parameters});", descriptor.member_name));
        }
        w.close();
    })
}

pub fn dispatcher_source(
    target: &EmitTarget,
    descriptors: &[SignalDescriptor],
    names: &GenerationConfig,
) -> String {
    wrap(target, |w| {
        w.open(&format!("public partial class {}", names.dispatcher_type));
        w.line(&format!(
            "private readonly {ctx} _signalContext = new {ctx}();",
            ctx = names.context_type
        ));
        w.line("");
        w.line(&format!(
            "public readonly IList<{iface}> {list} = new List<{iface}>();",
            iface = names.receptor_interface,
            list = names.receptor_list
        ));
        for descriptor in descriptors {
            w.line("");
            dispatcher_method(w, descriptor, names);
        }
        w.close();
    })
}

fn dispatcher_method(w: &mut CodeWriter, descriptor: &SignalDescriptor, names: &GenerationConfig) {
    w.open(&format!(
        "public void {}({})",
        descriptor.member_name,
        descriptor.declaration_list()
    ));
    w.line(&format!(
        "_signalContext.FilePath = {};",
        verbatim_literal(&descriptor.file_path)
    ));
    w.line(&format!("_signalContext.FileLine = {};", descriptor.line));
    w.line(&format!(
        "_signalContext.ClassName = {};",
        verbatim_literal(&descriptor.class_name)
    ));
    w.line(&format!(
        "_signalContext.MethodName = {};",
        verbatim_literal(&descriptor.method_name)
    ));
    w.line(&format!(
        "_signalContext.Signal = {};",
        verbatim_literal(&descriptor.signal)
    ));
    w.line("");
    w.open(&format!(
        "foreach ({} receptor in {})",
        names.receptor_interface, names.receptor_list
    ));
    let mut arguments = "_signalContext".to_string();
    if !descriptor.parameters.is_empty() {
        arguments.push_str(", ");
        arguments.push_str(&descriptor.forward_list());
    }
    w.line(&format!("receptor.{}({arguments});", descriptor.member_name));
    w.close();
    w.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::descriptor::Parameter;
    use pretty_assertions::assert_eq;

    fn target() -> EmitTarget {
        EmitTarget {
            usings: vec!["using SharpSenz;".to_string()],
            namespaces: vec![NamespaceBlock {
                name: "App".to_string(),
                usings: vec![],
            }],
            type_headers: vec!["partial class Client".to_string()],
        }
    }

    fn descriptor() -> SignalDescriptor {
        SignalDescriptor {
            file_path: "src/Client.cs".to_string(),
            line: 20,
            class_name: "Client".to_string(),
            method_name: "Method".to_string(),
            signal: "Say \"hi\"".to_string(),
            member_name: "Method_SayHi".to_string(),
            parameters: vec![Parameter {
                modifier: Some("ref".to_string()),
                ty: "int".to_string(),
                name: "a".to_string(),
            }],
        }
    }

    #[test]
    fn emits_receptor_interface() {
        let text = receptor_source(&target(), &[descriptor()], &GenerationConfig::default());
        assert_eq!(
            text,
            "// <auto-generated/>\nusing SharpSenz;\n\nnamespace App\n{\n    partial class Client\n    {\n        public interface ISignalsReceptor\n        {\n            void Method_SayHi(SignalContext context, ref int a);\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn emits_dispatcher_with_escaped_literals() {
        let text = dispatcher_source(&target(), &[descriptor()], &GenerationConfig::default());
        assert!(text.contains(
            "            private readonly SignalContext _signalContext = new SignalContext();\n"
        ));
        assert!(text.contains(
            "            public readonly IList<ISignalsReceptor> Receptors = new List<ISignalsReceptor>();\n"
        ));
        assert!(text.contains("            public void Method_SayHi(ref int a)\n"));
        assert!(text.contains("                _signalContext.Signal = @\"Say \"\"hi\"\"\";\n"));
        assert!(text.contains("                _signalContext.FileLine = 20;\n"));
        assert!(text.contains("                    receptor.Method_SayHi(_signalContext, ref a);\n"));
    }

    #[test]
    fn global_namespace_is_not_wrapped() {
        let target = EmitTarget {
            namespaces: vec![],
            ..target()
        };
        let text = receptor_source(&target, &[], &GenerationConfig::default());
        assert!(text.contains("\npartial class Client\n{\n    public interface ISignalsReceptor\n"));
    }

    #[test]
    fn scoped_usings_open_their_own_block() {
        let target = EmitTarget {
            namespaces: vec![
                NamespaceBlock {
                    name: "App".to_string(),
                    usings: vec!["using Models;".to_string()],
                },
                NamespaceBlock {
                    name: "Core".to_string(),
                    usings: vec![],
                },
            ],
            ..target()
        };
        let text = receptor_source(&target, &[], &GenerationConfig::default());
        assert_eq!(
            text,
            "// <auto-generated/>\nusing SharpSenz;\n\nnamespace App\n{\n    using Models;\n\n    namespace Core\n    {\n        partial class Client\n        {\n            public interface ISignalsReceptor\n            {\n            }\n        }\n    }\n}\n"
        );
    }
}
