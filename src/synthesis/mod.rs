//! Extraction of signal descriptors and synthesis of the receptor interface
//! and dispatcher sources.
//!
//! Synthesis is best effort: it runs on annotated types whether or not they
//! pass validation. A missing dispatcher field means no call sites are found
//! and every marker becomes a parameterless descriptor.

pub mod cache;
pub mod descriptor;
pub mod emit;
pub mod pairing;

use std::collections::HashMap;
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::cancellation::CancellationToken;
use crate::config::SigmuxConfig;
use crate::dispatch::dispatch_calls_in;
use crate::errors::{Result, SigmuxError};
use crate::marker::{method_markers, MarkerGrammar};
use crate::observability::{set_current_type, set_phase, Phase};
use crate::semantic::{Compilation, MethodScope, NamedType, SymbolTable};
use crate::syntax::ast::UsingDirective;
use crate::validator::{annotate, AnnotatedType};

use self::cache::{fingerprint, symbol_digest, CacheKey, CacheStats, GenerationCache};
use self::descriptor::{call_parameters, marker_member_name, pascal_case, SignalDescriptor};
use self::emit::{dispatcher_source, receptor_source, EmitTarget, NamespaceBlock};
use self::pairing::pair;

const GENERIC_COLLECTIONS: &str = "System.Collections.Generic";

/// A consistency problem found while extracting descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesisWarning {
    /// Two sites produce the same member with different parameter lists.
    /// The first one in source order is kept.
    Conflict {
        type_name: String,
        member: String,
        kept_line: usize,
        dropped_line: usize,
    },
    /// A marker's text does not match the member name of its call.
    NameDrift {
        type_name: String,
        member: String,
        signal: String,
        line: usize,
    },
}

impl fmt::Display for SynthesisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisWarning::Conflict {
                type_name,
                member,
                kept_line,
                dropped_line,
            } => write!(
                f,
                "{type_name}: `{member}` at line {dropped_line} has different parameters than at line {kept_line}; keeping line {kept_line}"
            ),
            SynthesisWarning::NameDrift {
                type_name,
                member,
                signal,
                line,
            } => write!(
                f,
                "{type_name}: marker '{signal}' at line {line} is dispatched as `{member}`"
            ),
        }
    }
}

/// Everything synthesized for one annotated type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeArtifacts {
    pub descriptors: Vec<SignalDescriptor>,
    pub receptor: String,
    pub dispatcher: String,
    pub warnings: Vec<SynthesisWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedSource {
    /// File name of the artifact, unique within one run.
    pub hint_name: String,
    /// Qualified name of the annotated type.
    pub type_name: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    pub sources: Vec<GeneratedSource>,
    pub warnings: Vec<SynthesisWarning>,
}

/// Namespace blocks, enclosing type headers and using directives for `ty`.
///
/// Using directives stay at the namespace level they were declared at, so
/// relative names such as `using Models;` inside `namespace App` bind the
/// same way in the generated sources.
pub fn emit_target(ty: &NamedType<'_>, config: &SigmuxConfig) -> EmitTarget {
    let type_parameters = |params: Option<&str>| params.unwrap_or("").to_string();
    let mut type_headers: Vec<String> = ty
        .containing()
        .iter()
        .map(|outer| {
            format!(
                "partial {} {}{}",
                outer.kind.keyword(),
                outer.name,
                type_parameters(outer.type_parameters.as_deref())
            )
        })
        .collect();
    type_headers.push(format!(
        "partial {} {}{}",
        ty.kind().keyword(),
        ty.name,
        type_parameters(ty.type_parameters())
    ));

    let mut usings = vec![
        format!("using {};", config.generation.runtime_namespace),
        format!("using {GENERIC_COLLECTIONS};"),
    ];
    let mut scoped: Vec<(&str, Vec<String>)> = Vec::new();
    for fragment in &ty.fragments {
        for level in fragment.levels.iter().rev() {
            let lines = if level.namespace.is_empty() {
                &mut usings
            } else {
                let idx = match scoped.iter().position(|(ns, _)| *ns == level.namespace) {
                    Some(idx) => idx,
                    None => {
                        scoped.push((level.namespace.as_str(), Vec::new()));
                        scoped.len() - 1
                    }
                };
                &mut scoped[idx].1
            };
            for using in &level.usings {
                push_using(lines, using);
            }
        }
    }

    EmitTarget {
        usings,
        namespaces: namespace_blocks(&ty.namespace, scoped),
        type_headers,
    }
}

fn push_using(lines: &mut Vec<String>, using: &UsingDirective) {
    let line = match (&using.alias, using.is_static) {
        (Some(alias), _) => format!("using {alias} = {};", using.target),
        (None, true) => format!("using static {};", using.target),
        (None, false) => format!("using {};", using.target),
    };
    if lines.contains(&line) {
        return;
    }
    if let Some(alias) = &using.alias {
        let declared = format!("using {alias} = ");
        if lines.iter().any(|existing| existing.starts_with(&declared)) {
            warn!(alias = %alias, target = %using.target, "conflicting using alias left out of generated sources");
            return;
        }
    }
    lines.push(line);
}

/// Splits `namespace` at every level that declares using directives.
/// Levels are enclosing namespaces of the type, so each is a prefix of
/// `namespace`.
fn namespace_blocks<'a>(namespace: &'a str, mut scoped: Vec<(&'a str, Vec<String>)>) -> Vec<NamespaceBlock> {
    if namespace.is_empty() {
        return Vec::new();
    }
    scoped.retain(|(_, lines)| !lines.is_empty());
    scoped.sort_by_key(|(ns, _)| ns.len());
    if scoped.last().map(|(ns, _)| *ns) != Some(namespace) {
        scoped.push((namespace, Vec::new()));
    }

    let mut blocks = Vec::with_capacity(scoped.len());
    let mut opened = "";
    for (ns, usings) in scoped {
        let name = ns
            .strip_prefix(opened)
            .map(|rest| rest.trim_start_matches('.'))
            .unwrap_or(ns);
        blocks.push(NamespaceBlock {
            name: name.to_string(),
            usings,
        });
        opened = ns;
    }
    blocks
}

/// Descriptors for every marker and dispatch call in the type's methods, in
/// source order, deduplicated by member name.
pub fn extract_descriptors<'a>(
    annotated: &AnnotatedType<'_, 'a>,
    symbols: &SymbolTable<'a>,
    grammar: &dyn MarkerGrammar,
    cancel: &CancellationToken,
) -> Result<(Vec<SignalDescriptor>, Vec<SynthesisWarning>)> {
    let type_name = annotated.qualified_name().to_string();
    let mut descriptors: Vec<SignalDescriptor> = Vec::new();
    let mut by_member: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();

    for (fragment, method) in annotated.ty.methods() {
        cancel.check()?;
        let Some(body) = method.body_range() else {
            continue;
        };
        let tree = fragment.tree;
        let markers = method_markers(grammar, tree, method);
        let calls = annotated
            .field_name
            .as_deref()
            .map(|field| dispatch_calls_in(tree, body, field))
            .unwrap_or_default();
        if markers.is_empty() && calls.is_empty() {
            continue;
        }
        let scope = MethodScope::new(symbols, annotated.ty, tree, method);
        let file_path = tree.path().to_string_lossy().into_owned();

        for site in pair(&markers, &calls) {
            let signal = site.marker.map(|m| m.message.clone()).unwrap_or_default();
            let descriptor = match (site.marker, site.call) {
                (_, Some(call)) => SignalDescriptor {
                    file_path: file_path.clone(),
                    line: tree.position(tree.token(call.start).span.start).line,
                    class_name: annotated.name().to_string(),
                    method_name: method.name.clone(),
                    signal,
                    member_name: call.member.clone(),
                    parameters: call_parameters(&scope, tree, call),
                },
                (Some(marker), None) => SignalDescriptor {
                    file_path: file_path.clone(),
                    line: tree.position(marker.span.start).line,
                    class_name: annotated.name().to_string(),
                    method_name: method.name.clone(),
                    member_name: marker_member_name(&method.name, &marker.message),
                    signal,
                    parameters: Vec::new(),
                },
                (None, None) => continue,
            };

            if site.marker.is_some() && site.call.is_some() {
                let derived = marker_member_name(&method.name, &descriptor.signal);
                let bare = pascal_case(&descriptor.signal);
                if descriptor.member_name != derived && descriptor.member_name != bare {
                    warnings.push(SynthesisWarning::NameDrift {
                        type_name: type_name.clone(),
                        member: descriptor.member_name.clone(),
                        signal: descriptor.signal.clone(),
                        line: descriptor.line,
                    });
                }
            }

            match by_member.get(&descriptor.member_name) {
                Some(&kept) => {
                    let kept = &descriptors[kept];
                    if kept.signature() != descriptor.signature() {
                        warnings.push(SynthesisWarning::Conflict {
                            type_name: type_name.clone(),
                            member: descriptor.member_name.clone(),
                            kept_line: kept.line,
                            dropped_line: descriptor.line,
                        });
                    }
                }
                None => {
                    by_member.insert(descriptor.member_name.clone(), descriptors.len());
                    descriptors.push(descriptor);
                }
            }
        }
    }
    Ok((descriptors, warnings))
}

/// Receptor and dispatcher sources for one annotated type.
pub fn synthesize<'a>(
    annotated: &AnnotatedType<'_, 'a>,
    symbols: &SymbolTable<'a>,
    grammar: &dyn MarkerGrammar,
    config: &SigmuxConfig,
    cancel: &CancellationToken,
) -> Result<TypeArtifacts> {
    let (descriptors, warnings) = extract_descriptors(annotated, symbols, grammar, cancel)?;
    let target = emit_target(annotated.ty, config);
    Ok(TypeArtifacts {
        receptor: receptor_source(&target, &descriptors, &config.generation),
        dispatcher: dispatcher_source(&target, &descriptors, &config.generation),
        descriptors,
        warnings,
    })
}

/// Generates sources for every annotated type of a compilation, reusing
/// cached artifacts for types whose inputs did not change.
pub struct SignalsGenerator {
    config: SigmuxConfig,
    grammar: Box<dyn MarkerGrammar>,
    cache: GenerationCache,
}

impl SignalsGenerator {
    pub fn new(config: SigmuxConfig) -> Result<Self> {
        let grammar = config.marker_grammar().map_err(|e| SigmuxError::Config {
            path: None,
            message: format!("invalid marker prefix `{}`: {e}", config.marker.prefix),
        })?;
        Ok(Self::with_grammar(config, Box::new(grammar)))
    }

    pub fn with_grammar(config: SigmuxConfig, grammar: Box<dyn MarkerGrammar>) -> Self {
        Self {
            config,
            grammar,
            cache: GenerationCache::new(),
        }
    }

    pub fn config(&self) -> &SigmuxConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn generate(
        &self,
        compilation: &Compilation,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutput> {
        let span = info_span!("synthesize", documents = compilation.documents().len());
        let _enter = span.enter();
        let symbols = compilation.symbols();
        let digest = symbol_digest(&symbols);

        let generated = symbols
            .types()
            .par_iter()
            .map(|ty| self.generate_type(ty, &symbols, digest, cancel))
            .collect::<Result<Vec<_>>>()?;
        let generated: Vec<(&NamedType<'_>, TypeArtifacts)> =
            generated.into_iter().flatten().collect();

        let live: Vec<CacheKey> = generated.iter().map(|(ty, _)| CacheKey::of(ty)).collect();
        self.cache.retain(&live);

        let names = &self.config.generation;
        let receptor_stem = names
            .receptor_interface
            .strip_prefix('I')
            .unwrap_or(&names.receptor_interface);
        let mut output = GenerationOutput::default();
        for (ty, artifacts) in generated {
            let (prefix, suffix) = hint_qualifiers(ty, &symbols, &live);
            let name = &ty.name;
            output.sources.push(GeneratedSource {
                hint_name: format!("{prefix}I{name}{receptor_stem}{suffix}.g.cs"),
                type_name: ty.qualified_name.clone(),
                text: artifacts.receptor,
            });
            output.sources.push(GeneratedSource {
                hint_name: format!("{prefix}{name}{}{suffix}.g.cs", names.dispatcher_type),
                type_name: ty.qualified_name.clone(),
                text: artifacts.dispatcher,
            });
            output.warnings.extend(artifacts.warnings);
        }
        output.sources.sort_by(|a, b| a.hint_name.cmp(&b.hint_name));
        if let Some(pair) = output
            .sources
            .windows(2)
            .find(|pair| pair[0].hint_name == pair[1].hint_name)
        {
            return Err(SigmuxError::Generation(format!(
                "{} and {} both generate {}",
                pair[0].type_name, pair[1].type_name, pair[0].hint_name
            )));
        }

        let stats = self.cache.stats();
        info!(
            sources = output.sources.len(),
            warnings = output.warnings.len(),
            cache_hits = stats.hits,
            "generation finished"
        );
        Ok(output)
    }

    fn generate_type<'s, 'a>(
        &self,
        ty: &'s NamedType<'a>,
        symbols: &SymbolTable<'a>,
        digest: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<(&'s NamedType<'a>, TypeArtifacts)>> {
        let _phase = set_phase(Phase::Synthesis);
        cancel.check()?;
        let Some(annotated) = annotate(ty, symbols, &self.config) else {
            return Ok(None);
        };
        let _type_guard = set_current_type(&ty.qualified_name);
        let key = CacheKey::of(ty);
        let fingerprint = fingerprint(ty, digest, &self.config);
        if let Some(artifacts) = self.cache.get(&key, fingerprint) {
            debug!(ty = %ty.qualified_name, "reusing cached artifacts");
            return Ok(Some((ty, artifacts)));
        }

        let artifacts = synthesize(&annotated, symbols, self.grammar.as_ref(), &self.config, cancel)?;
        for warning in &artifacts.warnings {
            warn!("{warning}");
        }
        debug!(
            ty = %ty.qualified_name,
            descriptors = artifacts.descriptors.len(),
            "synthesized signal sources"
        );
        self.cache.insert(key, fingerprint, artifacts.clone());
        Ok(Some((ty, artifacts)))
    }
}

/// Prefix and suffix around a hint name. Types sharing a simple name are
/// prefixed with their enclosing namespace and types; generic types sharing
/// a qualified name also get their arity.
fn hint_qualifiers(
    ty: &NamedType<'_>,
    symbols: &SymbolTable<'_>,
    generated: &[CacheKey],
) -> (String, String) {
    let same_name: Vec<&CacheKey> = generated
        .iter()
        .filter(|key| {
            symbols
                .get(&key.qualified_name, key.arity)
                .is_some_and(|other| other.name == ty.name)
        })
        .collect();
    if same_name.len() <= 1 {
        return (String::new(), String::new());
    }
    let prefix = ty
        .qualified_name
        .strip_suffix(ty.name.as_str())
        .unwrap_or("")
        .to_string();
    let same_qualified = same_name
        .iter()
        .filter(|key| key.qualified_name == ty.qualified_name)
        .count();
    let suffix = if same_qualified > 1 && ty.arity > 0 {
        format!("_{}", ty.arity)
    } else {
        String::new()
    };
    (prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::SigMarker;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn compile(sources: &[(&str, &str)]) -> Compilation {
        Compilation::from_sources(
            sources
                .iter()
                .map(|(p, t)| (PathBuf::from(p), t.to_string()))
                .collect(),
        )
    }

    fn generate(compilation: &Compilation) -> GenerationOutput {
        SignalsGenerator::new(SigmuxConfig::default())
            .expect("default config")
            .generate(compilation, &CancellationToken::new())
            .expect("not cancelled")
    }

    fn source<'o>(output: &'o GenerationOutput, hint: &str) -> &'o str {
        &output
            .sources
            .iter()
            .find(|s| s.hint_name == hint)
            .unwrap_or_else(|| panic!("no {hint} in {:?}", output.sources))
            .text
    }

    const CALC: &str = indoc! {"
        using System;
        using SharpSenz;

        namespace Demo
        {
            [SignalsSource]
            public partial class Calculator
            {
                public partial class SignalsMultiplex { }
                public readonly SignalsMultiplex signals = new SignalsMultiplex();

                public int Method(int a, int c)
                {
                    // SIG: Begin of calc
                    signals.Method_BeginOfCalc(a, c);
                    return a + c;
                }
            }
        }
    "};

    #[test]
    fn synthesizes_receptor_for_typed_call() {
        let output = generate(&compile(&[("Calculator.cs", CALC)]));
        assert_eq!(output.sources.len(), 2);
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
        assert_eq!(
            source(&output, "ICalculatorSignalsReceptor.g.cs"),
            indoc! {"
                // <auto-generated/>
                using SharpSenz;
                using System.Collections.Generic;
                using System;

                namespace Demo
                {
                    partial class Calculator
                    {
                        public interface ISignalsReceptor
                        {
                            void Method_BeginOfCalc(SignalContext context, int a, int c);
                        }
                    }
                }
            "}
        );
    }

    #[test]
    fn dispatcher_fills_context_and_forwards() {
        let output = generate(&compile(&[("Calculator.cs", CALC)]));
        let dispatcher = source(&output, "CalculatorSignalsMultiplex.g.cs");
        let expected = [
            "            public void Method_BeginOfCalc(int a, int c)",
            "            {",
            r#"                _signalContext.FilePath = @"Calculator.cs";"#,
            "                _signalContext.FileLine = 15;",
            r#"                _signalContext.ClassName = @"Calculator";"#,
            r#"                _signalContext.MethodName = @"Method";"#,
            r#"                _signalContext.Signal = @"Begin of calc";"#,
            "",
            "                foreach (ISignalsReceptor receptor in Receptors)",
            "                {",
            "                    receptor.Method_BeginOfCalc(_signalContext, a, c);",
            "                }",
            "            }",
            "",
        ]
        .join("\n");
        assert!(dispatcher.contains(&expected), "{dispatcher}");
    }

    #[test]
    fn unpaired_markers_and_calls_become_descriptors() {
        let source_text = indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Worker
            {
                public partial class SignalsMultiplex { }
                public SignalsMultiplex probes;
                void Run(string job)
                {
                    probes.Started(job);
                    // SIG: half way there
                    Step();
                    // SIG: Done
                }
            }
        "};
        let compilation = compile(&[("Worker.cs", source_text)]);
        let symbols = compilation.symbols();
        let ty = symbols.get("Worker", 0).expect("worker");
        let config = SigmuxConfig::default();
        let annotated = annotate(ty, &symbols, &config).expect("annotated");
        let (descriptors, warnings) = extract_descriptors(
            &annotated,
            &symbols,
            &SigMarker::default(),
            &CancellationToken::new(),
        )
        .expect("not cancelled");
        assert!(warnings.is_empty());
        let summary: Vec<(&str, &str, usize, String)> = descriptors
            .iter()
            .map(|d| {
                (
                    d.member_name.as_str(),
                    d.signal.as_str(),
                    d.line,
                    d.declaration_list(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Started", "", 9, "string job".to_string()),
                ("Run_HalfWayThere", "half way there", 10, String::new()),
                ("Run_Done", "Done", 12, String::new()),
            ]
        );
    }

    #[test]
    fn conflicts_and_drift_are_warnings() {
        let source_text = indoc! {"
            using SharpSenz;
            [SignalsSource]
            public partial class Client
            {
                public partial class SignalsMultiplex { }
                public SignalsMultiplex signals;
                void A(int n, string s)
                {
                    // SIG: Tick
                    signals.Tick(n);
                    // SIG: Something else
                    signals.Tick(s);
                    signals.Tick(n);
                }
            }
        "};
        let output = generate(&compile(&[("Client.cs", source_text)]));
        assert_eq!(
            output.warnings,
            vec![
                SynthesisWarning::NameDrift {
                    type_name: "Client".to_string(),
                    member: "Tick".to_string(),
                    signal: "Something else".to_string(),
                    line: 12,
                },
                SynthesisWarning::Conflict {
                    type_name: "Client".to_string(),
                    member: "Tick".to_string(),
                    kept_line: 10,
                    dropped_line: 12,
                },
            ]
        );
        let receptor = source(&output, "IClientSignalsReceptor.g.cs");
        assert_eq!(receptor.matches("void Tick(").count(), 1);
        assert!(receptor.contains("void Tick(SignalContext context, int n);"));
    }

    #[test]
    fn nested_generic_type_reopens_containers() {
        let source_text = indoc! {"
            using SharpSenz;
            namespace App.Core
            {
                using Alias = System.Text.StringBuilder;
                public partial struct Outer
                {
                    [SignalsSource]
                    public partial class Inner<T>
                    {
                        public partial class SignalsMultiplex { }
                    }
                }
            }
        "};
        let output = generate(&compile(&[("Outer.cs", source_text)]));
        let receptor = source(&output, "IInnerSignalsReceptor.g.cs");
        assert!(receptor.contains(
            "namespace App.Core\n{\n    using Alias = System.Text.StringBuilder;\n\n    partial struct Outer\n    {\n        partial class Inner<T>\n"
        ));
        assert_eq!(output.sources[0].type_name, "App.Core.Outer.Inner");
    }

    #[test]
    fn namespace_usings_stay_inside_their_namespace() {
        let source_text = indoc! {"
            using SharpSenz;
            namespace App
            {
                using Models;

                [SignalsSource]
                public partial class Client
                {
                    public partial class SignalsMultiplex { }
                    private readonly SignalsMultiplex signals = new SignalsMultiplex();

                    void M(Item item)
                    {
                        // SIG: x
                        signals.M_X(item);
                    }
                }
            }
            namespace App.Models
            {
                public class Item { }
            }
        "};
        let output = generate(&compile(&[("Client.cs", source_text)]));
        for hint in ["IClientSignalsReceptor.g.cs", "ClientSignalsMultiplex.g.cs"] {
            let text = source(&output, hint);
            assert!(
                text.starts_with(
                    "// <auto-generated/>\nusing SharpSenz;\nusing System.Collections.Generic;\n\nnamespace App\n{\n    using Models;\n\n    partial class Client\n"
                ),
                "{text}"
            );
        }
        assert!(source(&output, "IClientSignalsReceptor.g.cs")
            .contains("void M_X(SignalContext context, Item item);"));
    }

    #[test]
    fn outer_namespace_usings_open_an_outer_block() {
        let first = indoc! {"
            namespace App
            {
                using SharpSenz;
                using Alias = System.Text.StringBuilder;
                namespace Core
                {
                    [SignalsSource]
                    public partial class Job { public partial class SignalsMultiplex { } }
                }
            }
        "};
        let second = indoc! {"
            namespace App.Core
            {
                using Alias = System.Text.Encoder;
                partial class Job { }
            }
        "};
        let output = generate(&compile(&[("a.cs", first), ("b.cs", second)]));
        let receptor = source(&output, "IJobSignalsReceptor.g.cs");
        assert!(
            receptor.contains(
                "namespace App\n{\n    using SharpSenz;\n    using Alias = System.Text.StringBuilder;\n\n    namespace Core\n    {\n        using Alias = System.Text.Encoder;\n\n        partial class Job\n"
            ),
            "{receptor}"
        );
    }

    #[test]
    fn conflicting_aliases_at_one_level_keep_the_first() {
        let first = indoc! {"
            using SharpSenz;
            using Alias = System.Text.StringBuilder;
            [SignalsSource]
            public partial class Job { public partial class SignalsMultiplex { } }
        "};
        let second = indoc! {"
            using Alias = System.Text.Encoder;
            partial class Job { }
        "};
        let output = generate(&compile(&[("a.cs", first), ("b.cs", second)]));
        let receptor = source(&output, "IJobSignalsReceptor.g.cs");
        assert!(receptor.contains("using Alias = System.Text.StringBuilder;\n"));
        assert!(!receptor.contains("System.Text.Encoder"));
    }

    #[test]
    fn colliding_simple_names_are_qualified() {
        let template = |ns: &str| {
            format!(
                "using SharpSenz;\nnamespace {ns} {{ [SignalsSource] public partial class Job {{ public partial class SignalsMultiplex {{ }} }} }}"
            )
        };
        let a = template("A");
        let b = template("B");
        let output = generate(&compile(&[("a.cs", &a), ("b.cs", &b)]));
        let hints: Vec<&str> = output.sources.iter().map(|s| s.hint_name.as_str()).collect();
        assert_eq!(
            hints,
            vec![
                "A.IJobSignalsReceptor.g.cs",
                "A.JobSignalsMultiplex.g.cs",
                "B.IJobSignalsReceptor.g.cs",
                "B.JobSignalsMultiplex.g.cs",
            ]
        );
    }

    #[test]
    fn unchanged_types_hit_the_cache() {
        let generator = SignalsGenerator::new(SigmuxConfig::default()).expect("config");
        let cancel = CancellationToken::new();
        let first = generator
            .generate(&compile(&[("Calculator.cs", CALC)]), &cancel)
            .expect("first");
        let second = generator
            .generate(&compile(&[("Calculator.cs", CALC)]), &cancel)
            .expect("second");
        assert_eq!(first.sources, second.sources);
        let stats = generator.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn cancelled_generation_emits_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = SignalsGenerator::new(SigmuxConfig::default())
            .expect("config")
            .generate(&compile(&[("Calculator.cs", CALC)]), &cancel);
        assert!(matches!(result, Err(SigmuxError::Cancelled)));
    }
}
