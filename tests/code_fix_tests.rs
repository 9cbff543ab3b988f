use pretty_assertions::assert_eq;
use sigmux::{CancellationToken, FixReport, SigmuxConfig, Workspace};
use std::path::PathBuf;

/// Runs the batch fixer over one document and returns the report and the
/// fixed text.
fn fix_all(source: &str) -> (FixReport, String) {
    let mut workspace = Workspace::from_sources(
        SigmuxConfig::default(),
        vec![(PathBuf::from("Test0.cs"), source.to_string())],
    )
    .expect("default config");
    let report = workspace
        .fix_all(&CancellationToken::new())
        .expect("fixes converge");
    let text = workspace.documents()[0].text().to_string();
    (report, text)
}

fn applied_ids(report: &FixReport) -> Vec<&str> {
    report.applied.iter().map(|fix| fix.id).collect()
}

/// Fixture with a dispatcher, its field and `body` as the method body.
fn with_scaffolding(body: &str) -> String {
    format!(
        r#"
    using System;
    using SharpSenz;

    namespace ConsoleApplication1
    {{
        [SignalsSource]
        public partial class Signaller
        {{
            public partial class SignalsMultiplex
            {{
                public void Method_SomeSignal() {{ }}
            }}

            public readonly SignalsMultiplex signals = new SignalsMultiplex();

            public void Method()
            {{
{body}            }}
        }}
    }}
"#
    )
}

#[test]
fn non_partial_type_without_dispatcher_gets_scaffolding() {
    let test = r#"
    using System;
    using SharpSenz;

    namespace ConsoleApplication1
    {
        [SignalsSource]
        public class Signaller
        {
            public void Method()
            {
                int a = 10;

                int b = a + 5;
            }
        }
    }
"#;
    let fixed = r#"
    using System;
    using SharpSenz;

    namespace ConsoleApplication1
    {
        [SignalsSource]
        public partial class Signaller
        {
            public partial class SignalsMultiplex { }
            public readonly SignalsMultiplex signals = new SignalsMultiplex();
            public void Method()
            {
                int a = 10;

                int b = a + 5;
            }
        }
    }
"#;
    let (report, text) = fix_all(test);
    assert_eq!(text, fixed);
    assert_eq!(applied_ids(&report), vec!["SZ001", "SZ002", "SZ005"]);
    assert!(report.remaining.is_empty());
}

#[test]
fn call_is_inserted_at_the_beginning_of_the_method() {
    let test = with_scaffolding(
        "                // SIG: Some Signal

                int a = 10;
                int b = a + 5;
",
    );
    let fixed = with_scaffolding(
        "                // SIG: Some Signal
                signals.Method_SomeSignal();

                int a = 10;
                int b = a + 5;
",
    );
    let (report, text) = fix_all(&test);
    assert_eq!(text, fixed);
    assert_eq!(applied_ids(&report), vec!["SZ010"]);
}

#[test]
fn call_is_inserted_in_the_middle_of_the_method() {
    let test = with_scaffolding(
        "                int a = 10;

                // SIG: Some Signal

                int b = a + 5;
",
    );
    let fixed = with_scaffolding(
        "                int a = 10;

                // SIG: Some Signal
                signals.Method_SomeSignal();

                int b = a + 5;
",
    );
    let (_, text) = fix_all(&test);
    assert_eq!(text, fixed);
}

#[test]
fn call_follows_the_marker_among_other_comments() {
    let test = with_scaffolding(
        "                int a = 10;

                // Some comment before
                // SIG: Some Signal

                // Some comment after

                int b = a + 5;
",
    );
    let fixed = with_scaffolding(
        "                int a = 10;

                // Some comment before
                // SIG: Some Signal
                signals.Method_SomeSignal();

                // Some comment after

                int b = a + 5;
",
    );
    let (_, text) = fix_all(&test);
    assert_eq!(text, fixed);
}

#[test]
fn call_is_inserted_at_the_end_of_the_method() {
    let test = with_scaffolding(
        "                int a = 10;
                int b = a + 5;

                // SIG: Some Signal
",
    );
    let fixed = with_scaffolding(
        "                int a = 10;
                int b = a + 5;

                // SIG: Some Signal
                signals.Method_SomeSignal();
",
    );
    let (_, text) = fix_all(&test);
    assert_eq!(text, fixed);
}

#[test]
fn call_at_the_end_keeps_trailing_comments() {
    let test = with_scaffolding(
        "                int a = 10;
                int b = a + 5;

                // Some comment before
                // SIG: Some Signal

                // Some Comment after

",
    );
    let fixed = with_scaffolding(
        "                int a = 10;
                int b = a + 5;

                // Some comment before
                // SIG: Some Signal
                signals.Method_SomeSignal();

                // Some Comment after

",
    );
    let (_, text) = fix_all(&test);
    assert_eq!(text, fixed);
}

#[test]
fn calls_are_inserted_inside_lambda_and_delegate_bodies() {
    let test = with_scaffolding(
        "                Action first = () =>
                {
                    // SIG: In Lambda
                    Run();
                };
                items.ForEach(delegate (int i)
                {
                    // SIG: In Delegate
                });
",
    );
    let fixed = with_scaffolding(
        "                Action first = () =>
                {
                    // SIG: In Lambda
                    signals.Method_InLambda();
                    Run();
                };
                items.ForEach(delegate (int i)
                {
                    // SIG: In Delegate
                    signals.Method_InDelegate();
                });
",
    );
    let (report, text) = fix_all(&test);
    assert_eq!(text, fixed);
    assert_eq!(applied_ids(&report), vec!["SZ010", "SZ010"]);
    assert!(report.skipped.is_empty());
    assert!(report.remaining.is_empty());
}

#[test]
fn dispatcher_modifiers_are_repaired() {
    let test = r#"
using SharpSenz;

[SignalsSource]
public partial class Job
{
    protected internal sealed class SignalsMultiplex { }
    public SignalsMultiplex probes;

    void Run()
    {
        // SIG: Started
    }
}
"#;
    let fixed = r#"
using SharpSenz;

[SignalsSource]
public partial class Job
{
    public sealed partial class SignalsMultiplex { }
    public SignalsMultiplex probes;

    void Run()
    {
        // SIG: Started
        probes.Run_Started();
    }
}
"#;
    let (report, text) = fix_all(test);
    assert_eq!(text, fixed);
    assert_eq!(applied_ids(&report), vec!["SZ003", "SZ004", "SZ010"]);
}

#[test]
fn fixes_span_every_document_of_a_partial_type() {
    let mut workspace = Workspace::from_sources(
        SigmuxConfig::default(),
        vec![
            (
                PathBuf::from("Job.cs"),
                "using SharpSenz;\n[SignalsSource]\npublic partial class Job\n{\n    void Run()\n    {\n        // SIG: Started\n    }\n}\n".to_string(),
            ),
            (
                PathBuf::from("Job.More.cs"),
                "public partial class Job\n{\n    void Stop()\n    {\n        // SIG: Stopped\n    }\n}\n".to_string(),
            ),
        ],
    )
    .expect("default config");
    let report = workspace
        .fix_all(&CancellationToken::new())
        .expect("fixes converge");
    assert_eq!(
        applied_ids(&report),
        // diagnostics are ordered by path, and Job.More.cs sorts first
        vec!["SZ002", "SZ010", "SZ005", "SZ010"]
    );
    assert!(report.remaining.is_empty());
    assert_eq!(
        workspace.documents()[1].text(),
        "public partial class Job\n{\n    void Stop()\n    {\n        // SIG: Stopped\n        signals.Stop_Stopped();\n    }\n}\n"
    );
    assert_eq!(workspace.changed_documents().len(), 2);
}
