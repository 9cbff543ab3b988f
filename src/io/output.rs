use crate::diagnostics::{Diagnostic, Severity};
use crate::workspace::FixReport;
use colored::*;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}

pub trait OutputWriter {
    fn write_diagnostics(&mut self, diagnostics: &[Diagnostic]) -> anyhow::Result<()>;
    fn write_fix_report(&mut self, report: &FixReport) -> anyhow::Result<()>;
}

/// Flat diagnostic record for machine consumers.
#[derive(Debug, Serialize)]
struct DiagnosticRecord<'d> {
    id: &'static str,
    severity: Severity,
    message: String,
    path: &'d Path,
    line: usize,
    column: usize,
    type_name: &'d str,
}

impl<'d> From<&'d Diagnostic> for DiagnosticRecord<'d> {
    fn from(diagnostic: &'d Diagnostic) -> Self {
        Self {
            id: diagnostic.id(),
            severity: diagnostic.severity(),
            message: diagnostic.message(),
            path: &diagnostic.location.path,
            line: diagnostic.location.start.line,
            column: diagnostic.location.start.column,
            type_name: &diagnostic.type_name,
        }
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_diagnostics(&mut self, diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
        let records: Vec<DiagnosticRecord> = diagnostics.iter().map(Into::into).collect();
        let json = serde_json::to_string_pretty(&records)?;
        writeln!(self.writer, "{json}")?;
        Ok(())
    }

    fn write_fix_report(&mut self, report: &FixReport) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        writeln!(self.writer, "{json}")?;
        Ok(())
    }
}

pub struct TerminalWriter<W: Write> {
    writer: W,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_diagnostic(&mut self, diagnostic: &Diagnostic) -> anyhow::Result<()> {
        let severity = diagnostic.severity().to_string().red().bold();
        writeln!(
            self.writer,
            "{}: {}[{}]: {}",
            diagnostic.location.to_string().bold(),
            severity,
            diagnostic.id(),
            diagnostic.message()
        )?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_diagnostics(&mut self, diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
        for diagnostic in diagnostics {
            self.write_diagnostic(diagnostic)?;
        }
        if diagnostics.is_empty() {
            writeln!(self.writer, "{}", "No problems found".green())?;
        } else {
            writeln!(
                self.writer,
                "{} problem{} found",
                diagnostics.len(),
                if diagnostics.len() == 1 { "" } else { "s" }
            )?;
        }
        Ok(())
    }

    fn write_fix_report(&mut self, report: &FixReport) -> anyhow::Result<()> {
        for fix in &report.applied {
            writeln!(
                self.writer,
                "{} {} [{}] {}",
                "fixed".green().bold(),
                fix.path.display(),
                fix.id,
                fix.title
            )?;
        }
        for skipped in &report.skipped {
            writeln!(
                self.writer,
                "{} {}[{}]: {}",
                "skipped".yellow().bold(),
                skipped.diagnostic.location,
                skipped.diagnostic.id(),
                skipped.reason
            )?;
        }
        let remaining = report.remaining.len();
        writeln!(
            self.writer,
            "{} fix{} applied, {} remaining",
            report.applied.len(),
            if report.applied.len() == 1 { "" } else { "es" },
            remaining
        )?;
        Ok(())
    }
}

pub fn create_writer(format: OutputFormat) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(std::io::stdout())),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(std::io::stdout())),
    }
}

const CONTEXT_LINES: usize = 2;

/// A single-hunk unified diff spanning every changed line.
pub fn unified_summary(path: &Path, before: &str, after: &str) -> String {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();
    if old == new {
        return String::new();
    }

    let prefix = old
        .iter()
        .zip(&new)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let start = prefix.saturating_sub(CONTEXT_LINES);
    let old_end = (old.len() - suffix + CONTEXT_LINES).min(old.len());
    let new_end = (new.len() - suffix + CONTEXT_LINES).min(new.len());

    let mut out = format!("--- a/{0}\n+++ b/{0}\n", path.display());
    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        start + 1,
        old_end - start,
        start + 1,
        new_end - start
    ));
    for line in &old[start..prefix] {
        out.push_str(&format!(" {line}\n"));
    }
    for line in &old[prefix..old.len() - suffix] {
        out.push_str(&format!("-{line}\n"));
    }
    for line in &new[prefix..new.len() - suffix] {
        out.push_str(&format!("+{line}\n"));
    }
    for line in &old[old.len() - suffix..old_end] {
        out.push_str(&format!(" {line}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::syntax::{LinePosition, Location, Span};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn diagnostic() -> Diagnostic {
        Diagnostic {
            kind: DiagnosticKind::NonPartialType,
            location: Location {
                path: PathBuf::from("Job.cs"),
                span: Span::new(10, 20),
                start: LinePosition { line: 3, column: 1 },
                end: LinePosition { line: 3, column: 11 },
            },
            argument: "Job".to_string(),
            type_name: "App.Job".to_string(),
            arity: 0,
        }
    }

    #[test]
    fn json_diagnostics_are_flat_records() {
        let mut buffer = Vec::new();
        JsonWriter::new(&mut buffer)
            .write_diagnostics(&[diagnostic()])
            .expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buffer).expect("json");
        assert_eq!(value[0]["id"], "SZ001");
        assert_eq!(value[0]["severity"], "error");
        assert_eq!(value[0]["line"], 3);
        assert_eq!(value[0]["path"], "Job.cs");
        assert_eq!(value[0]["type_name"], "App.Job");
    }

    #[test]
    fn terminal_output_names_location_and_id() {
        let mut buffer = Vec::new();
        TerminalWriter::new(&mut buffer)
            .write_diagnostics(&[diagnostic()])
            .expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("Job.cs:3:1"));
        assert!(text.contains("SZ001"));
        assert!(text.contains("1 problem found"));
    }

    #[test]
    fn summary_covers_the_changed_region() {
        let before = "a\nb\nc\nd\ne\nf\n";
        let after = "a\nb\nc\nX\nd\ne\nf\n";
        assert_eq!(
            unified_summary(Path::new("F.cs"), before, after),
            "--- a/F.cs\n+++ b/F.cs\n@@ -2,4 +2,5 @@\n b\n c\n+X\n d\n e\n"
        );
        assert_eq!(unified_summary(Path::new("F.cs"), before, before), "");
    }
}
