//! Panic hook printing a crash report with pipeline context.

use std::panic::PanicHookInfo;

use super::context::{get_current_context, PipelineContext};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const RULE: &str = "================================================================";

/// Install the crash report hook. Call once, early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        eprint!("{}", crash_report(info, &get_current_context()));
    }));
}

fn crash_report(info: &PanicHookInfo<'_>, context: &PipelineContext) -> String {
    let mut report = String::new();
    report.push_str(&format!("\n{RULE}\nsigmux {VERSION} crashed on {}\n{RULE}\n", std::env::consts::OS));
    report.push_str(&format!("panic: {}\n", truncate(&extract_panic_message(info), 200)));
    if let Some(location) = info.location() {
        report.push_str(&format!(
            "at: {}:{}:{}\n",
            location.file(),
            location.line(),
            location.column()
        ));
    }
    report.push_str(&context_lines(context));
    if std::env::var_os("RUST_BACKTRACE").is_some() {
        report.push_str(&format!("\n{}\n", std::backtrace::Backtrace::capture()));
    } else {
        report.push_str("run with RUST_BACKTRACE=1 for a stack trace\n");
    }
    report.push_str(RULE);
    report.push('\n');
    report
}

fn context_lines(context: &PipelineContext) -> String {
    let mut lines = String::new();
    match context.phase {
        Some(phase) => lines.push_str(&format!("phase: {phase}\n")),
        None => lines.push_str("phase: (not started)\n"),
    }
    if let Some(file) = &context.current_file {
        lines.push_str(&format!("file: {}\n", file.display()));
    }
    if let Some(ty) = &context.current_type {
        lines.push_str(&format!("type: {ty}\n"));
    }
    lines
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Phase;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 4), "é...");
        assert_eq!(truncate("hello", 3), "...");
    }

    #[test]
    fn context_lines_name_phase_file_and_type() {
        let context = PipelineContext {
            phase: Some(Phase::Synthesis),
            current_file: Some("Client.cs".into()),
            current_type: Some("App.Client".to_string()),
        };
        assert_eq!(
            context_lines(&context),
            "phase: synthesis\nfile: Client.cs\ntype: App.Client\n"
        );
        assert_eq!(context_lines(&PipelineContext::new()), "phase: (not started)\n");
    }
}
