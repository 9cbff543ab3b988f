//! Logging setup and crash-report context.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once to install a stderr subscriber and [`install_panic_hook`] to get
//! crash reports that name the phase, document and type being processed.

pub mod context;
pub mod panic_hook;

use std::sync::OnceLock;

pub use context::{
    get_current_context, reset_context, set_current_file, set_current_type, set_phase,
    ContextGuard, Phase, PipelineContext,
};
pub use panic_hook::install_panic_hook;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "SIGMUX_LOG";

/// Filter directive for a `-v` count: 0 warns, 1 adds info for sigmux, 2+
/// adds debug.
pub fn verbosity_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,sigmux=info",
        _ => "info,sigmux=debug",
    }
}

/// Installs the global subscriber. `-v` flags override `SIGMUX_LOG`; later
/// calls are no-ops.
pub fn init_logging(verbosity: u8) {
    use std::io::IsTerminal;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    let _ = INITIALISED.get_or_init(|| {
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = if verbosity > 0 {
            EnvFilter::new(verbosity_directive(verbosity))
        } else {
            EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| EnvFilter::new(verbosity_directive(0)))
        };
        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .compact()
            .finish();
        // also bridges `log` records from the config loader
        let _ = subscriber.try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_sigmux_level() {
        assert_eq!(verbosity_directive(0), "warn");
        assert!(verbosity_directive(1).contains("sigmux=info"));
        assert!(verbosity_directive(5).contains("sigmux=debug"));
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(2);
        init_logging(0);
    }
}
