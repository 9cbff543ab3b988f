use anyhow::Result;
use clap::Parser;
use sigmux::cli::{Cli, Commands};
use sigmux::commands::{self, GenerateOptions};
use sigmux::observability::{init_logging, install_panic_hook};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    install_panic_hook();
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let config = cli.config.as_deref();
    let clean = match cli.command {
        Commands::Check { path, format } => commands::check_project(config, &path, format)?,
        Commands::Generate { path, out, check } => {
            commands::generate_sources(config, &GenerateOptions { path, out, check })?
        }
        Commands::Fix {
            path,
            dry_run,
            format,
        } => commands::fix_project(config, &path, dry_run, format)?,
        Commands::Init { force } => {
            commands::init_config(force)?;
            true
        }
    };

    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
