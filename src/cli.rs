use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use crate::io::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sigmux")]
#[command(about = "Comment-driven signal instrumentation for C# sources", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the nearest .sigmux.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report structural diagnostics for annotated types
    Check {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,
    },

    /// Write generated receptor and dispatcher sources
    Generate {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output directory (defaults to obj/sigmux under the project)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fail if the output directory is not up to date instead of writing
        #[arg(long)]
        check: bool,
    },

    /// Apply every available fix in place
    Fix {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print the changes without writing them
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_with_defaults() {
        let cli = Cli::parse_from(["sigmux", "check"]);
        match cli.command {
            Commands::Check { path, format } => {
                assert_eq!(path, PathBuf::from("."));
                assert_eq!(format, OutputFormat::Terminal);
            }
            _ => panic!("Expected Check command"),
        }
        assert_eq!(cli.verbosity, 0);
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::parse_from(["sigmux", "fix", "src", "--dry-run", "-vv"]);
        assert_eq!(cli.verbosity, 2);
        match cli.command {
            Commands::Fix { path, dry_run, .. } => {
                assert_eq!(path, PathBuf::from("src"));
                assert!(dry_run);
            }
            _ => panic!("Expected Fix command"),
        }
    }

    #[test]
    fn parses_generate_options() {
        let cli = Cli::parse_from(["sigmux", "generate", "--out", "gen", "--check"]);
        match cli.command {
            Commands::Generate { out, check, .. } => {
                assert_eq!(out, Some(PathBuf::from("gen")));
                assert!(check);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn parses_init_force() {
        let cli = Cli::parse_from(["sigmux", "init", "--force"]);
        assert!(matches!(cli.command, Commands::Init { force: true }));
    }
}
