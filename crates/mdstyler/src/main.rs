//! mdstyler CLI - Markdown to styled documents.
//!
//! Provides commands for:
//! - `render`: Write a standalone styled HTML document
//! - `export`: Write a paginated PDF
//! - `presets`: List the built-in theme presets

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ExportArgs, RenderArgs};
use error::CliError;
use output::Output;

/// mdstyler - Markdown to styled documents.
#[derive(Parser)]
#[command(name = "mdstyler", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command.
#[derive(Args, Debug, Default)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover mdstyler.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (show diagram warnings and timing logs).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Theme preset (overrides config).
    #[arg(long, global = true, env = "MDSTYLER_PRESET")]
    pub preset: Option<String>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long, global = true, env = "MDSTYLER_KROKI_URL")]
    pub kroki_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to a standalone styled HTML document.
    Render(RenderArgs),
    /// Export a markdown file as a paginated PDF.
    Export(ExportArgs),
    /// List the built-in theme presets.
    Presets,
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Presets => {
            commands::list_presets();
            Ok(())
        }
        Commands::Render(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(args.execute(&cli.global))
        }
        Commands::Export(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(args.execute(&cli.global))
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mdstyler",
            "export",
            "notes.md",
            "--preset",
            "nord",
            "-o",
            "out.pdf",
        ])
        .unwrap();
        assert_eq!(cli.global.preset.as_deref(), Some("nord"));
        assert!(matches!(cli.command, Commands::Export(_)));
    }
}
