//! wslsync CLI - command-line interface for the mirror synchronizer
//!
//! Provides commands for:
//! - Running a one-shot mirror sync with live error reporting
//! - Inspecting the effective configuration
//!
//! Exit status reflects the run outcome: 0 for a clean run, 2 when the run
//! completed with warnings, 1 when it failed.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, sync::SyncCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "wslsync", version, about = "Mirror synchronizer between WSL and Windows filesystems")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror a source tree into a destination tree
    Sync(SyncCommand),
    /// View and validate the effective configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let result = match cli.command {
        Commands::Sync(cmd) => cmd.execute(format, cli.config.as_deref()).await,
        Commands::Config(cmd) => cmd.execute(format, cli.config.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\u{2717} Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
