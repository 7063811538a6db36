//! Viewtally CLI - Command-line interface
//!
//! Serves the view-count endpoint or runs a single aggregation from the shell.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use viewtally_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "viewtally")]
#[command(about = "Aggregate portfolio view counts across YouTube and Vimeo")]
#[command(version)]
struct Cli {
    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = CliLogLevel::default())]
    log_level: CliLogLevel,

    /// Directory for a trace-level log of this run
    #[arg(long)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;

    commands::handle_command(cli.command).await
}
