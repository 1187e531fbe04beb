//! Palisade CLI entry point
//!
//! Parses arguments, initialises tracing, and dispatches to subcommand
//! handlers. Logs go to stderr so that rendered reports on stdout stay
//! machine-readable.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use palisade_core::config::PalisadeConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Best-effort pre-load for logging settings only. Subcommands reload
    // the configuration and surface any real error themselves.
    let general = PalisadeConfig::load(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_default();
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| general.log_level.clone());
    init_tracing(&level, &general.log_format);

    palisade_core::metrics::describe_all();

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = run(cli, &writer).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
    }
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
