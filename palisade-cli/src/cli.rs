//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Palisade -- repository security scan orchestrator.
///
/// Use `palisade <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "palisade", version, about, long_about = None)]
pub struct Cli {
    /// Path to the palisade.toml configuration file.
    #[arg(short, long, default_value = "palisade.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full security scan on a repository.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Run a full scan: artifact detection, build, then both scan stages.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Repository path or git clone URL to scan (default: current directory).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Repository name used in reports and image tags (default: directory name).
    #[arg(long)]
    pub repo_name: Option<String>,

    /// Skip the build step and scan only what is already present.
    #[arg(long)]
    pub no_build: bool,

    /// Override the report output directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Override the failure threshold (critical, high, medium, low, info).
    #[arg(long)]
    pub fail_on: Option<String>,
}

// ---- config ----

/// Manage palisade configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, build, scanners, severity, performance, repository).
        #[arg(long)]
        section: Option<String>,
    },
}
