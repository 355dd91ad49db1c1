//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Icaptest -- conformance harness for ICAP adaptation services.
///
/// Use `icaptest <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "icaptest", version, about, long_about = None)]
pub struct Cli {
    /// Path to the icaptest.toml configuration file.
    #[arg(short, long, default_value = "icaptest.toml")]
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
    /// Human-readable styled console output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full conformance matrix against the SUT.
    Run(RunArgs),

    /// Issue a single probe exchange and print the parsed response.
    Probe(ProbeArgs),

    /// Manage harness configuration.
    Config(ConfigArgs),
}

// ---- run ----

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Adaptation modes to exercise.
    #[arg(long, value_delimiter = ',', default_values = ["resp", "req"])]
    pub modes: Vec<ModeArg>,

    /// Skip the cache-tag (ISTag) verification sweep.
    #[arg(long)]
    pub skip_tag_checks: bool,
}

/// Adaptation mode selector for `--modes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Response adaptation (RESPMOD).
    Resp,
    /// Request adaptation (REQMOD).
    Req,
}

// ---- probe ----

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Target ICAP service name.
    #[arg(short, long, default_value = "echo")]
    pub service: String,

    /// Input file to send through the service.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Adapt the request instead of the response (REQMOD).
    #[arg(long)]
    pub req_mode: bool,

    /// Disable the 204 negotiation shortcut.
    #[arg(long)]
    pub no204: bool,

    /// Disable preview negotiation entirely.
    #[arg(long, conflicts_with = "preview")]
    pub nopreview: bool,

    /// Explicit preview window in bytes (0 is valid).
    #[arg(short = 'w', long)]
    pub preview: Option<u32>,

    /// HTTP method label (non-standard tokens are passed through).
    #[arg(short, long)]
    pub method: Option<String>,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report any errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Section to display (general, sut, probe, fixtures).
        section: Option<String>,
    },
}
