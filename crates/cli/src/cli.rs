//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lockstep - exact-match multi-stream alignment pipeline
#[derive(Parser, Debug)]
#[command(
    name = "lockstep",
    author,
    version,
    about = "Exact-match multi-stream alignment pipeline",
    long_about = "Aligns timestamped messages arriving on parallel streams into exact \n\
                  same-timestamp tuples.\n\n\
                  Runs simulated stream sources from configuration, feeds them through \n\
                  the exact-match aligner, and dispatches aligned tuples to configured \n\
                  sinks and callbacks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOCKSTEP_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOCKSTEP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the alignment pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "LOCKSTEP_CONFIG")]
    pub config: PathBuf,

    /// Maximum number of aligned tuples to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "LOCKSTEP_MAX_TUPLES")]
    pub max_tuples: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "LOCKSTEP_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOCKSTEP_METRICS_PORT")]
    pub metrics_port: u16,

    /// What to do when a lane overflows its watermark
    #[arg(long, value_enum, default_value = "reset", env = "LOCKSTEP_ON_OVERFLOW")]
    pub on_overflow: OverflowPolicy,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Recovery policy when a lane overflows.
///
/// Overflow means synchronization is broken and will not self-heal; stale,
/// misaligned state may remain across lanes, so recovery resets the whole
/// aligner rather than patching one lane.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reset the aligner (clear every lane) and keep running
    #[default]
    Reset,
    /// Stop the pipeline with an error
    Abort,
}
