// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jobloop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobloop",
    version,
    about = "Run a dependency-ordered batch of shell jobs on a bounded worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Jobloop.toml")]
    pub config: String,

    /// Number of parallel workers (0 = one per CPU). Overrides `[config].jobs`.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Stop dispatching new jobs once this file exists. Overrides `[config].abort_file`.
    #[arg(long, value_name = "PATH")]
    pub abort_file: Option<PathBuf>,

    /// Abort after N consecutive failures (0 = never).
    /// Overrides `[config].max_consecutive_failures`.
    #[arg(long, value_name = "N")]
    pub max_consecutive_failures: Option<u32>,

    /// Poll running jobs at a fixed interval instead of adapting it.
    #[arg(long)]
    pub no_dynamic_poll: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, the `JOBLOOP_LOG` filter or the default filter is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the job graph, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive for this level.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
