// src/logging.rs

//! Logging setup for `jobloop` using `tracing` + `tracing-subscriber`.
//!
//! Filter priority:
//! 1. `--log-level` CLI flag (applies to every target)
//! 2. `JOBLOOP_LOG` environment variable, any `EnvFilter` directive list
//!    (e.g. `info,jobloop::engine=debug` to watch dispatch and polling)
//! 3. [`DEFAULT_DIRECTIVES`]
//!
//! Logs go to STDERR so job output on stdout stays readable.

use std::io::IsTerminal;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "JOBLOOP_LOG";

/// Job results at info; per-sweep poll-interval changes stay quiet.
pub const DEFAULT_DIRECTIVES: &str = "info,jobloop::engine::poll=warn";

/// Initialise global logging subscriber.
///
/// Fails if `JOBLOOP_LOG` is not a valid filter or a subscriber is already set.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = log_filter(cli_level, env_value.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("installing tracing subscriber")
}

/// Build the filter from the CLI flag and the raw `JOBLOOP_LOG` value.
pub fn log_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level.as_directive()));
    }

    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV} value {directives:?}")),
        None => Ok(EnvFilter::new(DEFAULT_DIRECTIVES)),
    }
}
