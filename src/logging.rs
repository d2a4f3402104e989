//! Logging setup for `trun` using `tracing` + `tracing-subscriber`.
//!
//! Log lines go to stderr so that task output on stdout stays clean.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `-s`, `-q` or `-v` flags
//! 3. `TRUN_LOG` environment variable (e.g. "info", "debug", "trun=trace")
//! 4. default to `info`

use anyhow::{anyhow, Result};
use std::io::IsTerminal;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted when no level flag is given
pub const LOG_ENV_VAR: &str = "TRUN_LOG";

/// Accepted values for `--log-level`
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Build the filter from the explicit level, or from `TRUN_LOG` directives.
///
/// Unparsable `TRUN_LOG` directives are skipped and the default `info` applies.
pub fn build_filter(cli_level: Option<Level>) -> EnvFilter {
    match cli_level {
        Some(level) => EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .parse_lossy(""),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .with_env_var(LOG_ENV_VAR)
            .from_env_lossy(),
    }
}

/// Initialise the global logging subscriber.
///
/// Call once at startup.
pub fn init_logging(cli_level: Option<Level>) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(cli_level))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
