//! Logging initialization for the `twitchy` binary
//!
//! The filter is picked in this order:
//! 1. CLI flags (`-v/-q`)
//! 2. RUST_LOG environment variable
//! 3. The binary's default filter

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter for the given verbosity, falling back to RUST_LOG and
/// then `default_filter`
pub fn build_filter<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<EnvFilter> {
    let filter = match verbosity.log_level() {
        Some(level) => EnvFilter::try_new(level.to_string())?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
    };
    Ok(filter)
}

/// Initialize logging with the specified verbosity level and default filter.
///
/// Logs go to stderr so `--json` output on stdout stays machine-readable.
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = build_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();

    Ok(())
}

/// Initialize logging only when asked for through flags or RUST_LOG.
///
/// Returns whether a subscriber was installed.
pub fn init_cli_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<bool> {
    if verbosity.log_level().is_some() || std::env::var("RUST_LOG").is_ok() {
        init_logging(verbosity, default_filter)?;
        Ok(true)
    } else {
        Ok(false)
    }
}
