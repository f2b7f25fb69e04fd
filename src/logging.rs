//! Subscriber setup for the CLI.
//!
//! Console output goes to stderr at the configured level (`--verbose` forces
//! debug). When file logging is enabled, everything at debug and above is
//! also appended to `app.log` in the storage directory, without colours.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;

/// Console level for a config and the `--verbose` flag.
pub fn console_level(config: &LoggingConfig, verbose: bool) -> LevelFilter {
    if verbose {
        return LevelFilter::DEBUG;
    }
    config.level.parse().unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber.
///
/// `log_file` is only used when `config.file` is set. Calling this twice is
/// harmless; the second subscriber is dropped.
pub fn init(config: &LoggingConfig, log_file: &Path, verbose: bool) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_level(config, verbose));

    let file_layer = if config.file {
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file: {:?}", log_file))?;
        Some(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        )
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();
    Ok(())
}
