//! Logging setup for tempshare.
//!
//! Events go to stdout and, when a log file is configured, to that file too.
//! `RUST_LOG` takes precedence over the configured level.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Dependencies whose info and debug output is per-query or per-request noise.
const QUIET_TARGETS: &[&str] = &["sqlx", "tower_http"];

/// Target of the file store and the retention sweeper.
const STORE_TARGET: &str = "tempshare::file";

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn one_step_louder(level: Level) -> Level {
    match level {
        Level::ERROR => Level::WARN,
        Level::WARN => Level::INFO,
        Level::INFO => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Build the event filter.
///
/// A non-empty, parseable `rust_log` replaces everything else. Otherwise the
/// configured level applies globally, [`QUIET_TARGETS`] are capped at warn and
/// the file store runs one level louder so every stored and swept object
/// leaves a trace.
pub fn build_filter(level: &str, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("Ignoring invalid {}: {e}", EnvFilter::DEFAULT_ENV),
        }
    }

    let level = parse_level(level);
    let mut directives = vec![
        level.as_str().to_ascii_lowercase(),
        format!(
            "{STORE_TARGET}={}",
            one_step_louder(level).as_str().to_ascii_lowercase()
        ),
    ];
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));

    EnvFilter::new(directives.join(","))
}

/// Open the log file for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialize logging to stdout and the configured log file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let log_file = open_log_file(Path::new(&config.file))?;
    install(&config.level, Some(log_file));
    Ok(())
}

/// Initialize stdout-only logging, used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    install(level, None);
}

fn install(level: &str, log_file: Option<File>) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, rust_log.as_deref());

    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_writer(Arc::new(file))
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();
}
