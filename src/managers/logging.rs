//! Logging setup with file rotation
//!
//! Provides dual-output logging:
//! - Console: stderr, colored, concise
//! - File: `snapshotter.log.<date>` in the log directory, text or JSON
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingSettings};

/// Prefix of every log file written by the file layer
pub const LOG_FILE_PREFIX: &str = "snapshotter.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files
    pub log_directory: PathBuf,
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Build from the config file's `logging` section
    ///
    /// `level_override` (from the command line) wins over the configured level.
    pub fn from_settings(
        settings: &LoggingSettings,
        log_directory: PathBuf,
        level_override: Option<&str>,
    ) -> Self {
        let level = level_override
            .and_then(parse_level)
            .or_else(|| parse_level(&settings.level))
            .unwrap_or(Level::INFO);

        Self {
            log_directory,
            log_level: level,
            max_files: settings.max_files,
            format: settings.format,
        }
    }
}

/// Map a configured level name to a tracing level
///
/// `WARNING` and `CRITICAL` are accepted for the levels tracing calls
/// `WARN` and `ERROR`.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" | "CRITICAL" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with console and file outputs
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let log_dir = &config.log_directory;
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    // Daily rotation; old files are pruned below
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_current_span(true)
            .with_filter(level_filter(config.log_level))
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_filter(level_filter(config.log_level))
            .boxed(),
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(config.log_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    cleanup_old_logs(log_dir, config.max_files)?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Initialize simple console-only logging (for when config isn't available)
pub fn init_console_logging() {
    init_console_logging_at(Level::INFO);
}

/// Console-only logging at a given level
pub fn init_console_logging_at(level: Level) {
    // A subscriber may already be installed; keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .try_init();
}

/// Create a level filter for tracing layers
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()))
}

/// Remove old log files, keeping only the most recent `max_files`
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(LOG_FILE_PREFIX)
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}
