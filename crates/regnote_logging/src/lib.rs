//! Shared logging utilities for RegNote binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "regnote=info,regnote_db=info";
const VERBOSE_LOG_FILTER: &str = "regnote=debug,regnote_db=debug";

/// Logging configuration shared by RegNote binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Directory for the daily log files
    pub log_dir: &'a Path,
    pub verbose: bool,
}

/// Keeps the background log writer alive. Drop it last; dropping flushes.
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Initialize tracing with a daily rolling file writer and stderr output.
///
/// One file per day (`<app_name>.log.YYYY-MM-DD`) so an operator can find the
/// run that missed a notification by date.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let log_dir = ensure_dir(config.log_dir).context("Failed to ensure log directory")?;

    let file_appender =
        tracing_appender::rolling::daily(&log_dir, format!("{}.log", sanitize_name(config.app_name)));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = default_filter();
    let console_filter = if config.verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        default_filter()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Get the RegNote home directory: ~/.regnote
///
/// `REGNOTE_HOME` overrides the location; falls back to the working
/// directory when no home directory can be determined.
pub fn regnote_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("REGNOTE_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".regnote"))
        .unwrap_or_else(|| PathBuf::from(".regnote"))
}

/// Get the default logs directory: ~/.regnote/logs
pub fn default_logs_dir() -> PathBuf {
    regnote_home().join("logs")
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("regnote"), "regnote");
        assert_eq!(sanitize_name("reg note/v2"), "reg_note_v2");
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("logs");
        let created = ensure_dir(&dir).unwrap();
        assert!(created.is_dir());
    }

    #[test]
    fn test_default_logs_dir_is_under_home() {
        assert!(default_logs_dir().starts_with(regnote_home()));
    }
}
