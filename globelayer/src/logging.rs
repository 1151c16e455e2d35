//! Tracing subscriber setup.
//!
//! Events go to stderr and to a non-blocking log file in the configured
//! directory. Both use local-time timestamps. `RUST_LOG` overrides the
//! configured filter.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Name of the log file inside the log directory.
pub const LOG_FILE_NAME: &str = "globelayer.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Full path of the log file for `settings`.
pub fn log_file_path(settings: &LoggingSettings) -> PathBuf {
    settings.directory.join(LOG_FILE_NAME)
}

/// Builds the event filter: `RUST_LOG` if set, else `filter`.
pub fn build_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(filter).map_err(|e| LoggingError::InvalidFilter {
        filter: filter.to_string(),
        message: e.to_string(),
    })
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init_logging(settings: &LoggingSettings) -> Result<WorkerGuard, LoggingError> {
    ensure_directory(&settings.directory)?;
    let filter = build_filter(&settings.filter)?;

    let file_appender = tracing_appender::rolling::never(&settings.directory, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer())
        .with_target(false);
    let file = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_timer(local_timer())
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guard)
}

/// RFC 3339 timer in the local offset, or UTC if the offset is unknown.
fn local_timer() -> OffsetTime<Rfc3339> {
    OffsetTime::local_rfc_3339().unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339))
}

fn ensure_directory(path: &Path) -> Result<(), LoggingError> {
    std::fs::create_dir_all(path).map_err(|source| LoggingError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_path() {
        let settings = LoggingSettings {
            filter: "globelayer=debug".to_string(),
            directory: PathBuf::from("/var/log/globelayer"),
        };
        assert_eq!(
            log_file_path(&settings),
            PathBuf::from("/var/log/globelayer/globelayer.log")
        );
    }

    #[test]
    fn test_build_filter_accepts_default() {
        assert!(build_filter(crate::config::DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_ensure_directory_creates_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
