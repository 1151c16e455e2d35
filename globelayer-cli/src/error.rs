//! CLI error type.

use std::fmt;

use globelayer::config::ConfigError;
use globelayer::elevation::ElevationError;
use globelayer::globe::DriverClosed;
use globelayer::logging::LoggingError;
use globelayer::provider::ProviderError;

/// Errors surfaced to the user by `main`.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file or flag problem.
    Config(String),
    /// Logging could not be set up.
    Logging(String),
    /// HTTP client or data source setup failed.
    Source(String),
    /// Async runtime or driver failure.
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Source(msg) => write!(f, "Source error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Source(e.to_string())
    }
}

impl From<ElevationError> for CliError {
    fn from(e: ElevationError) -> Self {
        CliError::Source(e.to_string())
    }
}

impl From<DriverClosed> for CliError {
    fn from(e: DriverClosed) -> Self {
        CliError::Runtime(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Runtime(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_category() {
        let err = CliError::Config("bad level".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad level");
    }

    #[test]
    fn test_from_driver_closed() {
        let err: CliError = DriverClosed.into();
        assert!(matches!(err, CliError::Runtime(_)));
    }
}
