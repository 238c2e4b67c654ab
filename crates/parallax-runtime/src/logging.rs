//! Logging setup
//!
//! Installs a global `tracing` subscriber. The filter is read from
//! `PARALLAX_LOG`, then `RUST_LOG`, and defaults to `info`.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "PARALLAX_LOG";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("A global subscriber is already installed")]
    AlreadyInitialized,
}

/// Filter from `PARALLAX_LOG`, else `RUST_LOG`, else `info`
pub fn env_filter() -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| "info".to_string());
    EnvFilter::try_new(&directives).map_err(|e| LoggingError::Filter(e.to_string()))
}

/// Install the global subscriber
pub fn init(format: LogFormat) -> Result<(), LoggingError> {
    let filter = env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
    };
    result.map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        // Whichever test installs first wins; the second call must fail
        let _ = init(LogFormat::Compact);
        assert!(matches!(
            init(LogFormat::Json),
            Err(LoggingError::AlreadyInitialized)
        ));
    }
}
