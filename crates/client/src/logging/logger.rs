// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level '{level}': {source}")]
    InvalidLogLevel {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to install global subscriber: {0}")]
    InitError(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for logging initialization
pub struct LoggingConfig<'a> {
    pub level: &'a str,
    pub json_format: bool,
    pub strip_ansi: bool,
}

impl<'a> From<&'a tzstats_config::LogConfig> for LoggingConfig<'a> {
    fn from(config: &'a tzstats_config::LogConfig) -> Self {
        Self {
            level: &config.level,
            json_format: config.json,
            strip_ansi: config.strip_ansi,
        }
    }
}

pub(crate) fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLogLevel {
        level: level.to_string(),
        source,
    })
}

/// Initialize tracing with the specified configuration
///
/// Logs go to stderr so that command output on stdout stays machine readable.
///
/// # Examples
/// ```no_run
/// use tzstats::logging::{self, LoggingConfig};
///
/// logging::init_with_config(LoggingConfig {
///     level: "debug",
///     json_format: false,
///     strip_ansi: false,
/// })?;
/// # Ok::<(), tzstats::logging::LoggingError>(())
/// ```
pub fn init_with_config(config: LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        let fmt_layer = fmt::layer().json().with_writer(std::io::stderr);
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(!config.strip_ansi)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).try_init()?;
    }

    Ok(())
}

pub fn init(level: &str, json_format: bool, strip_ansi: bool) -> Result<(), LoggingError> {
    init_with_config(LoggingConfig {
        level,
        json_format,
        strip_ansi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_levels() {
        for level in ["trace", "debug", "info", "warn", "error", "tzstats=debug,info"] {
            assert!(build_filter(level).is_ok(), "level {level} should parse");
        }
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let err = build_filter("tzstats=loud").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidLogLevel { .. }));
    }

    #[test]
    fn test_config_from_log_config() {
        let log = tzstats_config::LogConfig {
            level: "debug".to_string(),
            json: true,
            strip_ansi: false,
        };
        let config = LoggingConfig::from(&log);
        assert_eq!(config.level, "debug");
        assert!(config.json_format);
    }
}
