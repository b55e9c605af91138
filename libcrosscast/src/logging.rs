//! Logging setup shared by the library and the `crosscast` binary
//!
//! Logs always go to stderr so that stdout stays reserved for results.
//! Three output formats are available:
//! - `text`: plain lines, the default
//! - `json`: one JSON object per line
//! - `pretty`: multi-line with colors, for development
//!
//! # Examples
//!
//! ```no_run
//! use libcrosscast::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "info".to_string(), false).init();
//!
//! // Or honor CROSSCAST_LOG_FORMAT / CROSSCAST_LOG_LEVEL
//! libcrosscast::logging::init_default(false);
//! ```

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "CROSSCAST_LOG_FORMAT";
pub const LOG_LEVEL_ENV: &str = "CROSSCAST_LOG_LEVEL";

/// Level used when neither the caller nor the environment picks one
pub const DEFAULT_LEVEL: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    /// Forces `debug` unless `RUST_LOG` says otherwise
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Read format and level through `lookup`
    ///
    /// Unparseable formats fall back to text rather than failing startup.
    pub fn from_lookup<F>(lookup: F, verbose: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = lookup(LOG_FORMAT_ENV)
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Text);

        let level = lookup(LOG_LEVEL_ENV)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

        Self::new(format, level, verbose)
    }

    /// Filter directive in effect when `RUST_LOG` is unset
    pub fn directive(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    /// Install the global subscriber
    ///
    /// Returns false if a subscriber was already installed.
    pub fn init(&self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .try_init(),
        };

        installed.is_ok()
    }
}

/// Initialize logging from `CROSSCAST_LOG_FORMAT` and `CROSSCAST_LOG_LEVEL`
pub fn init_default(verbose: bool) -> bool {
    LoggingConfig::from_lookup(|key| std::env::var(key).ok(), verbose).init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" PRETTY ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);

        let error = "yaml".parse::<LogFormat>().unwrap_err();
        assert!(error.contains("Invalid log format: 'yaml'"));
    }

    #[test]
    fn test_log_format_display_roundtrips() {
        for format in [LogFormat::Text, LogFormat::Json, LogFormat::Pretty] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = LoggingConfig::from_lookup(|_| None, false);

        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, DEFAULT_LEVEL);
        assert_eq!(config.directive(), DEFAULT_LEVEL);
    }

    #[test]
    fn test_from_lookup_reads_both_keys() {
        let config = LoggingConfig::from_lookup(
            |key| match key {
                LOG_FORMAT_ENV => Some("json".to_string()),
                LOG_LEVEL_ENV => Some("libcrosscast=trace".to_string()),
                _ => None,
            },
            false,
        );

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directive(), "libcrosscast=trace");
    }

    #[test]
    fn test_bad_format_falls_back_to_text() {
        let config = LoggingConfig::from_lookup(
            |key| (key == LOG_FORMAT_ENV).then(|| "xml".to_string()),
            false,
        );
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_verbose_overrides_level() {
        let config = LoggingConfig::new(LogFormat::Text, "error".to_string(), true);
        assert_eq!(config.directive(), "debug");
    }
}
