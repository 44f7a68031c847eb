//! Logging infrastructure built on tracing.
//!
//! Three output formats are supported:
//! - **pretty**: human-readable, for development
//! - **json**: one JSON object per event, for log aggregation
//! - **compact**: single-line, for constrained terminals
//!
//! Secrets, passwords and raw bearer tokens must never be passed as fields.

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logging setup.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level filter, e.g. "info" or "clinic_api=debug,tower_http=info"
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        LogConfig::new(config.level.clone()).with_format(config.format.parse().unwrap_or_default())
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`.
///
/// # Example
///
/// ```no_run
/// use clinic_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty())
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json())
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact())
            .try_init()?,
    }

    tracing::info!(
        format = ?config.format,
        level = %config.level,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_from_logging_section() {
        let section = LoggingConfig {
            level: "clinic_api=debug".to_string(),
            format: "json".to_string(),
        };
        let config = LogConfig::from(&section);
        assert_eq!(config.level, "clinic_api=debug");
        assert_eq!(config.format, LogFormat::Json);

        let section = LoggingConfig {
            level: "warn".to_string(),
            format: "fancy".to_string(),
        };
        assert_eq!(LogConfig::from(&section).format, LogFormat::Pretty);
    }
}
