//! Logging setup
//!
//! Installs the global tracing subscriber from the logging settings.

use anyhow::Result;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::cli::config::LoggingConfig;
use crate::error::ConfigError;

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

/// Filter directive to use; `verbose` forces debug
fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        return "debug".to_string();
    }
    config
        .level
        .clone()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Initialize the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let format = match config.format.as_deref() {
        Some(format) if !format.trim().is_empty() => format.parse()?,
        _ => LogFormat::Pretty,
    };
    let filter = EnvFilter::try_new(filter_directive(config, verbose))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Pretty => builder
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .try_init(),
        LogFormat::Compact => builder.compact().with_target(false).try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(())
}
