//! Structured logging setup.
//!
//! Stdout logging in one of three formats, plus an optional daily-rolling
//! JSON file written through a non-blocking appender.
//!
//! # Component Targets
//!
//! | Target | Description |
//! |--------|-------------|
//! | `spike_predictor::predictor` | Spike-event updates, singular covariance |
//! | `spike_predictor::simulation` | Run lifecycle and summaries |
//! | `spike_predictor::signal` | Spike raster generation |
//!
//! ```bash
//! # Trace every spike-event update
//! RUST_LOG=spike_predictor::predictor=trace cargo run --bin spike_predictor -- run
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON format
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!(
                "Unknown log format '{}'. Use: pretty, json, compact",
                s
            )),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Format for stdout logging
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for the rolling JSON log file (disabled when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Filter for the file stream
    #[serde(default = "default_file_level")]
    pub file_level: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "debug".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            log_dir: None,
            file_level: default_file_level(),
        }
    }
}

impl LogConfig {
    /// Pretty stdout, no files.
    pub fn development() -> Self {
        Self::default()
    }

    /// JSON stdout plus a rolling file under `log_dir`.
    pub fn with_log_dir(log_dir: PathBuf) -> Self {
        Self {
            log_dir: Some(log_dir),
            format: LogFormat::Json,
            ..Default::default()
        }
    }
}

/// Initialize the global subscriber.
///
/// Returns the `WorkerGuard`s of any file writers; keep them alive until
/// exit so buffered lines are flushed.
pub fn init_logging(
    config: &LogConfig,
    env_filter_override: Option<&str>,
) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();

    let base_filter = match env_filter_override {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))?,
    };

    let stdout_layer = match config.format {
        LogFormat::Json => fmt::layer().json().with_filter(base_filter).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_filter(base_filter).boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_filter(base_filter)
            .boxed(),
    };

    let file_layer = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let appender =
                RollingFileAppender::new(Rotation::DAILY, log_dir, "spike-predictor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);

            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::try_new(&config.file_level)?);
            eprintln!("File logging enabled: {}", log_dir.display());
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guards)
}

/// Log target constants for component-specific logging.
///
/// ```ignore
/// tracing::trace!(target: targets::PREDICTOR, step, "Spike event");
/// ```
pub mod targets {
    /// Recurrence updates and weight solves
    pub const PREDICTOR: &str = "spike_predictor::predictor";
    /// Driver loop lifecycle
    pub const SIMULATION: &str = "spike_predictor::simulation";
    /// Spike raster generation
    pub const SIGNAL: &str = "spike_predictor::signal";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_log_config_with_dir() {
        let config = LogConfig::with_log_dir(PathBuf::from("/var/log/spikes"));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/spikes")));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_format_serde() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");

        let parsed: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(parsed, LogFormat::Compact);
    }
}
