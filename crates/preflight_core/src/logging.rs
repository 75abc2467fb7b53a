//! Tracing subscriber setup.
//!
//! Library crates only emit `tracing` events; a host installs the subscriber
//! once at startup with [`Logging`]. Worker processes launched by the
//! sandbox install their own, so their diagnostics reach the inherited
//! stderr.
//!
//! # Example
//!
//! ```
//! use preflight_core::{LogFormat, Logging};
//! use tracing::Level;
//!
//! Logging::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(LogFormat::Compact)
//!     .with_env_filter("preflight_executor=debug,preflight_scheduler=info")
//!     .install();
//! ```

use core::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// LogFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the global `tracing` subscriber.
///
/// Installing twice is harmless: the second call leaves the first
/// subscriber in place.
#[derive(Debug, Clone)]
pub struct Logging {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: LogFormat,
    /// Environment filter (e.g., `"preflight_executor=debug"`).
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl Logging {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom filter directive string.
    ///
    /// Format: `target=level,target=level,...`. An invalid directive falls
    /// back to the plain level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configured level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the configured format.
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }

    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    /// Installs the global subscriber, writing to stderr.
    ///
    /// Stdout stays free for the worker result line.
    pub fn install(&self) {
        let env_filter = self.filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // try_init().ok() ignores an already installed subscriber
        match self.format {
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr)
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            LogFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr)
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr)
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
        }

        tracing::debug!(
            level = %self.level,
            format = ?self.format,
            "logging initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_default_is_pretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert_eq!(
            "xml".parse::<LogFormat>(),
            Err("unknown log format 'xml'".to_string())
        );
    }

    #[test]
    fn default_level_is_info() {
        assert_eq!(Logging::default().level(), Level::INFO);
    }

    #[test]
    fn builder_sets_fields() {
        let logging = Logging::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_env_filter("preflight_executor=debug")
            .with_span_events(true);
        assert_eq!(logging.level, Level::DEBUG);
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.env_filter.as_deref(), Some("preflight_executor=debug"));
        assert!(logging.span_events);
    }

    #[test]
    fn invalid_filter_falls_back_to_level() {
        let filter = Logging::new()
            .with_level(Level::WARN)
            .with_env_filter("preflight=loudest")
            .filter();
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::WARN)
        );
    }

    #[test]
    fn install_twice_is_harmless() {
        Logging::new().with_format(LogFormat::Compact).install();
        Logging::new().with_format(LogFormat::Json).install();
        tracing::info!("still logging");
    }
}
