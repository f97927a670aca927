//! Logging setup for EventFlow applications.
//!
//! EventFlow itself only emits `tracing` events and spans. This module turns
//! them into output:
//!
//! | Source | Level | What |
//! |--------|-------|------|
//! | `eventflow_core::framework::broker` | `warn` | `MaxListenersExceeded` leak warnings |
//! | `eventflow_core::foundation::policy` | `error` | errors handled by a `continue` slot |
//! | `eventflow_core::framework::logger` | `info` | the logger middleware's event block |
//! | `emit` span | `debug` | one per emission |
//!
//! # From configuration
//!
//! ```rust,ignore
//! use eventflow_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # By hand
//!
//! ```rust,ignore
//! use eventflow_runtime::config::LogLevel;
//! use eventflow_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .level(LogLevel::Debug)
//!     .directive("eventflow_core=trace")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```

use std::ffi::OsStr;
use std::ops::BitOr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

// =============================================================================
// SpanEvents
// =============================================================================

/// A set of span lifecycle events to log.
///
/// Combine with `|`: `SpanEvents::NEW | SpanEvents::CLOSE` is
/// [`SpanEvents::LIFECYCLE`], which shows every `emit` span as an open/close
/// pair with its duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpanEvents(u8);

impl SpanEvents {
    pub const NONE: Self = Self(0);
    pub const NEW: Self = Self(1);
    pub const ENTER: Self = Self(1 << 1);
    pub const EXIT: Self = Self(1 << 2);
    pub const CLOSE: Self = Self(1 << 3);
    pub const LIFECYCLE: Self = Self(Self::NEW.0 | Self::CLOSE.0);
    pub const FULL: Self = Self(Self::LIFECYCLE.0 | Self::ENTER.0 | Self::EXIT.0);

    /// Returns `true` if every event in `other` is in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn to_fmt_span(self) -> FmtSpan {
        [
            (Self::NEW, FmtSpan::NEW),
            (Self::ENTER, FmtSpan::ENTER),
            (Self::EXIT, FmtSpan::EXIT),
            (Self::CLOSE, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
    }
}

impl BitOr for SpanEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        [
            (config.new, Self::NEW),
            (config.enter, Self::ENTER),
            (config.exit, Self::EXIT),
            (config.close, Self::CLOSE),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(Self::NONE, |acc, (_, flag)| acc | flag)
    }
}

impl From<SpanEvents> for SpanEventConfig {
    fn from(events: SpanEvents) -> Self {
        Self {
            new: events.contains(SpanEvents::NEW),
            enter: events.contains(SpanEvents::ENTER),
            exit: events.contains(SpanEvents::EXIT),
            close: events.contains(SpanEvents::CLOSE),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// A builder for the global `tracing` subscriber.
///
/// Starts from a [`LoggingConfig`] (or its defaults: compact `info` output on
/// stdout) and lets code adjust it before installing. `RUST_LOG`, when set,
/// replaces the configured level; extra directives apply on top of either.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    directives: Vec<String>,
    with_target: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::from_config(&LoggingConfig::default())
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            config: config.clone(),
            directives: Vec::new(),
            with_target: true,
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Adds a raw filter directive such as `eventflow_core::framework=trace`.
    ///
    /// Directives that fail to parse are ignored.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.config.span_events = events.into();
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    /// Writes to `path`, switching the output to [`LogOutput::File`].
    pub fn file(mut self, path: impl Into<PathBuf>, rotation: LogRotation) -> Self {
        self.config.output = LogOutput::File;
        self.config.file_path = Some(path.into());
        self.config.rotation = rotation;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.config.thread_ids = enabled;
        self
    }

    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.config.file_location = enabled;
        self
    }

    /// Returns the configuration the subscriber will be built from.
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    fn env_filter(&self) -> EnvFilter {
        let from_config = self
            .config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={level}"));

        let base = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()));

        from_config
            .chain(self.directives.iter().cloned())
            .filter_map(|directive| directive.parse::<Directive>().ok())
            .fold(base, EnvFilter::add_directive)
    }

    fn fmt_layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_span_events(SpanEvents::from(&self.config.span_events).to_fmt_span())
            .with_target(self.with_target)
            .with_thread_ids(self.config.thread_ids)
            .with_file(self.config.file_location)
            .with_line_number(self.config.file_location);

        match self.config.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            // Rejected by validation; stay usable if validation was skipped.
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.compact().boxed(),
        }
    }

    /// Installs the subscriber, ignoring an already installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber as the global default.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let mut missing_path = false;
        let layer = match (self.config.output, self.config.file_path.as_deref()) {
            (LogOutput::Stdout, _) => self.fmt_layer(std::io::stdout, true),
            (LogOutput::Stderr, _) => self.fmt_layer(std::io::stderr, true),
            (LogOutput::File, Some(path)) => {
                self.fmt_layer(file_appender(path, self.config.rotation), false)
            }
            (LogOutput::File, None) => {
                missing_path = true;
                self.fmt_layer(std::io::stdout, true)
            }
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(self.env_filter())
            .try_init()?;

        if missing_path {
            warn!("File output requested without logging.file_path; logging to stdout");
        }
        Ok(())
    }
}

fn file_appender(path: &Path, rotation: LogRotation) -> RollingFileAppender {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new("eventflow.log"));

    match rotation {
        LogRotation::Never => rolling::never(directory, file_name),
        LogRotation::Hourly => rolling::hourly(directory, file_name),
        LogRotation::Daily => rolling::daily(directory, file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_events_round_trip_config() {
        let config = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        let events = SpanEvents::from(&config);
        assert_eq!(events, SpanEvents::LIFECYCLE);
        assert_eq!(SpanEventConfig::from(events), config);
    }

    #[test]
    fn test_span_event_flags() {
        assert_eq!(SpanEvents::NONE.to_fmt_span(), FmtSpan::NONE);
        assert_eq!(
            SpanEvents::LIFECYCLE.to_fmt_span(),
            FmtSpan::NEW | FmtSpan::CLOSE
        );
        assert_eq!(SpanEvents::FULL.to_fmt_span(), FmtSpan::FULL);
        assert!(SpanEvents::FULL.contains(SpanEvents::ENTER));
        assert!(!SpanEvents::LIFECYCLE.contains(SpanEvents::EXIT));
    }

    #[test]
    fn test_builder_overrides_config() {
        let mut config = LoggingConfig::default();
        config.filters.insert("eventflow_core".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config)
            .level(LogLevel::Debug)
            .with_thread_ids(true)
            .file("logs/events.log", LogRotation::Daily);

        let config = builder.config();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.thread_ids);
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.rotation, LogRotation::Daily);
        assert_eq!(config.filters.len(), 1);
    }

    #[test]
    fn test_file_appender_writes_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventflow.log");

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender(&path, LogRotation::Never)),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("written to file");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("written to file"));
    }
}
