//! Configuration schema definitions.
//!
//! ```toml
//! [broker]
//! logger = true
//! max_listeners = 20
//!
//! [broker.error_policy]
//! on_listener_error = "continue"
//! on_emit_error = "stop"
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! eventflow_core = "trace"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use eventflow_core::{BrokerOptions, DEFAULT_MAX_LISTENERS, ErrorKind, ErrorPolicy, PolicyMode};
use serde::{Deserialize, Serialize};

use super::error::ConfigResult;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFlowConfig {
    /// Settings used to build brokers.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Logging subscriber settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Broker
// =============================================================================

/// Broker construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Inject the logger middleware.
    #[serde(default)]
    pub logger: bool,

    /// Listener count that triggers a leak warning (`0` disables it).
    #[serde(default = "default_max_listeners")]
    pub max_listeners: usize,

    /// Per-kind error policy.
    #[serde(default)]
    pub error_policy: ErrorPolicyConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            logger: false,
            max_listeners: default_max_listeners(),
            error_policy: ErrorPolicyConfig::default(),
        }
    }
}

fn default_max_listeners() -> usize {
    DEFAULT_MAX_LISTENERS
}

impl BrokerConfig {
    /// Converts into factory options.
    ///
    /// Middleware and custom handlers cannot come from a file; add them to
    /// the returned options.
    pub fn to_options(&self) -> BrokerOptions {
        BrokerOptions::new()
            .logger(self.logger)
            .max_listeners(self.max_listeners)
            .error_policy(self.error_policy.to_policy())
    }

    /// Sets one policy slot from its textual form, e.g. `("emit", "stop")`.
    pub fn set_policy(&mut self, kind: &str, mode: &str) -> ConfigResult<()> {
        let kind: ErrorKind = kind.parse()?;
        let mode: PolicyMode = mode.parse()?;
        match kind {
            ErrorKind::Listener => self.error_policy.on_listener_error = mode,
            ErrorKind::Emit => self.error_policy.on_emit_error = mode,
            ErrorKind::Middleware => self.error_policy.on_middleware_error = mode,
        }
        Ok(())
    }
}

/// The serialisable form of an [`ErrorPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPolicyConfig {
    /// Applied when a listener returns an error.
    pub on_listener_error: PolicyMode,
    /// Applied once per `emit` to an error that escaped the dispatch.
    pub on_emit_error: PolicyMode,
    /// Applied when a middleware layer returns its own error.
    pub on_middleware_error: PolicyMode,
}

impl ErrorPolicyConfig {
    /// Builds the runtime policy.
    pub fn to_policy(&self) -> ErrorPolicy {
        ErrorPolicy::new()
            .on_listener_error(self.on_listener_error)
            .on_emit_error(self.on_emit_error)
            .on_middleware_error(self.on_middleware_error)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Span lifecycle events to log.
    pub span_events: SpanEventConfig,

    /// Include thread IDs.
    pub thread_ids: bool,

    /// Include source file and line.
    pub file_location: bool,

    /// Log file path, required when `output = "file"`.
    pub file_path: Option<PathBuf>,

    /// Rotation schedule for file output.
    pub rotation: LogRotation,

    /// Per-target level overrides, e.g. `eventflow_core = "trace"`.
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            filters: BTreeMap::new(),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rotation schedule for file output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}
