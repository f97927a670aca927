//! Errors raised while loading or validating configuration.

use std::path::PathBuf;

use eventflow_core::EventFlowError;
use thiserror::Error;

/// A configuration problem, reported before any broker is built.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file extension is not enabled by a format feature.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// Figment failed to read or extract the configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Values that parse but do not make sense together.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// An error kind or policy name that EventFlow does not know.
    #[error("Invalid error policy: {0}")]
    InvalidPolicy(#[from] EventFlowError),
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
