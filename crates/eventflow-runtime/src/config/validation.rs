//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{EventFlowConfig, LogFormat, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &EventFlowConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the `json-log` feature",
        ));
    }

    for target in logging.filters.keys() {
        validate_filter_target(target)?;
    }

    Ok(())
}

/// Validates the target part of a `target=level` directive.
fn validate_filter_target(target: &str) -> ConfigResult<()> {
    if target.is_empty() {
        return Err(ConfigError::validation("Log filter target cannot be empty"));
    }

    if target
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '=' | ',' | '[' | ']'))
    {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {target:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&EventFlowConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = EventFlowConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.logging.file_path = Some("logs/eventflow.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_filter_targets() {
        let mut config = EventFlowConfig::default();
        config
            .logging
            .filters
            .insert("eventflow_core::framework".into(), LogLevel::Trace);
        assert!(validate_config(&config).is_ok());

        config
            .logging
            .filters
            .insert("bad target".into(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
