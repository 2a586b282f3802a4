//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::TelemetryConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::logging::LogLevel;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides (`SERVICE_NAME`, `ENVIRONMENT`, `LOG_LEVEL`) are
/// applied after parsing and before validation.
pub fn load_config(path: &Path) -> Result<TelemetryConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`], with an explicit variable source for overrides.
pub fn load_config_with<F>(path: &Path, lookup: F) -> Result<TelemetryConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let content = fs::read_to_string(path)?;
    let mut config: TelemetryConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration from defaults plus environment overrides only.
pub fn from_env() -> Result<TelemetryConfig, ConfigError> {
    let mut config = TelemetryConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply process-level overrides using `lookup` as the variable source.
///
/// An unrecognized `LOG_LEVEL` is ignored with a warning rather than failing startup.
pub fn apply_env_overrides<F>(config: &mut TelemetryConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup("SERVICE_NAME") {
        config.service.name = name;
    }
    if let Some(env) = lookup("ENVIRONMENT") {
        config.service.environment = env;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        match level.parse::<LogLevel>() {
            Ok(level) => config.logging.level = level,
            Err(_) => tracing::warn!(value = %level, "Ignoring unrecognized LOG_LEVEL"),
        }
    }
}
