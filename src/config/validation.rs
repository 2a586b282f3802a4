//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, buffers > 0, address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TelemetryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::TelemetryConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("listener.bind_address '{0}' is not a socket address")]
    BadAddress(String),
    #[error(
        "health.check_timeout_secs ({check}) must be less than timeouts.request_secs ({request})"
    )]
    CheckOutlastsRequest { check: u64, request: u64 },
}

pub fn validate_config(config: &TelemetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "service.name" });
    }
    if config.service.environment.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "service.environment" });
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress(config.listener.bind_address.clone()));
    }

    let positive = [
        ("metrics.histogram_reservoir", config.metrics.histogram_reservoir as u64),
        ("tracing.max_completed_spans", config.tracing.max_completed_spans as u64),
        ("health.check_timeout_secs", config.health.check_timeout_secs),
        ("health.alert_interval_secs", config.health.alert_interval_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    // A probe allowed to run past the request timeout turns /health/{check} into a 408.
    let (check, request) = (config.health.check_timeout_secs, config.timeouts.request_secs);
    if check > 0 && request > 0 && check >= request {
        errors.push(ValidationError::CheckOutlastsRequest { check, request });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TelemetryConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = TelemetryConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.health.check_timeout_secs = 0;
        config.metrics.histogram_reservoir = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::BadAddress("nowhere".into())));
        assert!(errors.contains(&ValidationError::Zero { field: "health.check_timeout_secs" }));
    }

    #[test]
    fn test_check_timeout_must_fit_in_request_timeout() {
        let mut config = TelemetryConfig::default();
        config.health.check_timeout_secs = 30;
        config.timeouts.request_secs = 30;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CheckOutlastsRequest { check: 30, request: 30 }]
        );

        config.health.check_timeout_secs = 29;
        assert!(validate_config(&config).is_ok());
    }
}
