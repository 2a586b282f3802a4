//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root configuration for the telemetry core and its host service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service identity stamped onto every log entry.
    pub service: ServiceConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Structured logger settings.
    pub logging: LoggingConfig,

    /// Metric aggregation and export settings.
    pub metrics: MetricsConfig,

    /// Span retention settings.
    pub tracing: TracingConfig,

    /// Health probe and alert settings.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name (e.g., "api").
    pub name: String,

    /// Deployment environment (e.g., "production").
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "api".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Output format for the process-level tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level emitted by the structured logger.
    pub level: LogLevel,

    /// Format of the crate's own diagnostic output.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
        }
    }
}

/// How histogram `_bucket` lines are counted on export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramExport {
    /// Every bucket reports the total sample count; `le` is the quantile value.
    #[default]
    Legacy,
    /// Every bucket reports the number of samples <= `le`.
    Cumulative,
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Maximum raw values retained per histogram/summary series.
    pub histogram_reservoir: usize,

    /// Bucket counting mode used by the Prometheus export.
    pub histogram_export: HistogramExport,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            histogram_reservoir: 10_000,
            histogram_export: HistogramExport::Legacy,
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Completed spans retained before oldest-first eviction.
    pub max_completed_spans: usize,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            max_completed_spans: 1000,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Hard timeout for a single probe in seconds.
    pub check_timeout_secs: u64,

    /// Interval between alert evaluation ticks in seconds.
    pub alert_interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout_secs: 10,
            alert_interval_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}
