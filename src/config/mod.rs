//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, apply SERVICE_NAME/ENVIRONMENT/LOG_LEVEL)
//!     → validation.rs (semantic checks)
//!     → TelemetryConfig (validated, immutable)
//!     → used once to construct the Telemetry context
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server applies the new minimum log level
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the log level is applied live
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    HealthConfig, HistogramExport, ListenerConfig, LogFormat, LoggingConfig, MetricsConfig,
    ServiceConfig, TelemetryConfig, TimeoutConfig, TracingConfig,
};
