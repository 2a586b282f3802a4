//! Telemetry core for HTTP services.
//!
//! Metrics aggregation with Prometheus export, structured JSON logging,
//! in-process distributed tracing, health checks with alert rules, and the
//! axum middleware that ties them to every request.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod telemetry;
pub mod trace;
pub mod value;

pub use config::TelemetryConfig;
pub use http::{HandlerError, HttpServer, RequestContext};
pub use lifecycle::Shutdown;
pub use telemetry::Telemetry;
pub use value::{FieldMap, FieldValue};
