//! Metrics aggregation and exposition.
//!
//! # Data Flow
//! ```text
//! increment / set / observe / record      metrics::counter!() etc.
//!     → key.rs (name + sorted labels)  ←── recorder.rs (facade bridge)
//!     → aggregator.rs (series store, one lock per update)
//!     → exposition.rs (Prometheus text on GET /metrics)
//! ```
//!
//! # Metrics recorded by the request instrumentation
//! - `http_requests_total` (counter): by method, path
//! - `http_responses_total` (counter): by method, status
//! - `http_request_duration_seconds` (histogram): by method, status
//! - `http_errors_total` (counter): by method, error type
//!
//! # Design Decisions
//! - The canonical key string doubles as the storage identity
//! - Histograms keep raw samples (bounded by a reservoir), quantiles on export
//! - Missing labels mean the unlabeled series; nothing here returns an error

pub mod aggregator;
pub mod exposition;
pub mod key;
pub mod recorder;

pub use aggregator::{MetricAggregator, MetricsSnapshot, SummarySnapshot};
pub use exposition::{quantile, QUANTILE_THRESHOLDS};
pub use key::MetricKey;
pub use recorder::{AggregatorRecorder, RecorderInstallError};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_RESPONSES_TOTAL: &str = "http_responses_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_ERRORS_TOTAL: &str = "http_errors_total";
