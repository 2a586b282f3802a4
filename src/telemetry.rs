//! The telemetry context: one of each component, shared by cheap clones.

use std::sync::Arc;

use crate::config::TelemetryConfig;
use crate::health::HealthRegistry;
use crate::logging::{LogSink, StdoutSink, StructuredLogger};
use crate::metrics::{AggregatorRecorder, MetricAggregator, RecorderInstallError};
use crate::trace::DistributedTracer;

/// Metrics, logger, tracer and health registry for one process.
///
/// Constructed once at startup and passed to whatever builds the request
/// pipeline. Clones share the same underlying state.
#[derive(Clone, Debug)]
pub struct Telemetry {
    pub metrics: Arc<MetricAggregator>,
    pub logger: StructuredLogger,
    pub tracer: Arc<DistributedTracer>,
    pub health: HealthRegistry,
}

impl Telemetry {
    /// Build from config, logging to stdout.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    pub fn with_sink(config: &TelemetryConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            metrics: Arc::new(MetricAggregator::new(&config.metrics)),
            logger: StructuredLogger::from_config(config, sink),
            tracer: Arc::new(DistributedTracer::new(&config.tracing)),
            health: HealthRegistry::new(&config.health),
        }
    }

    /// Route `metrics` facade calls into this context's aggregator.
    pub fn install_metrics_recorder(&self) -> Result<(), RecorderInstallError> {
        AggregatorRecorder::new(self.metrics.clone()).install()
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::from_config(&TelemetryConfig::default())
    }
}
