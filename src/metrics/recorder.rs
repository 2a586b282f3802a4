//! Bridge from the `metrics` facade into a [`MetricAggregator`].
//!
//! Once installed, `metrics::counter!`, `gauge!` and `histogram!` calls made
//! anywhere in the process land in the same series the aggregator exports.

use std::sync::Arc;

use ::metrics::{
    Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};
use thiserror::Error;

use crate::metrics::aggregator::MetricAggregator;
use crate::metrics::key::MetricKey;

#[derive(Debug, Error)]
#[error("a global metrics recorder is already installed")]
pub struct RecorderInstallError;

/// `metrics::Recorder` backed by a shared aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorRecorder {
    aggregator: Arc<MetricAggregator>,
}

impl AggregatorRecorder {
    pub fn new(aggregator: Arc<MetricAggregator>) -> Self {
        Self { aggregator }
    }

    /// Install as the process-wide recorder. Only the first call succeeds.
    pub fn install(self) -> Result<(), RecorderInstallError> {
        ::metrics::set_global_recorder(self).map_err(|_| RecorderInstallError)
    }

    fn handle(&self, key: &Key) -> Arc<SeriesHandle> {
        let key = MetricKey::from_pairs(
            key.name(),
            key.labels().map(|label| (label.key(), label.value())),
        );
        Arc::new(SeriesHandle {
            aggregator: self.aggregator.clone(),
            key,
        })
    }
}

impl Recorder for AggregatorRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.handle(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.handle(key))
    }
}

struct SeriesHandle {
    aggregator: Arc<MetricAggregator>,
    key: MetricKey,
}

impl CounterFn for SeriesHandle {
    fn increment(&self, value: u64) {
        self.aggregator.increment_key(&self.key, value as f64);
    }

    fn absolute(&self, value: u64) {
        self.aggregator.absolute_key(&self.key, value as f64);
    }
}

impl GaugeFn for SeriesHandle {
    fn increment(&self, value: f64) {
        self.aggregator.adjust_key(&self.key, value);
    }

    fn decrement(&self, value: f64) {
        self.aggregator.adjust_key(&self.key, -value);
    }

    fn set(&self, value: f64) {
        self.aggregator.set_key(&self.key, value);
    }
}

impl HistogramFn for SeriesHandle {
    fn record(&self, value: f64) {
        self.aggregator.observe_key(&self.key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_calls_reach_aggregator() {
        let aggregator = Arc::new(MetricAggregator::default());
        let recorder = AggregatorRecorder::new(aggregator.clone());

        ::metrics::with_local_recorder(&recorder, || {
            ::metrics::counter!("cache_hits_total", "cache" => "users").increment(3);
            ::metrics::gauge!("pool_size").set(8.0);
            ::metrics::gauge!("pool_size").decrement(2.0);
            ::metrics::histogram!("query_seconds").record(0.5);
        });

        assert_eq!(aggregator.counter_value("cache_hits_total", &[("cache", "users")]), Some(3.0));
        assert_eq!(aggregator.gauge_value("pool_size", &[]), Some(6.0));
        assert_eq!(aggregator.get_metrics().histograms["query_seconds"], vec![0.5]);
    }
}
