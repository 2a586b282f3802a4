//! In-process metric storage.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::{HistogramExport, MetricsConfig};
use crate::metrics::exposition;
use crate::metrics::key::MetricKey;

/// Raw observations for a histogram or summary series.
///
/// `sum` and `count` cover every observation; `values` keeps at most
/// `capacity` of them, chosen by reservoir sampling once full.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SampleSeries {
    pub(crate) sum: f64,
    pub(crate) count: u64,
    pub(crate) values: Vec<f64>,
    capacity: usize,
}

impl SampleSeries {
    fn new(capacity: usize) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            values: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;

        if self.values.len() < self.capacity {
            self.values.push(value);
            return;
        }

        // Algorithm R: keep the new value with probability capacity / count.
        let slot = fastrand::u64(..self.count) as usize;
        if slot < self.capacity {
            self.values[slot] = value;
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MetricStore {
    pub(crate) counters: BTreeMap<MetricKey, f64>,
    pub(crate) gauges: BTreeMap<MetricKey, f64>,
    pub(crate) histograms: BTreeMap<MetricKey, SampleSeries>,
    pub(crate) summaries: BTreeMap<MetricKey, SampleSeries>,
}

/// Summary state as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySnapshot {
    pub sum: f64,
    pub count: u64,
    pub values: Vec<f64>,
}

/// Independent copy of every series, keyed by canonical metric key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, f64>,
    pub gauges: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, Vec<f64>>,
    pub summaries: BTreeMap<String, SummarySnapshot>,
}

/// Label-keyed store of counters, gauges, histograms and summaries.
///
/// Series are created lazily on first write. Every operation takes the
/// store lock once, so read-modify-write updates are atomic per call.
/// Nothing here fails: negative counter increments are accepted as given.
#[derive(Debug)]
pub struct MetricAggregator {
    store: Mutex<MetricStore>,
    reservoir_capacity: usize,
    export_mode: HistogramExport,
}

impl Default for MetricAggregator {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl MetricAggregator {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            store: Mutex::new(MetricStore::default()),
            reservoir_capacity: config.histogram_reservoir,
            export_mode: config.histogram_export,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `amount` to a counter, creating it at zero if absent.
    pub fn increment(&self, name: &str, labels: &[(&str, &str)], amount: f64) {
        self.increment_key(&MetricKey::new(name, labels), amount);
    }

    /// Overwrite a gauge.
    pub fn set(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.set_key(&MetricKey::new(name, labels), value);
    }

    /// Append an observation to a histogram.
    pub fn observe(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.observe_key(&MetricKey::new(name, labels), value);
    }

    /// Fold an observation into a summary.
    pub fn record(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let capacity = self.reservoir_capacity;
        self.lock()
            .summaries
            .entry(MetricKey::new(name, labels))
            .or_insert_with(|| SampleSeries::new(capacity))
            .push(value);
    }

    pub fn increment_key(&self, key: &MetricKey, amount: f64) {
        *self.lock().counters.entry(key.clone()).or_insert(0.0) += amount;
    }

    /// Raise a counter to `value` if it is currently lower.
    pub fn absolute_key(&self, key: &MetricKey, value: f64) {
        let mut store = self.lock();
        let current = store.counters.entry(key.clone()).or_insert(0.0);
        if value > *current {
            *current = value;
        }
    }

    pub fn set_key(&self, key: &MetricKey, value: f64) {
        self.lock().gauges.insert(key.clone(), value);
    }

    /// Add `delta` to a gauge, creating it at zero if absent.
    pub fn adjust_key(&self, key: &MetricKey, delta: f64) {
        *self.lock().gauges.entry(key.clone()).or_insert(0.0) += delta;
    }

    pub fn observe_key(&self, key: &MetricKey, value: f64) {
        let capacity = self.reservoir_capacity;
        self.lock()
            .histograms
            .entry(key.clone())
            .or_insert_with(|| SampleSeries::new(capacity))
            .push(value);
    }

    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.lock().counters.get(&MetricKey::new(name, labels)).copied()
    }

    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.lock().gauges.get(&MetricKey::new(name, labels)).copied()
    }

    /// Sum of every counter and gauge series named `name`, if any exist.
    pub fn family_total(&self, name: &str) -> Option<f64> {
        let store = self.lock();
        let mut values = store
            .counters
            .iter()
            .chain(store.gauges.iter())
            .filter(|(key, _)| key.name() == name)
            .map(|(_, value)| *value)
            .peekable();

        values.peek()?;
        Some(values.sum())
    }

    /// Render every series in Prometheus text exposition format.
    pub fn export_prometheus(&self) -> String {
        let store = self.lock();
        exposition::render(&store, self.export_mode)
    }

    /// Drop all series.
    pub fn clear(&self) {
        *self.lock() = MetricStore::default();
    }

    /// Deep copy of the current state; later writes do not affect it.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let store = self.lock();

        MetricsSnapshot {
            counters: store
                .counters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            gauges: store
                .gauges
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            histograms: store
                .histograms
                .iter()
                .map(|(k, s)| (k.to_string(), s.values.clone()))
                .collect(),
            summaries: store
                .summaries
                .iter()
                .map(|(k, s)| {
                    (
                        k.to_string(),
                        SummarySnapshot {
                            sum: s.sum,
                            count: s.count,
                            values: s.values.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}
