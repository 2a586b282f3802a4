//! Periodic alert evaluation.
//!
//! # Responsibilities
//! - Tick on a fixed interval
//! - Evaluate eligible alert rules
//! - Report fired rules through the structured logger

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::health::alerts::AlertEvaluator;
use crate::health::registry::HealthRegistry;
use crate::logging::StructuredLogger;
use crate::value::{FieldMap, FieldValue};

pub struct AlertMonitor {
    registry: HealthRegistry,
    evaluator: Arc<dyn AlertEvaluator>,
    logger: StructuredLogger,
    interval: Duration,
}

impl AlertMonitor {
    pub fn new(
        registry: HealthRegistry,
        evaluator: Arc<dyn AlertEvaluator>,
        logger: StructuredLogger,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            evaluator,
            logger,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Alert monitor starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; skip it so rules get one full interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Alert monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one evaluation pass; returns how many rules fired.
    pub fn tick(&self) -> usize {
        let fired = self.registry.evaluate_alerts(self.evaluator.as_ref());

        for rule in &fired {
            let mut meta = FieldMap::new();
            meta.insert("alertId".into(), rule.id.clone().into());
            meta.insert("condition".into(), rule.condition.clone().into());
            meta.insert("threshold".into(), rule.threshold.into());
            meta.insert("severity".into(), wire_name(&rule.severity).into());
            meta.insert(
                "channels".into(),
                FieldValue::String(
                    rule.channels
                        .iter()
                        .map(wire_name)
                        .collect::<Vec<_>>()
                        .join(","),
                ),
            );
            self.logger.warn(&format!("Alert triggered: {}", rule.name), Some(meta));
        }

        fired.len()
    }
}

/// The serialized name of a unit enum variant.
fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::alerts::{AlertChannel, AlertRule, AlertSeverity, MetricThresholdEvaluator};
    use crate::logging::{LogLevel, MemorySink};
    use crate::metrics::MetricAggregator;

    #[tokio::test]
    async fn test_tick_logs_fired_rules() {
        let metrics = Arc::new(MetricAggregator::default());
        let registry = HealthRegistry::default();
        registry.add_alert(
            AlertRule::new(
                "slow",
                "Too many 5xx",
                "http_errors_total",
                0.0,
                AlertSeverity::Critical,
            )
            .with_channels([AlertChannel::Slack, AlertChannel::Email]),
        );

        let sink = MemorySink::new();
        let logger = StructuredLogger::with_sink("api", "test", LogLevel::Info, Arc::new(sink.clone()));
        let monitor = AlertMonitor::new(
            registry.clone(),
            Arc::new(MetricThresholdEvaluator::new(metrics.clone())),
            logger,
            Duration::from_secs(60),
        );

        assert_eq!(monitor.tick(), 0);
        metrics.increment("http_errors_total", &[("method", "GET"), ("error", "panic")], 1.0);
        assert_eq!(monitor.tick(), 1);
        assert_eq!(monitor.tick(), 0);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["level"], "WARN");
        assert_eq!(entries[0]["metadata"]["severity"], "critical");
        assert_eq!(entries[0]["metadata"]["channels"], "email,slack");
        assert!(registry.alert("slow").unwrap().last_triggered.is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let registry = HealthRegistry::default();
        let logger = StructuredLogger::with_sink("api", "test", LogLevel::Info, Arc::new(MemorySink::new()));
        let evaluator = Arc::new(MetricThresholdEvaluator::new(Arc::new(MetricAggregator::default())));
        let monitor = AlertMonitor::new(registry, evaluator, logger, Duration::from_millis(10));

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(monitor.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
