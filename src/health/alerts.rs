//! Alert rules with cooldown-gated triggering.
//!
//! Rule conditions are opaque strings; deciding whether a condition holds
//! is delegated to an [`AlertEvaluator`]. This module only owns the rule set,
//! the enabled/cooldown eligibility gate and the `last_triggered` stamp.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::MetricAggregator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Delivery channel an external notifier should use for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    Email,
    Sms,
    Webhook,
    Slack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub condition: String,
    pub threshold: f64,
    pub severity: AlertSeverity,
    pub enabled: bool,
    pub channels: BTreeSet<AlertChannel>,
    pub cooldown_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
}

impl AlertRule {
    /// Enabled rule with a 15 minute cooldown and no channels.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: impl Into<String>,
        threshold: f64,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            condition: condition.into(),
            threshold,
            severity,
            enabled: true,
            channels: BTreeSet::new(),
            cooldown_minutes: 15,
            last_triggered: None,
        }
    }

    pub fn with_channels(mut self, channels: impl IntoIterator<Item = AlertChannel>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    pub fn with_cooldown_minutes(mut self, minutes: u32) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether `now` falls inside the cooldown window of the last trigger.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            Some(last) => now - last < Duration::minutes(i64::from(self.cooldown_minutes)),
            None => false,
        }
    }

    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.enabled && !self.in_cooldown(now)
    }
}

/// Decides whether a rule's condition currently holds.
pub trait AlertEvaluator: Send + Sync {
    fn evaluate(&self, rule: &AlertRule) -> bool;
}

/// Treats a rule's condition as a metric name and fires when the summed
/// counter and gauge value across that metric's series exceeds the threshold.
#[derive(Debug, Clone)]
pub struct MetricThresholdEvaluator {
    metrics: Arc<MetricAggregator>,
}

impl MetricThresholdEvaluator {
    pub fn new(metrics: Arc<MetricAggregator>) -> Self {
        Self { metrics }
    }
}

impl AlertEvaluator for MetricThresholdEvaluator {
    fn evaluate(&self, rule: &AlertRule) -> bool {
        self.metrics
            .family_total(rule.condition.trim())
            .is_some_and(|value| value > rule.threshold)
    }
}

/// Rule set keyed by id.
#[derive(Debug, Default)]
pub(crate) struct AlertRules {
    rules: Mutex<BTreeMap<String, AlertRule>>,
}

impl AlertRules {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, AlertRule>> {
        self.rules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn upsert(&self, rule: AlertRule) {
        self.lock().insert(rule.id.clone(), rule);
    }

    pub(crate) fn remove(&self, id: &str) -> Option<AlertRule> {
        self.lock().remove(id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<AlertRule> {
        self.lock().get(id).cloned()
    }

    pub(crate) fn eligible(&self, now: DateTime<Utc>) -> Vec<AlertRule> {
        self.lock()
            .values()
            .filter(|rule| rule.is_eligible(now))
            .cloned()
            .collect()
    }

    pub(crate) fn trigger(&self, id: &str, now: DateTime<Utc>) -> Option<AlertRule> {
        let mut rules = self.lock();
        let rule = rules.get_mut(id)?;
        rule.last_triggered = Some(now);
        Some(rule.clone())
    }

    /// Trigger only if the rule is still eligible, so two concurrent
    /// evaluations cannot both fire the same rule.
    pub(crate) fn trigger_if_eligible(&self, id: &str, now: DateTime<Utc>) -> Option<AlertRule> {
        let mut rules = self.lock();
        let rule = rules.get_mut(id)?;
        if !rule.is_eligible(now) {
            return None;
        }
        rule.last_triggered = Some(now);
        Some(rule.clone())
    }
}
