//! Named health probes with a hard timeout and last-result cache.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use tokio::task::JoinError;

use crate::config::HealthConfig;
use crate::health::alerts::{AlertEvaluator, AlertRule, AlertRules};
use crate::health::check::{overall_status, HealthCheck, HealthReport};

/// Error a probe may return; its message becomes the check's message.
pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

type ProbeFuture = BoxFuture<'static, Result<HealthCheck, ProbeError>>;
type Probe = Arc<dyn Fn() -> ProbeFuture + Send + Sync>;

pub const CHECK_NOT_FOUND: &str = "Check not found";
pub const CHECK_TIMEOUT: &str = "Health check timeout";
pub const CHECK_FAILED_TO_RUN: &str = "Check failed to run";

/// Registry of health probes and alert rules.
///
/// Cloning shares the same underlying tables.
#[derive(Clone)]
pub struct HealthRegistry {
    checks: Arc<DashMap<String, Probe>>,
    results: Arc<DashMap<String, HealthCheck>>,
    alerts: Arc<AlertRules>,
    timeout: Duration,
}

impl std::fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthRegistry")
            .field("checks", &self.check_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(&HealthConfig::default())
    }
}

impl HealthRegistry {
    pub fn new(config: &HealthConfig) -> Self {
        Self::with_timeout(Duration::from_secs(config.check_timeout_secs))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            checks: Arc::new(DashMap::new()),
            results: Arc::new(DashMap::new()),
            alerts: Arc::new(AlertRules::default()),
            timeout,
        }
    }

    /// Register a probe, replacing any probe already under `name`.
    pub fn add_check<F, Fut>(&self, name: &str, probe: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HealthCheck, ProbeError>> + Send + 'static,
    {
        let probe: Probe = Arc::new(move || probe().boxed());
        self.checks.insert(name.to_string(), probe);
    }

    pub fn remove_check(&self, name: &str) {
        self.checks.remove(name);
        self.results.remove(name);
    }

    /// Registered check names, sorted.
    pub fn check_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.checks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Most recent result of a check, if it has run.
    pub fn last_result(&self, name: &str) -> Option<HealthCheck> {
        self.results.get(name).map(|r| r.value().clone())
    }

    /// Run one probe, racing it against the registry timeout.
    ///
    /// Errors, panics and timeouts all become an `unhealthy` result. The
    /// outcome is cached as the check's last result. A probe that loses the
    /// race is aborted and its eventual output discarded.
    pub async fn run_check(&self, name: &str) -> HealthCheck {
        let Some(probe) = self.checks.get(name).map(|p| p.value().clone()) else {
            return HealthCheck::unhealthy(name, CHECK_NOT_FOUND);
        };

        let started = Instant::now();
        // The factory runs inside the task so a panic while building the future is caught too.
        let mut handle = tokio::spawn(async move { probe().await });
        let outcome = tokio::time::timeout(self.timeout, &mut handle).await;
        let elapsed = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(Ok(check))) => check.with_response_time(elapsed),
            Ok(Ok(Err(e))) => {
                tracing::warn!(check = %name, error = %e, "Health check failed");
                HealthCheck::unhealthy(name, e.to_string()).with_response_time(elapsed)
            }
            Ok(Err(join_error)) => {
                tracing::error!(check = %name, error = %join_error, "Health check panicked");
                HealthCheck::unhealthy(name, format!("Health check panicked: {}", join_error))
                    .with_response_time(elapsed)
            }
            Err(_) => {
                handle.abort();
                tracing::warn!(check = %name, timeout = ?self.timeout, "Health check timed out");
                HealthCheck::unhealthy(name, CHECK_TIMEOUT).with_response_time(elapsed)
            }
        };

        self.results.insert(name.to_string(), result.clone());
        result
    }

    /// Run every registered check concurrently and aggregate.
    ///
    /// A check whose runner itself fails is reported as an `unknown`
    /// placeholder; the aggregate call never fails.
    pub async fn run_all_checks(&self) -> HealthReport {
        let handles = self.check_names().into_iter().map(|name| {
            let registry = self.clone();
            tokio::spawn(async move { registry.run_check(&name).await })
        });

        aggregate(join_all(handles).await)
    }

    /// Insert or replace an alert rule by id.
    pub fn add_alert(&self, rule: AlertRule) {
        self.alerts.upsert(rule);
    }

    pub fn remove_alert(&self, id: &str) -> Option<AlertRule> {
        self.alerts.remove(id)
    }

    pub fn alert(&self, id: &str) -> Option<AlertRule> {
        self.alerts.get(id)
    }

    /// Enabled rules outside their cooldown window, i.e. eligible for evaluation.
    pub fn check_alerts(&self) -> Vec<AlertRule> {
        self.alerts.eligible(Utc::now())
    }

    /// Mark a rule as triggered now, regardless of cooldown.
    pub fn trigger_alert(&self, id: &str) -> Option<AlertRule> {
        self.alerts.trigger(id, Utc::now())
    }

    /// Evaluate eligible rules and trigger those whose condition holds.
    ///
    /// Returns the rules that fired, with `last_triggered` updated.
    pub fn evaluate_alerts(&self, evaluator: &dyn AlertEvaluator) -> Vec<AlertRule> {
        let now = Utc::now();
        self.alerts
            .eligible(now)
            .into_iter()
            .filter(|rule| evaluator.evaluate(rule))
            .filter_map(|rule| self.alerts.trigger_if_eligible(&rule.id, now))
            .collect()
    }
}

/// Map a settled runner to its result; a failed runner becomes a placeholder.
fn settle(settled: Result<HealthCheck, JoinError>) -> HealthCheck {
    settled.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Health check runner failed");
        HealthCheck::unhealthy("unknown", CHECK_FAILED_TO_RUN)
    })
}

fn aggregate(settled: Vec<Result<HealthCheck, JoinError>>) -> HealthReport {
    let checks: Vec<HealthCheck> = settled.into_iter().map(settle).collect();
    HealthReport {
        status: overall_status(&checks),
        checks,
        timestamp: Utc::now(),
    }
}
