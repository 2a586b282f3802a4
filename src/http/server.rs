//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the telemetry read endpoints next to the application's routes
//! - Wire up middleware (instrumentation, timeout, tower tracing)
//! - Run the alert monitor alongside the listener
//! - Apply live config updates and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TelemetryConfig;
use crate::health::{AlertEvaluator, AlertMonitor, MetricThresholdEvaluator};
use crate::http::handlers::{health_check_handler, health_handler, metrics_handler, trace_handler};
use crate::http::middleware::instrument_request;
use crate::lifecycle::signals::wait_for_signal;
use crate::telemetry::Telemetry;

/// HTTP server exposing an instrumented application.
pub struct HttpServer {
    router: Router,
    config: TelemetryConfig,
    telemetry: Telemetry,
    evaluator: Arc<dyn AlertEvaluator>,
}

impl HttpServer {
    /// Create a server for `app`, instrumented by `telemetry`.
    ///
    /// Alert rules are evaluated against the telemetry metrics unless
    /// another evaluator is supplied with [`HttpServer::with_alert_evaluator`].
    pub fn new(config: TelemetryConfig, telemetry: Telemetry, app: Router) -> Self {
        let router = build_router(&config, telemetry.clone(), app);
        let evaluator = Arc::new(MetricThresholdEvaluator::new(telemetry.metrics.clone()));
        Self {
            router,
            config,
            telemetry,
            evaluator,
        }
    }

    pub fn with_alert_evaluator(mut self, evaluator: Arc<dyn AlertEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Stops on SIGINT/SIGTERM or when `shutdown` fires, draining in-flight
    /// requests first.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<TelemetryConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            "HTTP server starting"
        );

        let monitor = AlertMonitor::new(
            self.telemetry.health.clone(),
            self.evaluator.clone(),
            self.telemetry.logger.clone(),
            Duration::from_secs(self.config.health.alert_interval_secs),
        );
        tokio::spawn(monitor.run(shutdown.resubscribe()));

        let logger = self.telemetry.logger.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                let level = new_config.logging.level;
                if level != logger.level() {
                    logger.set_level(level);
                    tracing::info!(level = %level, "Log level updated");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

/// Build the Axum router with all middleware layers.
///
/// Telemetry endpoints are instrumented like any other route.
#[allow(deprecated)]
pub fn build_router(config: &TelemetryConfig, telemetry: Telemetry, app: Router) -> Router {
    let endpoints = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/health/{check}", get(health_check_handler))
        .route("/traces/{trace_id}", get(trace_handler))
        .with_state(telemetry.clone());

    endpoints
        .merge(app)
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::from_fn_with_state(telemetry, instrument_request))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        _ = wait_for_signal() => {}
        _ = shutdown.recv() => {}
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::health::{HealthCheck, ProbeError};
    use crate::logging::MemorySink;

    fn router() -> (Router, Telemetry) {
        let config = TelemetryConfig::default();
        let telemetry = Telemetry::with_sink(&config, Arc::new(MemorySink::new()));
        let app = Router::new().route("/hello", get(|| async { "hi" }));
        (build_router(&config, telemetry.clone(), app), telemetry)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint_reports_app_traffic() {
        let (app, _) = router();
        app.clone().oneshot(get_req("/hello")).await.unwrap();

        let response = app.oneshot(get_req("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        let text = body_string(response).await;
        assert!(text.contains("http_requests_total{method=\"GET\",path=\"/hello\"} 1"));
        // The scrape itself is counted before the export is rendered.
        assert!(text.contains("http_requests_total{method=\"GET\",path=\"/metrics\"} 1"));
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (app, telemetry) = router();
        telemetry
            .health
            .add_check("db", || async { Ok::<_, ProbeError>(HealthCheck::healthy("db")) });

        let response = app.clone().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(report["status"], "healthy");
        assert_eq!(report["checks"][0]["name"], "db");

        let response = app.oneshot(get_req("/health/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let check: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(check["status"], "unhealthy");
        assert_eq!(check["message"], "Check not found");
    }

    #[tokio::test]
    async fn test_trace_endpoint_returns_request_span() {
        let (app, _) = router();
        let response = app.clone().oneshot(get_req("/hello")).await.unwrap();
        let trace_id = response.headers()["x-trace-id"].to_str().unwrap().to_string();

        let response = app
            .oneshot(get_req(&format!("/traces/{}", trace_id)))
            .await
            .unwrap();
        let spans: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(spans[0]["operationName"], "GET /hello");
        assert_eq!(spans[0]["status"], "ok");
    }
}
