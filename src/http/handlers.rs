//! Telemetry read endpoints.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::health::{HealthCheck, HealthReport};
use crate::telemetry::Telemetry;
use crate::trace::TraceSpan;

pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// GET /metrics
pub async fn metrics_handler(State(telemetry): State<Telemetry>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        telemetry.metrics.export_prometheus(),
    )
}

/// GET /health
pub async fn health_handler(State(telemetry): State<Telemetry>) -> Json<HealthReport> {
    Json(telemetry.health.run_all_checks().await)
}

/// GET /health/{check}
///
/// Always 200; an unknown check is an unhealthy result, not a 404.
pub async fn health_check_handler(
    State(telemetry): State<Telemetry>,
    Path(check): Path<String>,
) -> Json<HealthCheck> {
    Json(telemetry.health.run_check(&check).await)
}

/// GET /traces/{trace_id}
pub async fn trace_handler(
    State(telemetry): State<Telemetry>,
    Path(trace_id): Path<String>,
) -> Json<Vec<TraceSpan>> {
    Json(telemetry.tracer.get_trace(&trace_id))
}
