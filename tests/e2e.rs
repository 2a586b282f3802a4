//! End-to-end tests over a real TCP listener.

use std::time::Duration;

use axum::{extract::Path, routing::get, Router};

use telemetry_core::health::{AlertRule, AlertSeverity, HealthCheck, ProbeError};
use telemetry_core::logging::LogLevel;
use telemetry_core::trace::SpanStatus;
use telemetry_core::{HandlerError, TelemetryConfig};

mod common;

fn demo_app(_: &telemetry_core::Telemetry) -> Router {
    Router::new()
        .route("/hello", get(|| async { "hello" }))
        .route(
            "/orders/{id}",
            get(|Path(id): Path<String>| async move {
                let id: u64 = id.parse()?;
                Ok::<_, HandlerError>(format!("order {}", id))
            }),
        )
        .route("/panic", get(panicking))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        )
}

async fn panicking() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_request_is_counted_and_correlated() {
    let server = common::start_server(TelemetryConfig::default(), demo_app).await;
    let client = common::client();

    let res = client.get(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let trace_id = res.headers()["x-trace-id"].to_str().unwrap().to_string();
    assert_eq!(res.text().await.unwrap(), "hello");

    let metrics = client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("# TYPE http_requests_total counter"));
    assert!(metrics.contains("http_requests_total{method=\"GET\",path=\"/hello\"} 1"));
    assert!(metrics.contains("http_responses_total{method=\"GET\",status=\"200\"} 1"));
    assert!(metrics.contains("# TYPE http_request_duration_seconds histogram"));

    let spans = server.telemetry.tracer.get_trace(&trace_id);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].operation_name, "GET /hello");
    assert_eq!(spans[0].status, SpanStatus::Ok);

    let entries = server.logs.entries();
    let line = entries
        .iter()
        .find(|e| e["requestId"] == request_id.as_str())
        .expect("no log line for the request");
    assert_eq!(line["traceId"], trace_id.as_str());
    assert_eq!(line["service"], "api");
    assert_eq!(line["environment"], "development");
}

#[tokio::test]
async fn test_incoming_request_id_is_echoed() {
    let server = common::start_server(TelemetryConfig::default(), demo_app).await;

    let res = common::client()
        .get(server.url("/hello"))
        .header("x-request-id", "upstream-7")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "upstream-7");
}

#[tokio::test]
async fn test_handler_error_returns_generic_500() {
    let server = common::start_server(TelemetryConfig::default(), demo_app).await;
    let client = common::client();

    let res = client.get(server.url("/orders/abc")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Internal Server Error");
    assert!(!body.to_string().contains("invalid digit"));

    let metrics = client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("http_errors_total{error=\"ParseIntError\",method=\"GET\"} 1"));
    assert!(metrics.contains("http_responses_total{method=\"GET\",status=\"500\"} 1"));

    let ok = client.get(server.url("/orders/42")).send().await.unwrap();
    assert_eq!(ok.status(), 200);
    assert_eq!(ok.text().await.unwrap(), "order 42");
}

#[tokio::test]
async fn test_panic_does_not_take_down_server() {
    let server = common::start_server(TelemetryConfig::default(), demo_app).await;
    let client = common::client();

    let res = client.get(server.url("/panic")).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let res = client.get(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        server.telemetry.metrics.counter_value(
            "http_errors_total",
            &[("method", "GET"), ("error", "panic")]
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn test_request_timeout_is_recorded() {
    let mut config = TelemetryConfig::default();
    config.timeouts.request_secs = 1;
    let server = common::start_server(config, demo_app).await;

    let res = common::client().get(server.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), 408);
    let trace_id = res.headers()["x-trace-id"].to_str().unwrap().to_string();

    let spans = server.telemetry.tracer.get_trace(&trace_id);
    assert_eq!(spans[0].status, SpanStatus::Error);
}

#[tokio::test]
async fn test_health_endpoints() {
    let server = common::start_server(TelemetryConfig::default(), demo_app).await;
    server
        .telemetry
        .health
        .add_check("db", || async { Ok::<_, ProbeError>(HealthCheck::healthy("db")) });
    server.telemetry.health.add_check("cache", || async {
        Err::<HealthCheck, ProbeError>("connection refused".into())
    });
    let client = common::client();

    let report: serde_json::Value = client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["status"], "unhealthy");
    assert_eq!(report["checks"].as_array().unwrap().len(), 2);

    let res = client.get(server.url("/health/missing")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let check: serde_json::Value = res.json().await.unwrap();
    assert_eq!(check["name"], "missing");
    assert_eq!(check["status"], "unhealthy");
}

#[tokio::test]
async fn test_config_update_changes_log_level() {
    let server = common::start_server(TelemetryConfig::default(), demo_app).await;
    let client = common::client();

    let mut updated = TelemetryConfig::default();
    updated.logging.level = LogLevel::Error;
    server.config_tx.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.telemetry.logger.level(), LogLevel::Error);

    client.get(server.url("/hello")).send().await.unwrap();
    assert!(server.logs.entries().iter().all(|e| e["level"] != "INFO"));
}

#[tokio::test]
async fn test_alert_monitor_fires_on_errors() {
    let mut config = TelemetryConfig::default();
    config.health.alert_interval_secs = 1;
    let server = common::start_server(config, demo_app).await;
    server.telemetry.health.add_alert(AlertRule::new(
        "errors",
        "Request errors",
        "http_errors_total",
        0.0,
        AlertSeverity::High,
    ));

    common::client()
        .get(server.url("/orders/oops"))
        .send()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let fired = server
        .logs
        .entries()
        .into_iter()
        .any(|e| e["message"] == "Alert triggered: Request errors");
    assert!(fired);
    assert!(server.telemetry.health.alert("errors").unwrap().last_triggered.is_some());
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = common::start_server(TelemetryConfig::default(), demo_app).await;
    let client = common::client();
    assert!(client.get(server.url("/hello")).send().await.is_ok());

    server.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(client.get(server.url("/hello")).send().await.is_err());
}
