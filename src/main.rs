//! Instrumented demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ server.rs (axum, timeout, tower trace)
//!                        │
//!                        ▼
//!                  instrument.rs ──▶ tracer (root span)
//!                        │      ──▶ metrics (http_* series)
//!                        │      ──▶ logger (correlated JSON lines)
//!                        ▼
//!              app routes / telemetry endpoints
//!                 /orders/{id}    /metrics /health /traces
//!
//!     Background: AlertMonitor tick, ConfigWatcher (log level)
//! ```
//!
//! Usage: `telemetry-core [config.toml]`. Without a path, defaults plus
//! `SERVICE_NAME` / `ENVIRONMENT` / `LOG_LEVEL` are used.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use telemetry_core::config::loader::{from_env, load_config};
use telemetry_core::config::watcher::ConfigWatcher;
use telemetry_core::health::{AlertRule, AlertSeverity, HealthCheck, HealthRegistry, ProbeError};
use telemetry_core::logging::init_subscriber;
use telemetry_core::trace::SpanStatus;
use telemetry_core::{HandlerError, HttpServer, RequestContext, Shutdown, Telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => from_env()?,
    };

    init_subscriber(config.logging.format)?;
    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    let telemetry = Telemetry::from_config(&config);
    telemetry.install_metrics_recorder()?;
    register_checks(&telemetry.health);
    telemetry.health.add_alert(AlertRule::new(
        "high_error_count",
        "Unhandled request errors",
        "http_errors_total",
        10.0,
        AlertSeverity::Critical,
    ));

    // The watcher must stay alive for reloads to keep arriving.
    let (_watcher, config_updates) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let app = Router::new()
        .route("/", get(|| async { "telemetry-core" }))
        .route("/orders/{id}", get(get_order))
        .with_state(telemetry.clone());

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, telemetry, app);
    server.run(listener, config_updates, shutdown.subscribe()).await?;
    shutdown.trigger();

    tracing::info!("Shutdown complete");
    Ok(())
}

fn register_checks(health: &HealthRegistry) {
    health.add_check("self", || async { Ok::<_, ProbeError>(HealthCheck::healthy("self")) });

    // Scheduling delay of a 10ms sleep; a busy runtime shows up here first.
    health.add_check("runtime", || async {
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let lag = started.elapsed().saturating_sub(Duration::from_millis(10));
        let check = if lag > Duration::from_millis(100) {
            HealthCheck::warning("runtime", format!("Scheduler lag {}ms", lag.as_millis()))
        } else {
            HealthCheck::healthy("runtime")
        };
        Ok::<_, ProbeError>(check)
    });
}

/// GET /orders/{id}: a non-numeric id fails through `HandlerError`.
async fn get_order(
    State(telemetry): State<Telemetry>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, HandlerError> {
    let span = telemetry.tracer.start_span("load_order", Some(&ctx.span));
    let parsed = id.parse::<u64>();
    telemetry.tracer.add_tag(span.span_id(), "order.id", id.as_str());

    let order_id = match parsed {
        Ok(order_id) => order_id,
        Err(e) => {
            telemetry.tracer.finish_span(span.span_id(), SpanStatus::Error);
            return Err(e.into());
        }
    };

    metrics::counter!("orders_loaded_total").increment(1);
    telemetry.tracer.finish_span(span.span_id(), SpanStatus::Ok);

    Ok(Json(json!({
        "id": order_id,
        "status": "shipped",
        "requestId": ctx.request_id,
    })))
}
