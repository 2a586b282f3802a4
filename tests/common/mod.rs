//! Shared utilities for end-to-end tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use telemetry_core::logging::MemorySink;
use telemetry_core::{HttpServer, Shutdown, Telemetry, TelemetryConfig};

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub telemetry: Telemetry,
    pub logs: MemorySink,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub config_tx: mpsc::UnboundedSender<TelemetryConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the instrumented server with `app` and return once it accepts.
pub async fn start_server<F>(config: TelemetryConfig, app: F) -> TestServer
where
    F: FnOnce(&Telemetry) -> Router,
{
    let logs = MemorySink::new();
    let telemetry = Telemetry::with_sink(&config, Arc::new(logs.clone()));
    let router = app(&telemetry);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();

    let server = HttpServer::new(config, telemetry.clone(), router);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    // The listener is already bound; give the accept loop a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        telemetry,
        logs,
        shutdown,
        config_tx,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
