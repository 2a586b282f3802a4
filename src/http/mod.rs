//! HTTP instrumentation subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → middleware/instrument.rs on the way in
//!         request id, root span, http_requests_total, RequestContext
//!     → application handler or handlers.rs (/metrics, /health, /traces)
//!     → middleware/instrument.rs on the way out
//!         HandlerFault or panic → error span, http_errors_total, generic 500
//!         status/latency → span tags, histogram, http_responses_total, log line
//!         x-request-id / x-trace-id response headers
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID, X_TRACE_ID};
pub use response::{HandlerError, HandlerFault};
pub use server::{build_router, HttpServer};
