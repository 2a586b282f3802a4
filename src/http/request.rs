//! Per-request correlation context.
//!
//! # Responsibilities
//! - Pick the request id (incoming `x-request-id` or a fresh UUID)
//! - Carry request id and root span identity to handlers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Handlers get ids, never the span itself; the tracer owns spans

use axum::http::HeaderMap;

use crate::logging::LogContext;
use crate::trace::{generate_request_id, SpanContext};

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_TRACE_ID: &str = "x-trace-id";

/// Inserted into request extensions by the instrumentation middleware.
///
/// Handlers extract it with `Extension<RequestContext>` to open child spans
/// or build a correlated logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub span: SpanContext,
}

impl RequestContext {
    pub fn trace_id(&self) -> &str {
        &self.span.trace_id
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new()
            .request_id(self.request_id.clone())
            .trace_id(self.span.trace_id.clone())
    }
}

/// Reuse a non-empty incoming request id, otherwise generate one.
pub fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate_request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_incoming_request_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(request_id_from(&headers), "abc-123");
    }

    #[test]
    fn test_missing_request_id_is_generated() {
        let id = request_id_from(&HeaderMap::new());
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("  "));
        assert_ne!(request_id_from(&headers).trim(), "");
    }
}
