//! Request instrumentation middleware.
//!
//! Wraps every route: opens the root span, counts the request, correlates
//! logs, and on the way out records status, latency and failures.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;

use crate::http::request::{request_id_from, RequestContext, X_REQUEST_ID, X_TRACE_ID};
use crate::http::response::{generic_error_response, HandlerError, HandlerFault};
use crate::logging::{LogLevel, StructuredLogger};
use crate::metrics::{
    HTTP_ERRORS_TOTAL, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS, HTTP_RESPONSES_TOTAL,
};
use crate::telemetry::Telemetry;
use crate::trace::SpanStatus;
use crate::value::FieldMap;

/// What the middleware learned about the request before dispatch.
struct Inbound {
    method: String,
    path: String,
    url: String,
    context: RequestContext,
    logger: StructuredLogger,
    started: Instant,
}

pub async fn instrument_request(
    State(telemetry): State<Telemetry>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let inbound = on_request(&telemetry, &mut req);

    let outcome = AssertUnwindSafe(next.run(req)).catch_unwind().await;
    let mut response = match outcome {
        Ok(response) => response,
        Err(payload) => {
            let err = HandlerError::from_panic(payload);
            tracing::error!(
                request_id = %inbound.context.request_id,
                message = %err.info().message,
                "Handler panicked"
            );
            axum::response::IntoResponse::into_response(err)
        }
    };

    if let Some(fault) = response.extensions_mut().remove::<HandlerFault>() {
        on_error(&telemetry, &inbound, &fault);
        response = generic_error_response(Some(&inbound.context.request_id));
    }

    on_response(&telemetry, &inbound, &response);
    set_correlation_headers(&mut response, &inbound.context);
    response
}

fn on_request(telemetry: &Telemetry, req: &mut Request<Body>) -> Inbound {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let url = req.uri().to_string();
    let request_id = request_id_from(req.headers());

    let span = telemetry
        .tracer
        .start_span(&format!("{} {}", method, path), None);
    let context = RequestContext {
        request_id,
        span: span.context,
    };
    req.extensions_mut().insert(context.clone());

    telemetry
        .metrics
        .increment(HTTP_REQUESTS_TOTAL, &[("method", &method), ("path", &path)], 1.0);

    let logger = telemetry.logger.child(context.log_context());

    Inbound {
        method,
        path,
        url,
        context,
        logger,
        started: Instant::now(),
    }
}

fn on_response(telemetry: &Telemetry, inbound: &Inbound, response: &Response) {
    let status = response.status().as_u16();
    let status_label = status.to_string();
    let span_id = inbound.context.span.span_id.as_str();
    let elapsed = inbound.started.elapsed();

    // No-ops when the error path already finished the span.
    telemetry.tracer.add_tag(span_id, "http.status_code", status);
    telemetry
        .tracer
        .add_tag(span_id, "http.method", inbound.method.as_str());
    telemetry.tracer.add_tag(span_id, "http.url", inbound.url.as_str());
    let span_status = if status >= 400 {
        SpanStatus::Error
    } else {
        SpanStatus::Ok
    };
    telemetry.tracer.finish_span(span_id, span_status);

    let labels = [("method", inbound.method.as_str()), ("status", status_label.as_str())];
    telemetry
        .metrics
        .observe(HTTP_REQUEST_DURATION_SECONDS, elapsed.as_secs_f64(), &labels);
    telemetry.metrics.increment(HTTP_RESPONSES_TOTAL, &labels, 1.0);

    let mut meta = request_metadata(inbound);
    meta.insert("statusCode".into(), status.into());
    meta.insert("duration".into(), millis(elapsed).into());
    inbound.logger.info(
        &format!(
            "{} {} {} {}ms",
            inbound.method,
            inbound.path,
            status,
            millis(elapsed)
        ),
        Some(meta),
    );
}

fn on_error(telemetry: &Telemetry, inbound: &Inbound, fault: &HandlerFault) {
    let span_id = inbound.context.span.span_id.as_str();

    telemetry.tracer.add_tag(span_id, "error", true);
    telemetry
        .tracer
        .add_log(span_id, &fault.0.message, LogLevel::Error);
    telemetry.tracer.finish_span(span_id, SpanStatus::Error);

    telemetry.metrics.increment(
        HTTP_ERRORS_TOTAL,
        &[("method", inbound.method.as_str()), ("error", fault.error_type())],
        1.0,
    );

    inbound.logger.error(
        &format!("Request failed: {} {}", inbound.method, inbound.path),
        Some(&fault.0),
        Some(request_metadata(inbound)),
    );
}

fn set_correlation_headers(response: &mut Response, context: &RequestContext) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&context.request_id) {
        headers.insert(X_REQUEST_ID, value);
    }
    if let Ok(value) = HeaderValue::from_str(&context.span.trace_id) {
        headers.insert(X_TRACE_ID, value);
    }
}

fn request_metadata(inbound: &Inbound) -> FieldMap {
    let mut meta = FieldMap::new();
    meta.insert("method".into(), inbound.method.as_str().into());
    meta.insert("path".into(), inbound.path.as_str().into());
    meta
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
