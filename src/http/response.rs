//! Handler failures and the generic 500 response.
//!
//! # Responsibilities
//! - Let handlers bail out with `?` on any error type
//! - Hand error details to the instrumentation layer, never to the client
//!
//! # Design Decisions
//! - Details travel in a response extension that the middleware strips
//! - The client body is identical for every failure

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::logging::ErrorInfo;

pub const GENERIC_ERROR: &str = "Internal Server Error";
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Error details attached to a failed response for the instrumentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault(pub ErrorInfo);

impl HandlerFault {
    pub fn error_type(&self) -> &str {
        &self.0.name
    }
}

/// Error returned by handlers to take the failure path.
///
/// Any `std::error::Error` converts into it, so handlers can use `?`.
#[derive(Debug)]
pub struct HandlerError {
    info: ErrorInfo,
}

impl HandlerError {
    pub fn msg(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            info: ErrorInfo::new(name, message),
        }
    }

    /// Convert a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::msg("panic", message)
    }

    pub fn info(&self) -> &ErrorInfo {
        &self.info
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self {
            info: ErrorInfo::from_error(&err),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let mut response = generic_error_response(None);
        response.extensions_mut().insert(HandlerFault(self.info));
        response
    }
}

/// 500 response with no detail about the underlying failure.
pub fn generic_error_response(request_id: Option<&str>) -> Response {
    let body = match request_id {
        Some(id) => json!({
            "error": GENERIC_ERROR,
            "message": GENERIC_ERROR_MESSAGE,
            "requestId": id,
        }),
        None => json!({
            "error": GENERIC_ERROR,
            "message": GENERIC_ERROR_MESSAGE,
        }),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_std_error_keeps_type_name() {
        let err = "x".parse::<u32>().unwrap_err();
        let handler_err = HandlerError::from(err);

        assert_eq!(handler_err.info().name, "ParseIntError");
        assert_eq!(handler_err.info().message, "invalid digit found in string");
    }

    #[test]
    fn test_response_carries_fault_not_detail() {
        let response = HandlerError::msg("DbError", "password=hunter2 rejected").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let fault = response.extensions().get::<HandlerFault>().unwrap();
        assert_eq!(fault.error_type(), "DbError");
    }

    #[test]
    fn test_panic_payloads() {
        let from_str = HandlerError::from_panic(Box::new("boom"));
        assert_eq!(from_str.info().message, "boom");
        assert_eq!(from_str.info().name, "panic");

        let from_string = HandlerError::from_panic(Box::new(String::from("kaboom")));
        assert_eq!(from_string.info().message, "kaboom");
    }
}
