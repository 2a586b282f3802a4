//! Log entry model and its JSON line form.

use std::error::Error;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::logging::level::LogLevel;
use crate::value::{FieldMap, FieldValue};

/// One structured log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "serialize_level")]
    pub level: LogLevel,
    pub message: String,
    pub service: String,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMap>,
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn serialize_level<S: Serializer>(level: &LogLevel, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(level.as_upper())
}

impl LogEntry {
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Correlation fields a child logger stamps onto every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    pub fn span_id(mut self, id: impl Into<String>) -> Self {
        self.span_id = Some(id.into());
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// `overlay`'s set fields win; the rest come from `self`.
    pub fn merged(&self, overlay: &LogContext) -> LogContext {
        LogContext {
            trace_id: overlay.trace_id.clone().or_else(|| self.trace_id.clone()),
            span_id: overlay.span_id.clone().or_else(|| self.span_id.clone()),
            user_id: overlay.user_id.clone().or_else(|| self.user_id.clone()),
            request_id: overlay.request_id.clone().or_else(|| self.request_id.clone()),
        }
    }

    /// Overlay the fields this context sets; unset fields leave the entry alone.
    pub fn apply(&self, entry: &mut LogEntry) {
        if let Some(id) = &self.trace_id {
            entry.trace_id = Some(id.clone());
        }
        if let Some(id) = &self.span_id {
            entry.span_id = Some(id.clone());
        }
        if let Some(id) = &self.user_id {
            entry.user_id = Some(id.clone());
        }
        if let Some(id) = &self.request_id {
            entry.request_id = Some(id.clone());
        }
    }
}

/// Error details folded into `metadata.error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorInfo {
    /// Capture an error's type name, message and `source()` chain.
    pub fn from_error<E: Error + ?Sized>(err: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            name: short_type_name::<E>().to_string(),
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn to_value(&self) -> FieldValue {
        let mut map = FieldMap::new();
        map.insert("name".into(), self.name.clone().into());
        map.insert("message".into(), self.message.clone().into());
        if let Some(stack) = &self.stack {
            map.insert("stack".into(), stack.clone().into());
        }
        FieldValue::Map(map)
    }
}

/// Last path segment of a type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
