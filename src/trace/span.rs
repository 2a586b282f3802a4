//! Span model.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::logging::LogLevel;
use crate::value::FieldValue;

/// Outcome recorded when a span finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    #[default]
    Ok,
    Error,
    Timeout,
}

/// Identity of a span within its trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
}

/// Timestamped message attached to a span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanLog {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
}

/// A timed unit of work.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSpan {
    #[serde(flatten)]
    pub context: SpanContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub operation_name: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(
        rename = "durationMs",
        serialize_with = "serialize_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
    pub status: SpanStatus,
    pub tags: BTreeMap<String, FieldValue>,
    pub logs: Vec<SpanLog>,
    #[serde(skip)]
    started: Instant,
}

fn serialize_duration_ms<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_f64(d.as_secs_f64() * 1000.0),
        None => s.serialize_none(),
    }
}

impl TraceSpan {
    pub(crate) fn new(context: SpanContext, parent_span_id: Option<String>, operation_name: &str) -> Self {
        Self {
            context,
            parent_span_id,
            operation_name: operation_name.to_string(),
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            status: SpanStatus::Ok,
            tags: BTreeMap::new(),
            logs: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.context.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.context.span_id
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub(crate) fn finish(&mut self, status: SpanStatus) {
        self.end_time = Some(Utc::now());
        self.duration = Some(self.started.elapsed());
        self.status = status;
    }
}
