//! In-process span tree management.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use dashmap::DashMap;

use crate::config::TracingConfig;
use crate::logging::LogLevel;
use crate::trace::id::generate_id;
use crate::trace::span::{SpanContext, SpanLog, SpanStatus, TraceSpan};
use crate::value::FieldValue;

/// Owns active spans and a bounded buffer of completed ones.
///
/// Callers refer to spans by id. Operations on unknown or already finished
/// ids are no-ops. When more than `max_completed` spans have finished, the
/// oldest are evicted first.
#[derive(Debug)]
pub struct DistributedTracer {
    active: DashMap<String, TraceSpan>,
    completed: Mutex<VecDeque<TraceSpan>>,
    max_completed: usize,
}

impl Default for DistributedTracer {
    fn default() -> Self {
        Self::new(&TracingConfig::default())
    }
}

impl DistributedTracer {
    pub fn new(config: &TracingConfig) -> Self {
        Self {
            active: DashMap::new(),
            completed: Mutex::new(VecDeque::with_capacity(config.max_completed_spans)),
            max_completed: config.max_completed_spans,
        }
    }

    fn completed(&self) -> MutexGuard<'_, VecDeque<TraceSpan>> {
        self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a span. With a parent it joins the parent's trace; without one
    /// it starts a new trace.
    pub fn start_span(&self, operation_name: &str, parent: Option<&SpanContext>) -> TraceSpan {
        let context = SpanContext {
            trace_id: parent
                .map(|p| p.trace_id.clone())
                .unwrap_or_else(generate_id),
            span_id: generate_id(),
        };
        let span = TraceSpan::new(context, parent.map(|p| p.span_id.clone()), operation_name);

        self.active.insert(span.span_id().to_string(), span.clone());
        span
    }

    /// Close an active span and move it to the completed buffer.
    pub fn finish_span(&self, span_id: &str, status: SpanStatus) {
        // Held across the move so readers always find the span in one of the two tables.
        let mut completed = self.completed();
        let Some((_, mut span)) = self.active.remove(span_id) else {
            return;
        };
        span.finish(status);

        tracing::debug!(
            trace_id = %span.trace_id(),
            span_id = %span.span_id(),
            operation = %span.operation_name,
            status = ?status,
            duration = ?span.duration,
            "Span finished"
        );

        completed.push_back(span);
        while completed.len() > self.max_completed {
            completed.pop_front();
        }
    }

    pub fn add_tag(&self, span_id: &str, key: &str, value: impl Into<FieldValue>) {
        if let Some(mut span) = self.active.get_mut(span_id) {
            span.tags.insert(key.to_string(), value.into());
        }
    }

    pub fn add_log(&self, span_id: &str, message: &str, level: LogLevel) {
        if let Some(mut span) = self.active.get_mut(span_id) {
            span.logs.push(SpanLog {
                timestamp: Utc::now(),
                message: message.to_string(),
                level,
            });
        }
    }

    /// Look up an active span. Finished spans are not returned.
    pub fn get_span(&self, span_id: &str) -> Option<TraceSpan> {
        self.active.get(span_id).map(|span| span.value().clone())
    }

    /// Every span of a trace: active ones first, then completed ones.
    pub fn get_trace(&self, trace_id: &str) -> Vec<TraceSpan> {
        let mut spans: Vec<TraceSpan> = self
            .active
            .iter()
            .filter(|entry| entry.value().trace_id() == trace_id)
            .map(|entry| entry.value().clone())
            .collect();

        // A span finished between the two reads shows up in both; keep the active copy.
        let seen: HashSet<String> = spans.iter().map(|s| s.span_id().to_string()).collect();
        spans.extend(
            self.completed()
                .iter()
                .filter(|span| span.trace_id() == trace_id && !seen.contains(span.span_id()))
                .cloned(),
        );
        spans
    }

    /// Copy of the completed buffer, oldest first.
    pub fn completed_spans(&self) -> Vec<TraceSpan> {
        self.completed().iter().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
