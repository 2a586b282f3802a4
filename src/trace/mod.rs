//! Distributed tracing support (in-process span trees).
//!
//! # Data Flow
//! ```text
//! start_span(op, parent?)  → active table (keyed by spanId)
//! add_tag / add_log        → mutate active span only
//! finish_span(id, status)  → completed buffer (newest N kept, oldest evicted)
//! get_trace(traceId)       → active spans, then completed spans
//! ```
//!
//! # Design Decisions
//! - The tracer owns every span; callers hold ids (or a returned copy)
//! - Eviction is size-triggered and re-checked on every finish
//! - Ids are 16 hex chars derived from random v4 UUIDs

pub mod id;
pub mod span;
pub mod tracer;

pub use id::{generate_id, generate_request_id};
pub use span::{SpanContext, SpanLog, SpanStatus, TraceSpan};
pub use tracer::DistributedTracer;
