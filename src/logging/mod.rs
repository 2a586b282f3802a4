//! Structured logging.
//!
//! # Data Flow
//! ```text
//! logger.info/warn/... (level check against the shared minimum)
//!     → LogEntry (timestamp, service, environment, metadata)
//!     → ContextEmitter* (one per child(): overlays requestId/traceId/...)
//!     → SinkEmitter (serde_json line)
//!     → LogSink (stdout, or memory in tests)
//! ```
//!
//! # Design Decisions
//! - One entry = one JSON line; optional fields are omitted, not null
//! - Child loggers decorate the emit step instead of sharing mutable context
//! - Entries below the minimum level are dropped without side effects
//! - The crate's own diagnostics go through `tracing` (subscriber.rs), not here

pub mod entry;
pub mod level;
pub mod logger;
pub mod sink;
pub mod subscriber;

pub use entry::{ErrorInfo, LogContext, LogEntry};
pub use level::LogLevel;
pub use logger::{Emit, StructuredLogger};
pub use sink::{LogSink, MemorySink, StdoutSink};
pub use subscriber::init_subscriber;
