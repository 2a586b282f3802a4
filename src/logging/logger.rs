//! Level-filtered JSON logger with child loggers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;

use crate::config::TelemetryConfig;
use crate::logging::entry::{ErrorInfo, LogContext, LogEntry};
use crate::logging::level::LogLevel;
use crate::logging::sink::{LogSink, StdoutSink};
use crate::value::FieldMap;

/// Final step of the logging pipeline.
pub trait Emit: Send + Sync {
    fn emit(&self, entry: LogEntry);
}

/// Serializes entries and hands them to a sink.
struct SinkEmitter {
    sink: Arc<dyn LogSink>,
}

impl Emit for SinkEmitter {
    fn emit(&self, entry: LogEntry) {
        match entry.to_json_line() {
            Ok(line) => self.sink.write_line(&line),
            Err(e) => tracing::warn!(error = %e, "Dropping unserializable log entry"),
        }
    }
}

/// Decorates an emitter with a fixed correlation context.
struct ContextEmitter {
    inner: Arc<dyn Emit>,
    context: LogContext,
}

impl Emit for ContextEmitter {
    fn emit(&self, mut entry: LogEntry) {
        self.context.apply(&mut entry);
        self.inner.emit(entry);
    }
}

/// Structured logger bound to a service and environment.
///
/// Cloning is cheap. The minimum level is shared between a logger and all
/// of its children, so [`StructuredLogger::set_level`] affects the whole tree.
#[derive(Clone)]
pub struct StructuredLogger {
    service: Arc<str>,
    environment: Arc<str>,
    min_level: Arc<ArcSwap<LogLevel>>,
    /// Undecorated root emitter; children wrap it exactly once.
    base: Arc<dyn Emit>,
    context: LogContext,
    emitter: Arc<dyn Emit>,
}

impl std::fmt::Debug for StructuredLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredLogger")
            .field("service", &self.service)
            .field("environment", &self.environment)
            .field("min_level", &self.level())
            .finish()
    }
}

impl StructuredLogger {
    /// Logger writing to stdout.
    pub fn new(service: &str, environment: &str, min_level: LogLevel) -> Self {
        Self::with_sink(service, environment, min_level, Arc::new(StdoutSink))
    }

    pub fn with_sink(
        service: &str,
        environment: &str,
        min_level: LogLevel,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let emitter: Arc<dyn Emit> = Arc::new(SinkEmitter { sink });
        Self {
            service: service.into(),
            environment: environment.into(),
            min_level: Arc::new(ArcSwap::from_pointee(min_level)),
            base: emitter.clone(),
            context: LogContext::new(),
            emitter,
        }
    }

    pub fn from_config(config: &TelemetryConfig, sink: Arc<dyn LogSink>) -> Self {
        Self::with_sink(
            &config.service.name,
            &config.service.environment,
            config.logging.level,
            sink,
        )
    }

    pub fn level(&self) -> LogLevel {
        **self.min_level.load()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.min_level.store(Arc::new(level));
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    /// A logger that stamps `context` onto every entry it emits.
    ///
    /// Fields set in `context` override the ones inherited from this logger.
    /// The parent is left untouched.
    pub fn child(&self, context: LogContext) -> Self {
        let context = self.context.merged(&context);
        Self {
            service: self.service.clone(),
            environment: self.environment.clone(),
            min_level: self.min_level.clone(),
            base: self.base.clone(),
            emitter: Arc::new(ContextEmitter {
                inner: self.base.clone(),
                context: context.clone(),
            }),
            context,
        }
    }

    pub fn debug(&self, message: &str, metadata: Option<FieldMap>) {
        self.log(LogLevel::Debug, message, metadata);
    }

    pub fn info(&self, message: &str, metadata: Option<FieldMap>) {
        self.log(LogLevel::Info, message, metadata);
    }

    pub fn warn(&self, message: &str, metadata: Option<FieldMap>) {
        self.log(LogLevel::Warn, message, metadata);
    }

    pub fn error(&self, message: &str, error: Option<&ErrorInfo>, metadata: Option<FieldMap>) {
        self.log(LogLevel::Error, message, with_error(metadata, error));
    }

    pub fn fatal(&self, message: &str, error: Option<&ErrorInfo>, metadata: Option<FieldMap>) {
        self.log(LogLevel::Fatal, message, with_error(metadata, error));
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Option<FieldMap>) {
        if !self.should_log(level) {
            return;
        }

        self.emitter.emit(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            service: self.service.to_string(),
            environment: self.environment.to_string(),
            trace_id: None,
            span_id: None,
            user_id: None,
            request_id: None,
            metadata,
        });
    }
}

fn with_error(metadata: Option<FieldMap>, error: Option<&ErrorInfo>) -> Option<FieldMap> {
    match error {
        None => metadata,
        Some(err) => {
            let mut map = metadata.unwrap_or_default();
            map.insert("error".into(), err.to_value());
            Some(map)
        }
    }
}
