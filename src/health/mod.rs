//! Health checking and alerting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health/{check}:
//!     registry.rs run_check
//!     → spawn probe, race against timeout (10s default)
//!     → success / error / panic / timeout → HealthCheck
//!     → cache as last result
//!
//! GET /health:
//!     run_all_checks → run_check per name, concurrently
//!     → settled join (runner faults become "unknown" placeholders)
//!     → overall status = worst of all checks
//!
//! Alert tick (monitor.rs):
//!     Periodic timer
//!     → check_alerts (enabled, outside cooldown)
//!     → AlertEvaluator decides the condition
//!     → stamp last_triggered, log the alert
//! ```
//!
//! # Design Decisions
//! - Probe failures never propagate; they are unhealthy results
//! - A timed-out probe cannot write the cache after the fact
//! - The condition language is external; only eligibility lives here

pub mod alerts;
pub mod check;
pub mod monitor;
pub mod registry;

pub use alerts::{AlertChannel, AlertEvaluator, AlertRule, AlertSeverity, MetricThresholdEvaluator};
pub use check::{overall_status, HealthCheck, HealthReport, HealthStatus};
pub use monitor::AlertMonitor;
pub use registry::{HealthRegistry, ProbeError};
