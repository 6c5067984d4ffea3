//! Observability module
//!
//! Structured log events, Prometheus metrics and subscriber setup for the
//! content scheduler.

pub mod metrics_collector;
pub mod structured_logger;
pub mod telemetry_setup;

pub use metrics_collector::MetricsCollector;
pub use structured_logger::StructuredLogger;
pub use telemetry_setup::{init_logging, init_metrics};
