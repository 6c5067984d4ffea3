//! Metrics collector for the content scheduler
//!
//! Handles are registered once against the global `metrics` recorder. When no
//! recorder is installed every call is a no-op.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::debug;

pub struct MetricsCollector {
    // Scheduling loop
    tasks_promoted_total: Counter,
    tick_duration: Histogram,
    recurring_tasks_created_total: Counter,

    // Execution
    tasks_completed_total: Counter,
    tasks_failed_total: Counter,
    task_execution_duration: Histogram,
    worker_errors_total: Counter,

    // Runtime state
    queue_depth: Gauge,
    active_tasks: Gauge,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tasks_promoted_total: counter!("content_scheduler_tasks_promoted_total"),
            tick_duration: histogram!("content_scheduler_tick_duration_seconds"),
            recurring_tasks_created_total: counter!(
                "content_scheduler_recurring_tasks_created_total"
            ),
            tasks_completed_total: counter!("content_scheduler_tasks_completed_total"),
            tasks_failed_total: counter!("content_scheduler_tasks_failed_total"),
            task_execution_duration: histogram!(
                "content_scheduler_task_execution_duration_seconds"
            ),
            worker_errors_total: counter!("content_scheduler_worker_errors_total"),
            queue_depth: gauge!("content_scheduler_queue_depth"),
            active_tasks: gauge!("content_scheduler_active_tasks"),
        }
    }

    /// Record one scheduling tick
    pub fn record_tick(&self, promoted: usize, duration_seconds: f64) {
        self.tasks_promoted_total.increment(promoted as u64);
        self.tick_duration.record(duration_seconds);
        debug!(
            promoted = promoted,
            duration_seconds = duration_seconds,
            "Scheduling tick recorded"
        );
    }

    pub fn record_recurring_created(&self, count: usize) {
        self.recurring_tasks_created_total.increment(count as u64);
    }

    /// Record a finished execution attempt
    pub fn record_task_execution(&self, success: bool, duration_seconds: f64) {
        if success {
            self.tasks_completed_total.increment(1);
        } else {
            self.tasks_failed_total.increment(1);
        }
        self.task_execution_duration.record(duration_seconds);
    }

    pub fn record_worker_error(&self) {
        self.worker_errors_total.increment(1);
    }

    pub fn update_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as f64);
    }

    pub fn update_active_tasks(&self, count: usize) {
        self.active_tasks.set(count as f64);
    }
}
