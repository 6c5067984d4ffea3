//! Structured logging utilities
//!
//! One function per lifecycle event so every component emits the same
//! `event` names and field layout.

use chrono::{DateTime, Utc};
use scheduler_domain::ContentTask;
use tracing::{debug, error, info, warn};

pub struct StructuredLogger;

impl StructuredLogger {
    /// Log a newly scheduled task
    pub fn log_task_scheduled(task: &ContentTask) {
        info!(
            event = "task_scheduled",
            task.id = %task.task_id,
            task.channel = %task.channel_id,
            task.title = %task.title,
            task.frequency = %task.frequency,
            task.scheduled_at = %task.scheduled_time,
            task.auto_generated = task.is_auto_generated(),
            "Task scheduled"
        );
    }

    /// Log a task moved from scheduled to queued
    pub fn log_task_promoted(task: &ContentTask) {
        debug!(
            event = "task_promoted",
            task.id = %task.task_id,
            task.channel = %task.channel_id,
            task.scheduled_at = %task.scheduled_time,
            "Task promoted to execution queue"
        );
    }

    pub fn log_task_execution_start(task: &ContentTask, worker_id: &str) {
        info!(
            event = "task_execution_start",
            task.id = %task.task_id,
            task.channel = %task.channel_id,
            task.title = %task.title,
            worker.id = worker_id,
            "Task execution started"
        );
    }

    pub fn log_task_execution_complete(
        task: &ContentTask,
        worker_id: &str,
        success: bool,
        duration_ms: u64,
        error_message: Option<&str>,
    ) {
        if success {
            info!(
                event = "task_execution_complete",
                task.id = %task.task_id,
                task.channel = %task.channel_id,
                worker.id = worker_id,
                task.success = success,
                task.duration_ms = duration_ms,
                "Task execution completed successfully"
            );
        } else {
            error!(
                event = "task_execution_failed",
                task.id = %task.task_id,
                task.channel = %task.channel_id,
                worker.id = worker_id,
                task.success = success,
                task.duration_ms = duration_ms,
                task.error = error_message.unwrap_or("Unknown error"),
                "Task execution failed"
            );
        }
    }

    pub fn log_task_cancelled(task_id: &str) {
        info!(event = "task_cancelled", task.id = task_id, "Task cancelled");
    }

    pub fn log_task_rescheduled(task_id: &str, new_time: DateTime<Utc>) {
        info!(
            event = "task_rescheduled",
            task.id = task_id,
            task.scheduled_at = %new_time,
            "Task rescheduled"
        );
    }

    pub fn log_recurring_task_created(task: &ContentTask) {
        info!(
            event = "recurring_task_created",
            task.id = %task.task_id,
            task.channel = %task.channel_id,
            task.title = %task.title,
            task.scheduled_at = %task.scheduled_time,
            "Recurring task created"
        );
    }

    /// Log an error raised by a worker outside any single task
    pub fn log_worker_error(worker_id: &str, error: &str, backoff_ms: u64) {
        warn!(
            event = "worker_error",
            worker.id = worker_id,
            worker.error = error,
            worker.backoff_ms = backoff_ms,
            "Worker loop error, backing off"
        );
    }

    pub fn log_store_error(operation: &str, task_id: Option<&str>, error: &str) {
        error!(
            event = "store_error",
            store.operation = operation,
            task.id = task_id.unwrap_or("-"),
            store.error = error,
            "Task store operation failed"
        );
    }
}
