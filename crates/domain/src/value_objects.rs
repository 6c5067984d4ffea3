use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{ContentTask, TaskStatus};

/// schedule_content 的返回摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub channel_id: String,
    pub count: usize,
    pub tasks: Vec<ContentTask>,
    pub next_scheduled_time: Option<DateTime<Utc>>,
}

impl ScheduleSummary {
    pub fn new(channel_id: impl Into<String>, tasks: Vec<ContentTask>) -> Self {
        let next_scheduled_time = tasks.iter().map(|t| t.scheduled_time).min();
        Self {
            channel_id: channel_id.into(),
            count: tasks.len(),
            tasks,
            next_scheduled_time,
        }
    }
}

/// 活跃任务集合中各状态的任务数
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatusSummary {
    pub scheduled: usize,
    pub queued: usize,
    pub executing: usize,
}

impl TaskStatusSummary {
    pub fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Scheduled => self.scheduled += 1,
            TaskStatus::Queued => self.queued += 1,
            TaskStatus::Executing => self.executing += 1,
            // 终态任务不会留在活跃集合中
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => {}
        }
    }

    pub fn total(&self) -> usize {
        self.scheduled + self.queued + self.executing
    }
}

/// 执行统计快照
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExecutionStats {
    /// 成功完成的任务数
    pub total_scheduled: u64,
    /// 所有执行尝试
    pub total_executed: u64,
    pub total_failed: u64,
    /// 平均执行耗时（秒）
    pub average_execution_time: f64,
    pub success_rate: f64,
}

/// get_scheduler_stats 的返回快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub is_running: bool,
    pub status_counts: TaskStatusSummary,
    pub upcoming_tasks: Vec<ContentTask>,
    pub queue_depth: usize,
    pub worker_count: usize,
    pub execution: ExecutionStats,
    pub configured_channels: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStatus {
    NoData,
    Optimized,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Timing,
    Category,
    Frequency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSuggestion {
    pub kind: SuggestionKind,
    pub recommendation: String,
    pub value: Value,
    pub rationale: String,
}

/// optimize_schedule 的结果，建议是近似的，不保证最优
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationReport {
    pub channel_id: String,
    pub status: OptimizationStatus,
    pub sample_size: usize,
    pub suggestions: Vec<ScheduleSuggestion>,
}

impl OptimizationReport {
    pub fn no_data(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            status: OptimizationStatus::NoData,
            sample_size: 0,
            suggestions: Vec::new(),
        }
    }

    pub fn suggestion(&self, kind: SuggestionKind) -> Option<&ScheduleSuggestion> {
        self.suggestions.iter().find(|s| s.kind == kind)
    }
}
