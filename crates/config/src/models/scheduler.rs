use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 调度循环、worker 池和门面的运行参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub worker_count: usize,
    pub tick_interval_ms: u64,
    pub dequeue_timeout_ms: u64,
    pub worker_error_backoff_ms: u64,
    pub initial_batch_size: usize,
    pub upcoming_limit: usize,
    pub shutdown_timeout_seconds: u64,
    pub metrics_history_limit: usize,
    /// 频道已有未来的自动生成任务时跳过本轮循环生成
    pub recurring_dedupe: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            tick_interval_ms: 60_000,
            dequeue_timeout_ms: 30_000,
            worker_error_backoff_ms: 5_000,
            initial_batch_size: 5,
            upcoming_limit: 10,
            shutdown_timeout_seconds: 30,
            metrics_history_limit: 50,
            recurring_dedupe: false,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_count == 0 {
            return Err(anyhow::anyhow!("Worker数量必须大于0"));
        }
        if self.tick_interval_ms == 0 {
            return Err(anyhow::anyhow!("调度间隔必须大于0"));
        }
        if self.dequeue_timeout_ms == 0 {
            return Err(anyhow::anyhow!("出队超时时间必须大于0"));
        }
        if self.initial_batch_size == 0 {
            return Err(anyhow::anyhow!("首批任务数量必须大于0"));
        }
        if self.upcoming_limit == 0 {
            return Err(anyhow::anyhow!("即将执行任务列表长度必须大于0"));
        }
        if self.shutdown_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("关闭超时时间必须大于0"));
        }
        if self.metrics_history_limit == 0 {
            return Err(anyhow::anyhow!("历史指标条数必须大于0"));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn worker_error_backoff(&self) -> Duration {
        Duration::from_millis(self.worker_error_backoff_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}
