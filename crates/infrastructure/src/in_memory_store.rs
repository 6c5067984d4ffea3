use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use scheduler_domain::{
    ChannelConfig, ContentTask, MetricScope, PerformanceMetric, TaskResult, TaskStatus, TaskStore,
};
use scheduler_errors::{SchedulerError, SchedulerResult};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 内存任务存储
///
/// 嵌入式模式和测试使用。保存全部任务历史（包括终态任务）、
/// 频道配置和表现指标，进程退出后数据丢失。
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, ContentTask>>,
    channels: RwLock<HashMap<String, ChannelConfig>>,
    metrics: RwLock<Vec<PerformanceMetric>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save_channel_config(&self, config: ChannelConfig) {
        info!("注册频道配置: {}", config.channel_id);
        self.channels
            .write()
            .await
            .insert(config.channel_id.clone(), config);
    }

    pub async fn record_metric(&self, metric: PerformanceMetric) {
        self.metrics.write().await.push(metric);
    }

    pub async fn get_task(&self, task_id: &str) -> Option<ContentTask> {
        self.tasks.read().await.get(task_id).cloned()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> SchedulerResult<Vec<ContentTask>> {
        let tasks = self.tasks.read().await;
        let mut listed: Vec<ContentTask> = tasks
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            a.scheduled_time
                .cmp(&b.scheduled_time)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        Ok(listed)
    }

    async fn save_task(&self, task: &ContentTask) -> SchedulerResult<()> {
        debug!("保存任务 {} ({})", task.task_id, task.status);
        self.tasks
            .write()
            .await
            .insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        result: Option<TaskResult>,
    ) -> SchedulerResult<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| SchedulerError::task_not_found(task_id))?;
        task.status = status;
        task.updated_at = Utc::now();
        if let Some(result) = result {
            task.apply_result(&result);
        }
        Ok(())
    }

    async fn get_channel_config(&self, channel_id: &str) -> SchedulerResult<Option<ChannelConfig>> {
        Ok(self.channels.read().await.get(channel_id).cloned())
    }

    async fn get_performance_metrics(
        &self,
        scope: MetricScope,
        id: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<PerformanceMetric>> {
        let metrics = self.metrics.read().await;
        let mut matched: Vec<PerformanceMetric> = metrics
            .iter()
            .filter(|m| match scope {
                MetricScope::Channel => m.channel_id == id,
                MetricScope::Category => m.category == id,
            })
            .cloned()
            .collect();
        // 最近发布的优先
        matched.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        matched.truncate(limit);
        Ok(matched)
    }
}
