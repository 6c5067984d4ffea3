use std::sync::Arc;

use chrono::{DateTime, Utc};
use scheduler_core::{ActiveTaskSet, ChannelRegistry};
use scheduler_domain::{
    ContentTask, IdeaGenerator, SchedulingConfig, TaskStore, META_AUTO_GENERATED,
    META_EXPECTED_VIEWS,
};
use scheduler_errors::SchedulerResult;
use scheduler_infrastructure::{MetricsCollector, StructuredLogger};
use serde_json::json;
use tracing::{debug, warn};

/// 循环任务管理器
///
/// 每次调度扫描调用一次，为每个配置了调度策略的频道生成下一期任务。
/// 由调度循环驱动，自身不持有定时器，也不会并发执行。
pub struct RecurringTaskManager {
    registry: Arc<ChannelRegistry>,
    active: Arc<ActiveTaskSet>,
    store: Arc<dyn TaskStore>,
    ideas: Arc<dyn IdeaGenerator>,
    metrics: Arc<MetricsCollector>,
    /// 频道已有待执行的自动任务时不再生成
    dedupe: bool,
}

impl RecurringTaskManager {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        active: Arc<ActiveTaskSet>,
        store: Arc<dyn TaskStore>,
        ideas: Arc<dyn IdeaGenerator>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry,
            active,
            store,
            ideas,
            metrics,
            dedupe: false,
        }
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// 处理所有频道，返回本次新建的任务
    ///
    /// 单个频道的失败只记录日志，不影响其他频道。
    pub async fn process(&self, now: DateTime<Utc>) -> Vec<ContentTask> {
        let mut created = Vec::new();

        for (channel_id, config) in self.registry.snapshot().await {
            match self.create_next(&channel_id, &config, now).await {
                Ok(Some(task)) => created.push(task),
                Ok(None) => {}
                Err(e) => warn!("频道 {} 生成循环任务失败: {}", channel_id, e),
            }
        }

        if !created.is_empty() {
            self.metrics.record_recurring_created(created.len());
        }
        created
    }

    async fn create_next(
        &self,
        channel_id: &str,
        config: &SchedulingConfig,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Option<ContentTask>> {
        if self.dedupe && self.active.has_pending_auto_task(channel_id, now).await {
            debug!("频道 {} 已有待执行的自动任务，跳过", channel_id);
            return Ok(None);
        }

        let next_time = now + config.frequency.offset();
        let ideas = self.ideas.generate_ideas(&config.category, 1).await?;
        let Some(idea) = ideas.into_iter().next() else {
            debug!("分类 {} 没有可用选题，频道 {} 本轮跳过", config.category, channel_id);
            return Ok(None);
        };

        let task = ContentTask::new(
            channel_id,
            idea.title,
            config.category.clone(),
            config.frequency,
            config.target_views,
            next_time,
        )
        .with_metadata(META_AUTO_GENERATED, json!(true))
        .with_metadata(META_EXPECTED_VIEWS, json!(idea.expected_views));

        if let Err(e) = self.store.save_task(&task).await {
            StructuredLogger::log_store_error("save_task", Some(&task.task_id), &e.to_string());
        }
        self.active.insert(task.clone()).await;
        StructuredLogger::log_recurring_task_created(&task);
        Ok(Some(task))
    }
}
