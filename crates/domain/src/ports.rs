//! 外部协作者接口
//!
//! 任务存储、选题生成和内容流水线都在本子系统之外实现，这里只定义窄接口。

use async_trait::async_trait;
use scheduler_errors::SchedulerResult;

use crate::entities::{
    ChannelConfig, ContentIdea, ContentTask, MetricScope, PerformanceMetric, PipelineContext,
    PipelineOutcome, TaskResult, TaskStatus,
};

/// 任务与频道配置的持久化
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> SchedulerResult<Vec<ContentTask>>;
    /// 插入或整体覆盖任务记录
    async fn save_task(&self, task: &ContentTask) -> SchedulerResult<()>;
    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        result: Option<TaskResult>,
    ) -> SchedulerResult<()>;
    async fn get_channel_config(&self, channel_id: &str) -> SchedulerResult<Option<ChannelConfig>>;
    async fn get_performance_metrics(
        &self,
        scope: MetricScope,
        id: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<PerformanceMetric>>;
}

/// 选题生成
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    async fn generate_ideas(&self, category: &str, count: usize) -> SchedulerResult<Vec<ContentIdea>>;
}

/// 单个任务的内容生成流水线
///
/// `Ok(PipelineOutcome { success: false, .. })` 表示流水线报告失败，
/// `Err(..)` 表示流水线抛出错误，两者都会把任务标记为 failed。
#[async_trait]
pub trait ContentPipeline: Send + Sync {
    async fn execute_full_pipeline(&self, context: &PipelineContext) -> SchedulerResult<PipelineOutcome>;
}
