use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use scheduler_domain::{ContentPipeline, PipelineContext, PipelineOutcome};
use scheduler_errors::SchedulerResult;
use serde_json::json;
use tracing::info;

/// 演练流水线：等待固定时长后返回模拟产物，不做任何真实生成
#[derive(Debug, Clone)]
pub struct DryRunPipeline {
    delay: Duration,
}

impl DryRunPipeline {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ContentPipeline for DryRunPipeline {
    async fn execute_full_pipeline(&self, context: &PipelineContext) -> SchedulerResult<PipelineOutcome> {
        let task = &context.task;
        info!(
            "演练生成内容: 频道 {} ({}), 标题 \"{}\"",
            context.channel.name, task.channel_id, task.title
        );
        tokio::time::sleep(self.delay).await;

        let mut artifacts = HashMap::new();
        artifacts.insert(
            "video_path".to_string(),
            json!(format!("dry-run/{}/{}.mp4", task.channel_id, task.task_id)),
        );
        artifacts.insert("title".to_string(), json!(task.title));
        artifacts.insert("language".to_string(), json!(context.channel.language));
        artifacts.insert("dry_run".to_string(), json!(true));
        Ok(PipelineOutcome::succeeded(artifacts))
    }
}
