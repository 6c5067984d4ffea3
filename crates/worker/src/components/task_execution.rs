use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use scheduler_domain::{ContentTask, PipelineContext, TaskResult, TaskStatus};
use scheduler_errors::{SchedulerError, SchedulerResult};
use scheduler_infrastructure::StructuredLogger;
use serde_json::Value;
use tracing::{debug, info};

use super::WorkerContext;

/// 单个任务的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub task_id: String,
    pub success: bool,
    pub elapsed: Duration,
    pub error: Option<String>,
}

/// 执行一个已被认领（executing）的任务
///
/// 任务级错误（频道配置缺失、流水线失败或崩溃）只让这一个任务失败，
/// 返回 `Err` 的只有 worker 自身的异常。
pub struct TaskExecutionManager {
    worker_id: String,
    ctx: WorkerContext,
}

impl TaskExecutionManager {
    pub fn new(worker_id: impl Into<String>, ctx: WorkerContext) -> Self {
        Self {
            worker_id: worker_id.into(),
            ctx,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub async fn execute(&self, task: ContentTask) -> SchedulerResult<ExecutionOutcome> {
        let task_id = task.task_id.clone();

        if let Err(e) = self
            .ctx
            .store
            .update_task_status(&task_id, TaskStatus::Executing, None)
            .await
        {
            StructuredLogger::log_store_error("update_task_status", Some(&task_id), &e.to_string());
        }
        StructuredLogger::log_task_execution_start(&task, &self.worker_id);

        let start_time = Instant::now();
        let result = self.run_pipeline(&task).await;
        let elapsed = start_time.elapsed();

        // 无论结果如何都移出活跃集合，历史由存储保留
        self.ctx.active.remove(&task_id).await;

        let (status, task_result, error) = match result {
            Ok(artifacts) => (TaskStatus::Completed, TaskResult::Artifacts(artifacts), None),
            Err(e) => {
                let message = failure_message(&e);
                (
                    TaskStatus::Failed,
                    TaskResult::Error(message.clone()),
                    Some(message),
                )
            }
        };
        let success = status == TaskStatus::Completed;

        let mut finished = task;
        finished.transition_to(status)?;
        finished.apply_result(&task_result);

        if let Err(e) = self
            .ctx
            .store
            .update_task_status(&task_id, status, Some(task_result))
            .await
        {
            StructuredLogger::log_store_error("update_task_status", Some(&task_id), &e.to_string());
        }

        let stats = self.ctx.stats.record(success, elapsed).await;
        self.ctx
            .metrics
            .record_task_execution(success, elapsed.as_secs_f64());
        StructuredLogger::log_task_execution_complete(
            &finished,
            &self.worker_id,
            success,
            elapsed.as_millis() as u64,
            error.as_deref(),
        );
        debug!(
            "执行统计: 共 {} 次, 失败 {} 次, 成功率 {:.2}",
            stats.total_executed, stats.total_failed, stats.success_rate
        );

        Ok(ExecutionOutcome {
            task_id,
            success,
            elapsed,
            error,
        })
    }

    async fn run_pipeline(&self, task: &ContentTask) -> SchedulerResult<HashMap<String, Value>> {
        let channel = self
            .ctx
            .store
            .get_channel_config(&task.channel_id)
            .await?
            .ok_or_else(|| SchedulerError::channel_config_missing(&task.channel_id))?;

        let context = PipelineContext {
            task: task.clone(),
            channel,
        };

        let outcome = AssertUnwindSafe(self.ctx.pipeline.execute_full_pipeline(&context))
            .catch_unwind()
            .await
            .map_err(|payload| SchedulerError::PipelinePanicked(panic_message(payload)))??;

        if outcome.success {
            info!("任务 {} 内容生成成功", task.task_id);
            Ok(outcome.artifacts)
        } else {
            Err(SchedulerError::execution_error(
                outcome
                    .error
                    .unwrap_or_else(|| "pipeline reported failure".to_string()),
            ))
        }
    }
}

/// 记录到任务上的错误文本，流水线给出的错误原样保留
fn failure_message(error: &SchedulerError) -> String {
    match error {
        SchedulerError::TaskExecution(message) => message.clone(),
        other => other.to_string(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
