use std::time::Duration;

use scheduler_core::Dequeued;
use scheduler_domain::ContentTask;
use scheduler_errors::{SchedulerError, SchedulerResult};
use scheduler_infrastructure::StructuredLogger;
use tokio::sync::broadcast;
use tracing::{debug, info, Instrument};

use super::{TaskExecutionManager, WorkerContext};

/// 单个 worker
///
/// 带超时地从执行队列取任务，超时只是检查关闭信号的机会。
/// 收到关闭信号后会先完成手上的任务再退出。
pub struct ContentWorker {
    worker_id: String,
    ctx: WorkerContext,
    executor: TaskExecutionManager,
    dequeue_timeout: Duration,
    error_backoff: Duration,
}

impl ContentWorker {
    pub fn new(
        worker_id: impl Into<String>,
        ctx: WorkerContext,
        dequeue_timeout: Duration,
        error_backoff: Duration,
    ) -> Self {
        let worker_id = worker_id.into();
        Self {
            executor: TaskExecutionManager::new(worker_id.clone(), ctx.clone()),
            worker_id,
            ctx,
            dequeue_timeout,
            error_backoff,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Worker {} 已启动", self.worker_id);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Worker {} 收到关闭信号", self.worker_id);
                    break;
                }
                dequeued = self.ctx.queue.dequeue_timeout(self.dequeue_timeout) => {
                    let result = match dequeued {
                        Dequeued::Task(task) => self.process(task).await,
                        Dequeued::Timeout => continue,
                        Dequeued::Closed => Err(SchedulerError::QueueClosed),
                    };

                    if let Err(e) = result {
                        if !self.back_off(&e, &mut shutdown_rx).await {
                            break;
                        }
                    }
                }
            }
        }

        info!("Worker {} 已停止", self.worker_id);
    }

    async fn process(&self, task: ContentTask) -> SchedulerResult<()> {
        // 取消或改期后留在队列里的旧条目直接丢弃
        let Some(claimed) = self.ctx.active.claim(&task.task_id).await else {
            debug!(
                "Worker {} 跳过不再处于 queued 的任务 {}",
                self.worker_id, task.task_id
            );
            return Ok(());
        };

        let span = tracing::info_span!(
            "execute_task",
            task.id = %claimed.task_id,
            worker.id = %self.worker_id
        );
        self.executor.execute(claimed).instrument(span).await?;
        Ok(())
    }

    /// worker 级错误：记录日志并暂停，暂停期间收到关闭信号返回 false
    async fn back_off(&self, error: &SchedulerError, shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
        self.ctx.metrics.record_worker_error();
        StructuredLogger::log_worker_error(
            &self.worker_id,
            &error.to_string(),
            self.error_backoff.as_millis() as u64,
        );

        tokio::select! {
            _ = tokio::time::sleep(self.error_backoff) => true,
            _ = shutdown_rx.recv() => {
                info!("Worker {} 在退避期间收到关闭信号", self.worker_id);
                false
            }
        }
    }
}
