use std::time::Duration;

use chrono::Utc;
use scheduler_domain::{TaskResult, TaskStatus};
use scheduler_errors::{SchedulerError, SchedulerResult};
use scheduler_infrastructure::StructuredLogger;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{ContentWorker, WorkerContext};

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub worker_count: usize,
    pub dequeue_timeout: Duration,
    pub error_backoff: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            dequeue_timeout: Duration::from_secs(30),
            error_backoff: Duration::from_secs(5),
        }
    }
}

struct WorkerHandle {
    worker_id: String,
    handle: JoinHandle<()>,
}

/// 固定数量的 worker，同时执行的任务数不会超过 `worker_count`
pub struct WorkerPool {
    ctx: WorkerContext,
    config: WorkerPoolConfig,
    workers: Mutex<Vec<WorkerHandle>>,
    shutdown_tx: Mutex<Option<broadcast::Sender<()>>>,
}

impl WorkerPool {
    pub fn new(ctx: WorkerContext, config: WorkerPoolConfig) -> Self {
        Self {
            ctx,
            config,
            workers: Mutex::new(Vec::new()),
            shutdown_tx: Mutex::new(None),
        }
    }

    /// 启动所有 worker，返回 worker ID
    pub async fn start(&self) -> SchedulerResult<Vec<String>> {
        if self.config.worker_count == 0 {
            return Err(SchedulerError::Startup(
                "worker数量必须大于0".to_string(),
            ));
        }

        let mut workers = self.workers.lock().await;
        if !workers.is_empty() {
            return Err(SchedulerError::Startup("worker池已经在运行".to_string()));
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());

        for index in 0..self.config.worker_count {
            let worker_id = format!("{host}-worker-{index}");
            let worker = ContentWorker::new(
                worker_id.clone(),
                self.ctx.clone(),
                self.config.dequeue_timeout,
                self.config.error_backoff,
            );
            let handle = tokio::spawn(worker.run(shutdown_tx.subscribe()));
            workers.push(WorkerHandle { worker_id, handle });
        }

        *self.shutdown_tx.lock().await = Some(shutdown_tx);
        let ids: Vec<String> = workers.iter().map(|w| w.worker_id.clone()).collect();
        info!("已启动 {} 个worker: {:?}", ids.len(), ids);
        Ok(ids)
    }

    /// 通知所有 worker 停止并等待它们完成手上的任务
    ///
    /// 超过 `timeout` 仍未退出的 worker 会被中止，它们手上的任务记为失败。
    /// 返回正常退出的数量。
    pub async fn stop(&self, timeout: Duration) -> usize {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }

        let workers: Vec<WorkerHandle> = self.workers.lock().await.drain(..).collect();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut stopped = 0;
        let mut aborted = 0;

        for WorkerHandle { worker_id, mut handle } in workers {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => stopped += 1,
                Ok(Err(e)) => error!("Worker {} 异常退出: {}", worker_id, e),
                Err(_) => {
                    warn!("Worker {} 在 {:?} 内未能停止，强制中止", worker_id, timeout);
                    handle.abort();
                    // 等待中止生效，之后不会再有写入
                    let _ = handle.await;
                    aborted += 1;
                }
            }
        }

        if aborted > 0 {
            self.fail_abandoned_tasks().await;
        }

        info!("worker池已停止，{} 个worker正常退出", stopped);
        stopped
    }

    /// 被中止的 worker 没有机会写入终态，这里把仍处于 executing 的任务记为失败
    async fn fail_abandoned_tasks(&self) {
        let error = SchedulerError::TransientWorker("worker在关闭超时后被中止".to_string());
        let message = error.to_string();

        for mut task in self.ctx.active.take_executing().await {
            let elapsed = (Utc::now() - task.updated_at).to_std().unwrap_or_default();
            let result = TaskResult::Error(message.clone());
            if let Err(e) = task.transition_to(TaskStatus::Failed) {
                warn!("任务 {} 无法记为失败: {}", task.task_id, e);
            }
            task.apply_result(&result);

            if let Err(e) = self
                .ctx
                .store
                .update_task_status(&task.task_id, TaskStatus::Failed, Some(result))
                .await
            {
                StructuredLogger::log_store_error(
                    "update_task_status",
                    Some(&task.task_id),
                    &e.to_string(),
                );
            }

            self.ctx.stats.record(false, elapsed).await;
            self.ctx
                .metrics
                .record_task_execution(false, elapsed.as_secs_f64());
            StructuredLogger::log_task_execution_complete(
                &task,
                "worker-pool",
                false,
                elapsed.as_millis() as u64,
                Some(&message),
            );
        }
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// 至少有一个 worker，且没有 worker 意外退出
    pub async fn all_alive(&self) -> bool {
        let workers = self.workers.lock().await;
        !workers.is_empty() && workers.iter().all(|w| !w.handle.is_finished())
    }
}
