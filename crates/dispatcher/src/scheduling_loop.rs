use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use scheduler_core::{ActiveTaskSet, ExecutionQueue};
use scheduler_domain::{TaskStatus, TaskStore};
use scheduler_infrastructure::{MetricsCollector, StructuredLogger};
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

use crate::recurring::RecurringTaskManager;

/// 一次调度扫描的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// 从 scheduled 切换为 queued 的任务数
    pub promoted: usize,
    pub enqueued: usize,
    /// 入队失败并退回 scheduled 的任务数
    pub requeue_deferred: usize,
    pub recurring_created: usize,
}

/// 调度循环
///
/// 按固定间隔把到期任务送入执行队列，然后触发一次循环任务生成。
/// 单个任务或循环任务的失败只记录日志，不会中止本轮扫描或后续扫描。
pub struct SchedulingLoop {
    active: Arc<ActiveTaskSet>,
    queue: Arc<ExecutionQueue>,
    store: Arc<dyn TaskStore>,
    recurring: RecurringTaskManager,
    metrics: Arc<MetricsCollector>,
    tick_interval: Duration,
}

impl SchedulingLoop {
    pub fn new(
        active: Arc<ActiveTaskSet>,
        queue: Arc<ExecutionQueue>,
        store: Arc<dyn TaskStore>,
        recurring: RecurringTaskManager,
        metrics: Arc<MetricsCollector>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            active,
            queue,
            store,
            recurring,
            metrics,
            tick_interval,
        }
    }

    /// 执行一次扫描
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let span = tracing::info_span!("scheduling_tick", now = %now);
        self.scan_and_enqueue(now).instrument(span).await
    }

    async fn scan_and_enqueue(&self, now: DateTime<Utc>) -> TickReport {
        let start_time = Instant::now();
        let mut report = TickReport::default();

        let due = self.active.promote_due(now).await;
        report.promoted = due.len();

        for task in due {
            let task_id = task.task_id.clone();
            if !self.persist_queued(&task_id).await {
                debug!("任务 {} 在入队前已被取消或改期", task_id);
                continue;
            }

            match self.queue.enqueue(task) {
                Ok(()) => {
                    report.enqueued += 1;
                    if let Some(task) = self.active.get(&task_id).await {
                        StructuredLogger::log_task_promoted(&task);
                    }
                }
                Err(e) => {
                    warn!("任务 {} 入队失败，退回 scheduled: {}", task_id, e);
                    report.requeue_deferred += 1;
                    let _persist = self.active.persist_guard().await;
                    if self.active.revert_to_scheduled(&task_id).await.is_some() {
                        if let Err(e) = self
                            .store
                            .update_task_status(&task_id, TaskStatus::Scheduled, None)
                            .await
                        {
                            StructuredLogger::log_store_error(
                                "update_task_status",
                                Some(&task_id),
                                &e.to_string(),
                            );
                        }
                    }
                }
            }
        }

        report.recurring_created = self.recurring.process(now).await.len();

        let duration = start_time.elapsed().as_secs_f64();
        self.metrics.record_tick(report.promoted, duration);
        self.metrics.update_queue_depth(self.queue.depth());
        self.metrics.update_active_tasks(self.active.len().await);

        if report.promoted > 0 || report.recurring_created > 0 {
            info!(
                "调度扫描完成: 入队 {} 个任务, 新建 {} 个循环任务, 耗时 {:.3}s",
                report.enqueued, report.recurring_created, duration
            );
        } else {
            debug!("调度扫描完成: 没有到期任务");
        }
        report
    }

    /// 任务仍是 queued 时持久化 queued，先于入队，worker 写入的 executing 不会被覆盖
    ///
    /// 提升之后被取消或改期的任务返回 false，存储保留取消或改期写入的状态。
    async fn persist_queued(&self, task_id: &str) -> bool {
        let _persist = self.active.persist_guard().await;
        if self.active.status_of(task_id).await != Some(TaskStatus::Queued) {
            return false;
        }
        if let Err(e) = self
            .store
            .update_task_status(task_id, TaskStatus::Queued, None)
            .await
        {
            StructuredLogger::log_store_error("update_task_status", Some(task_id), &e.to_string());
        }
        true
    }

    /// 持续运行直到收到关闭信号
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("调度循环已启动，扫描间隔 {:?}", self.tick_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("调度循环收到关闭信号");
                    break;
                }
            }
        }

        info!("调度循环已停止");
    }
}
