use std::sync::Arc;

use chrono::{DateTime, Utc};
use scheduler_config::SchedulerConfig;
use scheduler_core::{
    ActiveTaskSet, CancelOutcome, ChannelRegistry, ExecutionQueue, RescheduleOutcome,
    StatsTracker,
};
use scheduler_dispatcher::{RecurringTaskManager, SchedulingLoop};
use scheduler_domain::{
    ContentPipeline, ContentTask, IdeaGenerator, MetricScope, OptimizationReport,
    ScheduleOptimizer, ScheduleSummary, SchedulerStats, SchedulingConfig, TaskStatus, TaskStore,
    META_BATCH_ID, META_BATCH_INDEX, META_EXPECTED_VIEWS,
};
use scheduler_errors::{SchedulerError, SchedulerResult};
use scheduler_infrastructure::{MetricsCollector, StructuredLogger};
use scheduler_worker::{WorkerContext, WorkerPool, WorkerPoolConfig};
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct LoopHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// shutdown 的执行结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// 已停止的 worker 数
    pub workers_stopped: usize,
    /// 从队列退回 scheduled 的任务数
    pub tasks_returned: usize,
}

/// 内容调度器
///
/// 组合调度循环、worker 池和循环任务管理器，对外提供调度、取消、改期、
/// 统计、健康检查和生命周期操作。构造一次后以 `Arc` 共享。
pub struct ContentScheduler {
    config: SchedulerConfig,
    store: Arc<dyn TaskStore>,
    ideas: Arc<dyn IdeaGenerator>,
    active: Arc<ActiveTaskSet>,
    queue: Arc<ExecutionQueue>,
    registry: Arc<ChannelRegistry>,
    stats: Arc<StatsTracker>,
    metrics: Arc<MetricsCollector>,
    workers: WorkerPool,
    scheduling_loop: Mutex<Option<LoopHandle>>,
}

impl ContentScheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn TaskStore>,
        ideas: Arc<dyn IdeaGenerator>,
        pipeline: Arc<dyn ContentPipeline>,
    ) -> Self {
        let active = Arc::new(ActiveTaskSet::new());
        let queue = Arc::new(ExecutionQueue::new());
        let stats = Arc::new(StatsTracker::new());
        let metrics = Arc::new(MetricsCollector::new());

        let workers = WorkerPool::new(
            WorkerContext {
                active: active.clone(),
                queue: queue.clone(),
                store: store.clone(),
                pipeline,
                stats: stats.clone(),
                metrics: metrics.clone(),
            },
            WorkerPoolConfig {
                worker_count: config.worker_count,
                dequeue_timeout: config.dequeue_timeout(),
                error_backoff: config.worker_error_backoff(),
            },
        );

        Self {
            config,
            store,
            ideas,
            active,
            queue,
            registry: Arc::new(ChannelRegistry::new()),
            stats,
            metrics,
            workers,
            scheduling_loop: Mutex::new(None),
        }
    }

    /// 加载待执行任务，启动 worker 池和调度循环
    ///
    /// 只有 worker 池启动失败会返回错误，存储读取失败只记录日志。
    pub async fn initialize(&self) -> SchedulerResult<()> {
        let mut scheduling_loop = self.scheduling_loop.lock().await;
        if scheduling_loop.is_some() {
            warn!("调度器已经初始化，忽略重复调用");
            return Ok(());
        }

        info!("初始化内容调度器");
        self.load_scheduled_tasks().await;

        self.queue.reopen();
        let worker_ids = self.workers.start().await?;
        info!("已启动 {} 个worker: {:?}", worker_ids.len(), worker_ids);

        let recurring = RecurringTaskManager::new(
            self.registry.clone(),
            self.active.clone(),
            self.store.clone(),
            self.ideas.clone(),
            self.metrics.clone(),
        )
        .with_dedupe(self.config.recurring_dedupe);
        let runner = SchedulingLoop::new(
            self.active.clone(),
            self.queue.clone(),
            self.store.clone(),
            recurring,
            self.metrics.clone(),
            self.config.tick_interval(),
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(runner.run(shutdown_rx));
        *scheduling_loop = Some(LoopHandle {
            shutdown_tx,
            handle,
        });

        info!(
            "内容调度器已启动，调度间隔 {}ms",
            self.config.tick_interval_ms
        );
        Ok(())
    }

    async fn load_scheduled_tasks(&self) {
        match self.store.list_tasks(Some(TaskStatus::Scheduled)).await {
            Ok(tasks) => {
                let mut loaded = 0;
                for task in tasks {
                    if self.active.insert(task).await {
                        loaded += 1;
                    }
                }
                info!("从存储加载了 {} 个待执行任务", loaded);
            }
            Err(e) => {
                StructuredLogger::log_store_error("list_tasks", None, &e.to_string());
            }
        }
        self.metrics.update_active_tasks(self.active.len().await);
    }

    /// 保存频道的调度配置并创建首批任务
    ///
    /// 第 `i` 个任务排在 `now + i * 频率间隔`。配置同时成为该频道的循环策略，
    /// 覆盖之前的配置。
    pub async fn schedule_content(
        &self,
        channel_id: &str,
        config: SchedulingConfig,
    ) -> SchedulerResult<ScheduleSummary> {
        if channel_id.trim().is_empty() {
            return Err(SchedulerError::validation_error("频道ID不能为空"));
        }
        config.validate()?;

        if self.registry.upsert(channel_id, config.clone()).await.is_some() {
            info!("频道 {} 的调度配置已更新", channel_id);
        }

        let ideas = self
            .ideas
            .generate_ideas(&config.category, self.config.initial_batch_size)
            .await?;
        if ideas.is_empty() {
            warn!("频道 {} 没有生成任何内容创意", channel_id);
        }

        let batch_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let offset = config.frequency.offset();
        let mut tasks = Vec::with_capacity(ideas.len());

        for (index, idea) in ideas.into_iter().enumerate() {
            let task = ContentTask::new(
                channel_id,
                idea.title,
                config.category.clone(),
                config.frequency,
                config.target_views,
                now + offset * index as i32,
            )
            .with_metadata(META_BATCH_ID, json!(batch_id))
            .with_metadata(META_BATCH_INDEX, json!(index))
            .with_metadata(META_EXPECTED_VIEWS, json!(idea.expected_views));

            if let Err(e) = self.store.save_task(&task).await {
                StructuredLogger::log_store_error(
                    "save_task",
                    Some(&task.task_id),
                    &e.to_string(),
                );
            }
            self.active.insert(task.clone()).await;
            StructuredLogger::log_task_scheduled(&task);
            tasks.push(task);
        }

        self.metrics.update_active_tasks(self.active.len().await);
        Ok(ScheduleSummary::new(channel_id, tasks))
    }

    /// 从存储查询任务，可按频道和状态过滤
    pub async fn get_scheduled_tasks(
        &self,
        channel_id: Option<&str>,
        status: Option<TaskStatus>,
    ) -> SchedulerResult<Vec<ContentTask>> {
        let tasks = self.store.list_tasks(status).await?;
        Ok(match channel_id {
            Some(channel_id) => tasks
                .into_iter()
                .filter(|t| t.channel_id == channel_id)
                .collect(),
            None => tasks,
        })
    }

    /// 取消尚未开始执行的任务
    pub async fn cancel_task(&self, task_id: &str) -> bool {
        let _persist = self.active.persist_guard().await;
        match self.active.cancel(task_id).await {
            CancelOutcome::Cancelled(_) => {
                if let Err(e) = self
                    .store
                    .update_task_status(task_id, TaskStatus::Cancelled, None)
                    .await
                {
                    StructuredLogger::log_store_error(
                        "update_task_status",
                        Some(task_id),
                        &e.to_string(),
                    );
                }
                StructuredLogger::log_task_cancelled(task_id);
                self.metrics.update_active_tasks(self.active.len().await);
                true
            }
            CancelOutcome::AlreadyExecuting => {
                warn!("任务 {} 正在执行，无法取消", task_id);
                false
            }
            CancelOutcome::NotFound => {
                debug!("取消失败，任务 {} 不在活跃集合中", task_id);
                false
            }
        }
    }

    /// 修改任务的计划时间并重置为 scheduled，由下一次调度循环重新评估
    pub async fn reschedule_task(&self, task_id: &str, new_time: DateTime<Utc>) -> bool {
        let _persist = self.active.persist_guard().await;
        match self.active.reschedule(task_id, new_time).await {
            RescheduleOutcome::Rescheduled(task) => {
                if let Err(e) = self.store.save_task(&task).await {
                    StructuredLogger::log_store_error("save_task", Some(task_id), &e.to_string());
                }
                StructuredLogger::log_task_rescheduled(task_id, new_time);
                true
            }
            RescheduleOutcome::AlreadyExecuting => {
                warn!("任务 {} 正在执行，无法改期", task_id);
                false
            }
            RescheduleOutcome::NotFound => {
                debug!("改期失败，任务 {} 不在活跃集合中", task_id);
                false
            }
        }
    }

    pub async fn get_scheduler_stats(&self) -> SchedulerStats {
        SchedulerStats {
            is_running: self.is_running().await,
            status_counts: self.active.status_summary().await,
            upcoming_tasks: self.active.upcoming(self.config.upcoming_limit).await,
            queue_depth: self.queue.depth(),
            worker_count: self.workers.worker_count().await,
            execution: self.stats.snapshot().await,
            configured_channels: self.registry.len().await,
        }
    }

    /// 根据频道的历史表现给出调度建议，没有历史数据时返回 `no_data`
    pub async fn optimize_schedule(&self, channel_id: &str) -> SchedulerResult<OptimizationReport> {
        let history = self
            .store
            .get_performance_metrics(
                MetricScope::Channel,
                channel_id,
                self.config.metrics_history_limit,
            )
            .await?;
        let current = self.registry.get(channel_id).await;
        let report = ScheduleOptimizer::analyze(channel_id, current.as_ref(), &history);
        debug!(
            "频道 {} 的优化分析完成，样本 {} 条，建议 {} 条",
            channel_id,
            report.sample_size,
            report.suggestions.len()
        );
        Ok(report)
    }

    /// 调度循环在运行，且所有 worker 都存活
    pub async fn health_check(&self) -> bool {
        self.is_running().await && self.workers.all_alive().await
    }

    pub async fn is_running(&self) -> bool {
        self.scheduling_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|l| !l.handle.is_finished())
    }

    /// 活跃集合中的任务
    pub async fn get_active_task(&self, task_id: &str) -> Option<ContentTask> {
        self.active.get(task_id).await
    }

    /// 停止调度循环和 worker，把仍在队列中的任务退回 scheduled
    ///
    /// 正在执行的任务会等待完成，超过 `shutdown_timeout_seconds` 的 worker 被中止，
    /// 它们手上的任务记为失败。
    pub async fn shutdown(&self) -> SchedulerResult<ShutdownReport> {
        info!("开始关闭内容调度器");

        if let Some(LoopHandle {
            shutdown_tx,
            handle,
        }) = self.scheduling_loop.lock().await.take()
        {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                warn!("调度循环退出异常: {}", e);
            }
        }

        let workers_stopped = self.workers.stop(self.config.shutdown_timeout()).await;
        self.queue.close();

        let mut tasks_returned = 0;
        for task in self.queue.drain().await {
            let _persist = self.active.persist_guard().await;
            if self.active.revert_to_scheduled(&task.task_id).await.is_none() {
                continue;
            }
            tasks_returned += 1;
            if let Err(e) = self
                .store
                .update_task_status(&task.task_id, TaskStatus::Scheduled, None)
                .await
            {
                StructuredLogger::log_store_error(
                    "update_task_status",
                    Some(&task.task_id),
                    &e.to_string(),
                );
            }
        }
        self.metrics.update_queue_depth(self.queue.depth());

        info!(
            "内容调度器已关闭: 停止 {} 个worker，{} 个排队任务退回待执行",
            workers_stopped, tasks_returned
        );
        Ok(ShutdownReport {
            workers_stopped,
            tasks_returned,
        })
    }
}
