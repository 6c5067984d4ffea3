use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use scheduler_config::AppConfig;
use scheduler_domain::{ChannelConfig, SchedulingConfig, TaskStore};
use scheduler_infrastructure::{DryRunPipeline, InMemoryTaskStore, ThemeIdeaGenerator};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::scheduler::{ContentScheduler, ShutdownReport};

/// 嵌入式应用
///
/// 内存存储 + 模板选题 + 演练流水线，全部组件跑在同一个进程里。
pub struct Application {
    config: AppConfig,
    store: Arc<InMemoryTaskStore>,
    scheduler: Arc<ContentScheduler>,
    schedules: Vec<(String, SchedulingConfig)>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        let store = Arc::new(InMemoryTaskStore::new());
        for channel_id in &config.embedded.channels {
            store
                .save_channel_config(ChannelConfig::new(channel_id.as_str(), channel_id.as_str()))
                .await;
        }

        let pipeline = DryRunPipeline::new(Duration::from_millis(config.embedded.dry_run_delay_ms));
        let scheduler = Arc::new(ContentScheduler::new(
            config.scheduler.clone(),
            store.clone(),
            Arc::new(ThemeIdeaGenerator::default()),
            Arc::new(pipeline),
        ));

        info!(
            "嵌入式应用已创建，预注册 {} 个频道",
            config.embedded.channels.len()
        );
        Ok(Self {
            config,
            store,
            scheduler,
            schedules: Vec::new(),
        })
    }

    /// 启动后为 `channel_id` 安排首批内容
    pub fn with_schedule(mut self, channel_id: impl Into<String>, config: SchedulingConfig) -> Self {
        self.schedules.push((channel_id.into(), config));
        self
    }

    pub fn scheduler(&self) -> Arc<ContentScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn store(&self) -> Arc<InMemoryTaskStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 运行直到收到关闭信号，然后关闭调度器
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<ShutdownReport> {
        self.scheduler
            .initialize()
            .await
            .context("调度器启动失败")?;

        for (channel_id, config) in &self.schedules {
            if !matches!(self.store.get_channel_config(channel_id).await, Ok(Some(_))) {
                self.store
                    .save_channel_config(ChannelConfig::new(channel_id.as_str(), channel_id.as_str()))
                    .await;
            }
            match self
                .scheduler
                .schedule_content(channel_id, config.clone())
                .await
            {
                Ok(summary) => info!(
                    "频道 {} 已安排 {} 个任务，最早 {:?}",
                    channel_id, summary.count, summary.next_scheduled_time
                ),
                Err(e) => error!("频道 {} 安排内容失败: {}", channel_id, e),
            }
        }

        let _ = shutdown_rx.recv().await;
        info!("应用收到关闭信号");

        let report = self.scheduler.shutdown().await?;
        let stats = self.scheduler.get_scheduler_stats().await;
        info!(
            "执行统计: 成功 {}，失败 {}，成功率 {:.2}",
            stats.execution.total_scheduled, stats.execution.total_failed, stats.execution.success_rate
        );
        Ok(report)
    }
}
