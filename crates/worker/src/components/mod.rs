pub mod task_execution;
pub mod worker_lifecycle;
pub mod worker_pool;

use std::sync::Arc;

use scheduler_core::{ActiveTaskSet, ExecutionQueue, StatsTracker};
use scheduler_domain::{ContentPipeline, TaskStore};
use scheduler_infrastructure::MetricsCollector;

pub use task_execution::{ExecutionOutcome, TaskExecutionManager};
pub use worker_lifecycle::ContentWorker;
pub use worker_pool::{WorkerPool, WorkerPoolConfig};

/// 所有 worker 共享的依赖
#[derive(Clone)]
pub struct WorkerContext {
    pub active: Arc<ActiveTaskSet>,
    pub queue: Arc<ExecutionQueue>,
    pub store: Arc<dyn TaskStore>,
    pub pipeline: Arc<dyn ContentPipeline>,
    pub stats: Arc<StatsTracker>,
    pub metrics: Arc<MetricsCollector>,
}
