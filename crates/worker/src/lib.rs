pub mod components;

pub use components::{
    ContentWorker, ExecutionOutcome, TaskExecutionManager, WorkerContext, WorkerPool,
    WorkerPoolConfig,
};
