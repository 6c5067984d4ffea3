//! # 调度核心
//!
//! 调度循环、worker 池和门面共享的运行时状态：活跃任务集合、执行队列、
//! 频道策略表和执行统计。

pub mod active_set;
pub mod queue;
pub mod registry;
pub mod stats;

pub use active_set::{ActiveTaskSet, CancelOutcome, RescheduleOutcome};
pub use queue::{Dequeued, ExecutionQueue};
pub use registry::ChannelRegistry;
pub use stats::StatsTracker;
