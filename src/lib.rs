//! 内容任务调度与执行系统
//!
//! [`ContentScheduler`] 是对外入口；[`Application`] 把它和内存存储、
//! 模板选题、演练流水线组装成可以直接运行的嵌入式应用。

pub mod app;
pub mod scheduler;
pub mod shutdown;

pub use app::Application;
pub use scheduler::{ContentScheduler, ShutdownReport};
pub use shutdown::ShutdownManager;
