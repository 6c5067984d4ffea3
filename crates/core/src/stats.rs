use std::time::Duration;

use scheduler_domain::ExecutionStats;
use tokio::sync::Mutex;

/// 执行统计
///
/// 每次执行尝试恰好记录一次。平均耗时按增量公式更新：
/// `new_avg = (old_avg * (n - 1) + elapsed) / n`。
#[derive(Debug, Default)]
pub struct StatsTracker {
    inner: Mutex<ExecutionStats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次执行，返回更新后的快照
    pub async fn record(&self, success: bool, elapsed: Duration) -> ExecutionStats {
        let mut stats = self.inner.lock().await;
        stats.total_executed += 1;
        if success {
            stats.total_scheduled += 1;
        } else {
            stats.total_failed += 1;
        }

        let n = stats.total_executed as f64;
        stats.average_execution_time =
            (stats.average_execution_time * (n - 1.0) + elapsed.as_secs_f64()) / n;

        let finished = stats.total_scheduled + stats.total_failed;
        stats.success_rate = if finished == 0 {
            0.0
        } else {
            stats.total_scheduled as f64 / finished as f64
        };
        *stats
    }

    pub async fn snapshot(&self) -> ExecutionStats {
        *self.inner.lock().await
    }
}
