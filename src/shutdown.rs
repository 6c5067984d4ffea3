use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// 关闭信号广播
///
/// 进程入口持有一份，应用的后台部分各自 `subscribe`。信号只会发送一次，
/// 关闭之后再订阅会立即收到信号。
#[derive(Clone)]
pub struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        let rx = self.shutdown_tx.subscribe();
        if self.is_shutdown() {
            // 错过了广播，补发一个只属于这个订阅者的信号
            let (tx, rx) = broadcast::channel(1);
            let _ = tx.send(());
            return rx;
        }
        rx
    }

    /// 触发关闭，重复调用无效果
    pub fn shutdown(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            debug!("关闭信号已经发送过");
            return;
        }
        let receivers = self.shutdown_tx.send(()).unwrap_or(0);
        info!("关闭信号已发送给 {} 个订阅者", receivers);
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// 触发关闭并等待 `cleanup` 完成，超时返回 false
    pub async fn shutdown_within<F>(&self, timeout: Duration, cleanup: F) -> bool
    where
        F: Future<Output = ()>,
    {
        self.shutdown();
        match tokio::time::timeout(timeout, cleanup).await {
            Ok(()) => true,
            Err(_) => {
                warn!("优雅关闭超时（{}秒）", timeout.as_secs());
                false
            }
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
