use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scheduler_domain::ContentTask;
use scheduler_errors::{SchedulerError, SchedulerResult};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// 一次带超时出队的结果
#[derive(Debug)]
pub enum Dequeued {
    Task(ContentTask),
    Timeout,
    Closed,
}

/// 执行队列
///
/// 调度循环是唯一的生产者，多个 worker 共享同一个接收端，
/// 每个条目只会被一个 worker 取走，出队顺序与入队顺序一致。
#[derive(Debug)]
pub struct ExecutionQueue {
    sender: mpsc::UnboundedSender<ContentTask>,
    /// 使用 Arc 包装接收端，支持多个消费者
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<ContentTask>>>,
    depth: AtomicUsize,
    closed: AtomicBool,
}

impl Default for ExecutionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            depth: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn enqueue(&self, task: ContentTask) -> SchedulerResult<()> {
        if self.is_closed() {
            return Err(SchedulerError::QueueClosed);
        }
        let task_id = task.task_id.clone();
        // 先计数再发送，worker 的 fetch_sub 不会早于这里
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if self.sender.send(task).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::QueueClosed);
        }
        debug!("任务 {} 已入队，当前队列深度 {}", task_id, depth);
        Ok(())
    }

    /// 最多等待 `timeout` 取出一个任务
    ///
    /// 队列关闭后仍可取出剩余条目，直到队列为空才返回 `Closed`。
    pub async fn dequeue_timeout(&self, timeout: Duration) -> Dequeued {
        if self.is_closed() {
            return match self.try_dequeue().await {
                Some(task) => Dequeued::Task(task),
                None => Dequeued::Closed,
            };
        }

        let received = tokio::time::timeout(timeout, async {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await
        })
        .await;

        match received {
            Ok(Some(task)) => {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                Dequeued::Task(task)
            }
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::Timeout,
        }
    }

    async fn try_dequeue(&self) -> Option<ContentTask> {
        let mut receiver = self.receiver.lock().await;
        let task = receiver.try_recv().ok()?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(task)
    }

    /// 取出所有剩余条目，按入队顺序返回
    pub async fn drain(&self) -> Vec<ContentTask> {
        let mut receiver = self.receiver.lock().await;
        let mut drained = Vec::new();
        while let Ok(task) = receiver.try_recv() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            drained.push(task);
        }
        drained
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// 停止接收新条目
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// 重新初始化调度器时恢复入队
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
