use std::collections::HashMap;

use chrono::{DateTime, Utc};
use scheduler_domain::{ContentTask, TaskStatus, TaskStatusSummary};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

/// 取消操作的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(ContentTask),
    /// 已经在执行，取消是协作式的，无法中断
    AlreadyExecuting,
    NotFound,
}

/// 改期操作的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RescheduleOutcome {
    Rescheduled(ContentTask),
    AlreadyExecuting,
    NotFound,
}

/// 活跃任务集合
///
/// 所有未到终态的任务都在这里，由调度循环、worker 和门面共享。
/// 每个状态变更都在同一把写锁内完成检查和修改，外部拿到的都是克隆。
#[derive(Debug, Default)]
pub struct ActiveTaskSet {
    tasks: RwLock<HashMap<String, ContentTask>>,
    persist: Mutex<()>,
}

impl ActiveTaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入新任务，ID 已存在时保留原任务并返回 false
    pub async fn insert(&self, task: ContentTask) -> bool {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.task_id) {
            warn!("任务 {} 已在活跃集合中，忽略重复插入", task.task_id);
            return false;
        }
        tasks.insert(task.task_id.clone(), task);
        true
    }

    pub async fn get(&self, task_id: &str) -> Option<ContentTask> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn remove(&self, task_id: &str) -> Option<ContentTask> {
        self.tasks.write().await.remove(task_id)
    }

    pub async fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.read().await.get(task_id).map(|t| t.status)
    }

    /// 持有期间，调度循环、取消、改期和关闭对同一任务的
    /// “内存变更 + 存储写入”互斥，存储里的状态顺序与内存一致
    pub async fn persist_guard(&self) -> MutexGuard<'_, ()> {
        self.persist.lock().await
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// 把所有到期的 scheduled 任务原子地切换为 queued
    ///
    /// 返回的任务按执行时间升序，同一时间按优先级降序。
    pub async fn promote_due(&self, now: DateTime<Utc>) -> Vec<ContentTask> {
        let mut tasks = self.tasks.write().await;
        let mut promoted = Vec::new();

        for task in tasks.values_mut() {
            if !task.is_due(now) {
                continue;
            }
            match task.transition_to(TaskStatus::Queued) {
                Ok(()) => promoted.push(task.clone()),
                Err(e) => warn!("任务 {} 提升失败: {}", task.task_id, e),
            }
        }

        promoted.sort_by(|a, b| {
            a.scheduled_time
                .cmp(&b.scheduled_time)
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        promoted
    }

    /// worker 认领出队的任务：只有仍处于 queued 的任务才能进入 executing
    ///
    /// 已取消（不在集合中）或已改期（回到 scheduled）的陈旧队列项返回 None。
    pub async fn claim(&self, task_id: &str) -> Option<ContentTask> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(task_id)?;
        if task.status != TaskStatus::Queued {
            debug!(
                "任务 {} 当前状态为 {}，跳过陈旧的队列项",
                task_id, task.status
            );
            return None;
        }
        task.transition_to(TaskStatus::Executing).ok()?;
        Some(task.clone())
    }

    /// 把 queued 任务退回 scheduled，用于入队失败和关闭时清空队列
    pub async fn revert_to_scheduled(&self, task_id: &str) -> Option<ContentTask> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(task_id)?;
        if task.status != TaskStatus::Queued {
            return None;
        }
        task.transition_to(TaskStatus::Scheduled).ok()?;
        Some(task.clone())
    }

    /// 移出所有 executing 任务，用于 worker 被强制中止之后
    pub async fn take_executing(&self) -> Vec<ContentTask> {
        let mut tasks = self.tasks.write().await;
        let ids: Vec<String> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Executing)
            .map(|t| t.task_id.clone())
            .collect();
        ids.iter().filter_map(|id| tasks.remove(id)).collect()
    }

    pub async fn cancel(&self, task_id: &str) -> CancelOutcome {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get(task_id) else {
            return CancelOutcome::NotFound;
        };
        if !task.status.is_cancellable() {
            return CancelOutcome::AlreadyExecuting;
        }
        match tasks.remove(task_id) {
            Some(mut task) => {
                // is_cancellable 已保证 scheduled/queued -> cancelled 合法
                let _ = task.transition_to(TaskStatus::Cancelled);
                CancelOutcome::Cancelled(task)
            }
            None => CancelOutcome::NotFound,
        }
    }

    /// 改期只修改时间和状态，是否到期留给下一次调度扫描判断
    pub async fn reschedule(&self, task_id: &str, new_time: DateTime<Utc>) -> RescheduleOutcome {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(task_id) else {
            return RescheduleOutcome::NotFound;
        };
        if task.status == TaskStatus::Executing {
            return RescheduleOutcome::AlreadyExecuting;
        }
        match task.reschedule(new_time) {
            Ok(()) => RescheduleOutcome::Rescheduled(task.clone()),
            Err(e) => {
                warn!("任务 {} 改期失败: {}", task_id, e);
                RescheduleOutcome::NotFound
            }
        }
    }

    pub async fn status_summary(&self) -> TaskStatusSummary {
        let tasks = self.tasks.read().await;
        let mut summary = TaskStatusSummary::default();
        for task in tasks.values() {
            summary.record(task.status);
        }
        summary
    }

    /// 最早到期的 scheduled 任务，按执行时间升序
    pub async fn upcoming(&self, limit: usize) -> Vec<ContentTask> {
        let tasks = self.tasks.read().await;
        let mut upcoming: Vec<ContentTask> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Scheduled)
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| {
            a.scheduled_time
                .cmp(&b.scheduled_time)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        upcoming.truncate(limit);
        upcoming
    }

    pub async fn snapshot(&self) -> Vec<ContentTask> {
        self.tasks.read().await.values().cloned().collect()
    }

    /// 频道是否已有执行时间不早于 `at` 的自动生成任务
    pub async fn has_pending_auto_task(&self, channel_id: &str, at: DateTime<Utc>) -> bool {
        self.tasks.read().await.values().any(|t| {
            t.channel_id == channel_id
                && t.is_auto_generated()
                && t.status == TaskStatus::Scheduled
                && t.scheduled_time >= at
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scheduler_domain::{Frequency, META_AUTO_GENERATED};
    use serde_json::json;

    fn task_at(channel: &str, at: DateTime<Utc>) -> ContentTask {
        ContentTask::new(channel, "title", "tech", Frequency::Daily, 100, at)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let set = ActiveTaskSet::new();
        let task = task_at("c", Utc::now());
        assert!(set.insert(task.clone()).await);
        assert!(!set.insert(task).await);
        assert_eq!(set.len().await, 1);
    }

    #[tokio::test]
    async fn test_promote_due_only_touches_due_scheduled_tasks() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        let due_late = task_at("c", now - Duration::seconds(1));
        let due_early = task_at("c", now - Duration::minutes(5));
        let future = task_at("c", now + Duration::hours(1));
        set.insert(due_late.clone()).await;
        set.insert(due_early.clone()).await;
        set.insert(future.clone()).await;

        let promoted = set.promote_due(now).await;
        let ids: Vec<_> = promoted.iter().map(|t| t.task_id.clone()).collect();
        assert_eq!(ids, vec![due_early.task_id.clone(), due_late.task_id.clone()]);
        assert!(promoted.iter().all(|t| t.status == TaskStatus::Queued));

        // 已经 queued 的任务不会被再次提升
        assert!(set.promote_due(now).await.is_empty());
        assert_eq!(
            set.get(&future.task_id).await.unwrap().status,
            TaskStatus::Scheduled
        );
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let set = ActiveTaskSet::new();
        let task = task_at("c", Utc::now() - Duration::seconds(1));
        set.insert(task.clone()).await;

        // scheduled 任务不能被认领
        assert!(set.claim(&task.task_id).await.is_none());

        set.promote_due(Utc::now()).await;
        let claimed = set.claim(&task.task_id).await.unwrap();
        assert_eq!(claimed.status, TaskStatus::Executing);
        assert!(set.claim(&task.task_id).await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_and_during_execution() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        let scheduled = task_at("c", now + Duration::hours(1));
        let queued = task_at("c", now - Duration::seconds(1));
        set.insert(scheduled.clone()).await;
        set.insert(queued.clone()).await;
        set.promote_due(now).await;

        match set.cancel(&scheduled.task_id).await {
            CancelOutcome::Cancelled(task) => assert_eq!(task.status, TaskStatus::Cancelled),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(set.get(&scheduled.task_id).await.is_none());

        set.claim(&queued.task_id).await.unwrap();
        assert_eq!(
            set.cancel(&queued.task_id).await,
            CancelOutcome::AlreadyExecuting
        );
        assert!(set.get(&queued.task_id).await.is_some());

        assert_eq!(set.cancel("missing").await, CancelOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_reschedule_queued_task_invalidates_queue_entry() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        let task = task_at("c", now - Duration::seconds(1));
        set.insert(task.clone()).await;
        set.promote_due(now).await;

        let later = now + Duration::days(1);
        match set.reschedule(&task.task_id, later).await {
            RescheduleOutcome::Rescheduled(t) => {
                assert_eq!(t.status, TaskStatus::Scheduled);
                assert_eq!(t.scheduled_time, later);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // 队列里的旧条目不能再被认领
        assert!(set.claim(&task.task_id).await.is_none());
    }

    #[tokio::test]
    async fn test_reschedule_into_past_waits_for_next_promotion() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        let task = task_at("c", now + Duration::days(3));
        set.insert(task.clone()).await;

        set.reschedule(&task.task_id, now - Duration::seconds(5)).await;
        assert_eq!(
            set.get(&task.task_id).await.unwrap().status,
            TaskStatus::Scheduled
        );
        let promoted = set.promote_due(now).await;
        assert_eq!(promoted.len(), 1);
    }

    #[tokio::test]
    async fn test_take_executing_removes_only_claimed_tasks() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        let claimed = task_at("c", now - Duration::seconds(2));
        let queued = task_at("c", now - Duration::seconds(1));
        let scheduled = task_at("c", now + Duration::hours(1));
        for task in [&claimed, &queued, &scheduled] {
            set.insert(task.clone()).await;
        }
        set.promote_due(now).await;
        set.claim(&claimed.task_id).await.unwrap();

        let taken = set.take_executing().await;
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].task_id, claimed.task_id);
        assert_eq!(set.len().await, 2);
        assert_eq!(set.status_of(&queued.task_id).await, Some(TaskStatus::Queued));
        assert!(set.status_of(&claimed.task_id).await.is_none());
    }

    #[tokio::test]
    async fn test_upcoming_sorted_and_limited() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        for hours in [5, 1, 3, 2, 4] {
            set.insert(task_at("c", now + Duration::hours(hours))).await;
        }
        let upcoming = set.upcoming(3).await;
        assert_eq!(upcoming.len(), 3);
        assert!(upcoming.windows(2).all(|w| w[0].scheduled_time <= w[1].scheduled_time));
        assert_eq!(upcoming[0].scheduled_time, now + Duration::hours(1));
    }

    #[tokio::test]
    async fn test_status_summary() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        set.insert(task_at("c", now + Duration::hours(1))).await;
        let due = task_at("c", now - Duration::seconds(1));
        set.insert(due.clone()).await;
        set.insert(task_at("c", now - Duration::seconds(2))).await;
        set.promote_due(now).await;
        set.claim(&due.task_id).await;

        let summary = set.status_summary().await;
        assert_eq!(summary.scheduled, 1);
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.executing, 1);
        assert_eq!(summary.total(), 3);
    }

    #[tokio::test]
    async fn test_has_pending_auto_task() {
        let set = ActiveTaskSet::new();
        let now = Utc::now();
        let auto = task_at("c", now + Duration::days(1)).with_metadata(META_AUTO_GENERATED, json!(true));
        set.insert(auto).await;
        assert!(set.has_pending_auto_task("c", now).await);
        assert!(!set.has_pending_auto_task("other", now).await);
        assert!(!set.has_pending_auto_task("c", now + Duration::days(2)).await);
    }
}
