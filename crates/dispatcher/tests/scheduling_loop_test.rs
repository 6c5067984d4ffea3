use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use scheduler_core::{ActiveTaskSet, ChannelRegistry, Dequeued, ExecutionQueue};
use scheduler_dispatcher::{RecurringTaskManager, SchedulingLoop};
use scheduler_domain::{Frequency, IdeaGenerator, TaskStatus, META_EXPECTED_VIEWS};
use scheduler_infrastructure::MetricsCollector;
use scheduler_testing_utils::{
    ContentTaskBuilder, MockIdeaGenerator, MockTaskStore, SchedulingConfigBuilder,
};
use tokio::sync::broadcast;

struct Fixture {
    active: Arc<ActiveTaskSet>,
    queue: Arc<ExecutionQueue>,
    store: MockTaskStore,
    registry: Arc<ChannelRegistry>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            active: Arc::new(ActiveTaskSet::new()),
            queue: Arc::new(ExecutionQueue::new()),
            store: MockTaskStore::new(),
            registry: Arc::new(ChannelRegistry::new()),
        }
    }

    fn build_loop(&self, ideas: MockIdeaGenerator, dedupe: bool) -> SchedulingLoop {
        let metrics = Arc::new(MetricsCollector::new());
        let ideas: Arc<dyn IdeaGenerator> = Arc::new(ideas);
        let recurring = RecurringTaskManager::new(
            self.registry.clone(),
            self.active.clone(),
            Arc::new(self.store.clone()),
            ideas,
            metrics.clone(),
        )
        .with_dedupe(dedupe);
        SchedulingLoop::new(
            self.active.clone(),
            self.queue.clone(),
            Arc::new(self.store.clone()),
            recurring,
            metrics,
            Duration::from_millis(20),
        )
    }

    async fn add_task(&self, task: scheduler_domain::ContentTask) -> String {
        let id = task.task_id.clone();
        self.store.insert_task(task.clone());
        self.active.insert(task).await;
        id
    }
}

#[tokio::test]
async fn test_tick_promotes_due_tasks_in_time_order() {
    let fx = Fixture::new();
    let later = fx
        .add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::seconds(1)).build())
        .await;
    let earlier = fx
        .add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::minutes(10)).build())
        .await;
    let future = fx
        .add_task(ContentTaskBuilder::new().due_in(ChronoDuration::hours(2)).build())
        .await;

    let scheduling_loop = fx.build_loop(MockIdeaGenerator::new(), false);
    let report = scheduling_loop.tick(Utc::now()).await;

    assert_eq!(report.promoted, 2);
    assert_eq!(report.enqueued, 2);
    assert_eq!(fx.queue.depth(), 2);
    assert_eq!(fx.active.get(&later).await.unwrap().status, TaskStatus::Queued);
    assert_eq!(fx.active.get(&future).await.unwrap().status, TaskStatus::Scheduled);
    assert_eq!(fx.store.get_task(&earlier).unwrap().status, TaskStatus::Queued);

    let mut order = Vec::new();
    while let Dequeued::Task(task) = fx.queue.dequeue_timeout(Duration::from_millis(10)).await {
        order.push(task.task_id);
    }
    assert_eq!(order, vec![earlier, later]);
}

#[tokio::test]
async fn test_cancelled_task_is_not_enqueued() {
    let fx = Fixture::new();
    let id = fx
        .add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::seconds(1)).build())
        .await;
    fx.active.cancel(&id).await;

    let report = fx.build_loop(MockIdeaGenerator::new(), false).tick(Utc::now()).await;
    assert_eq!(report.promoted, 0);
    assert_eq!(fx.queue.depth(), 0);
}

#[tokio::test]
async fn test_store_failure_does_not_abort_tick() {
    let fx = Fixture::new();
    fx.add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::seconds(1)).build())
        .await;
    fx.add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::seconds(2)).build())
        .await;
    fx.store.set_fail_status_updates(true);

    let report = fx.build_loop(MockIdeaGenerator::new(), false).tick(Utc::now()).await;
    assert_eq!(report.enqueued, 2);
    assert_eq!(fx.queue.depth(), 2);
}

#[tokio::test]
async fn test_enqueue_failure_returns_task_to_scheduled() {
    let fx = Fixture::new();
    let id = fx
        .add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::seconds(1)).build())
        .await;
    fx.queue.close();

    let report = fx.build_loop(MockIdeaGenerator::new(), false).tick(Utc::now()).await;
    assert_eq!(report.promoted, 1);
    assert_eq!(report.requeue_deferred, 1);
    assert_eq!(fx.active.get(&id).await.unwrap().status, TaskStatus::Scheduled);
    assert_eq!(fx.store.get_task(&id).unwrap().status, TaskStatus::Scheduled);
}

#[tokio::test]
async fn test_recurring_task_per_configured_channel() {
    let fx = Fixture::new();
    fx.registry
        .upsert("daily-chan", SchedulingConfigBuilder::new(Frequency::Daily).build())
        .await;
    fx.registry
        .upsert(
            "monthly-chan",
            SchedulingConfigBuilder::new(Frequency::Monthly)
                .with_category("cooking")
                .build(),
        )
        .await;

    let now = Utc::now();
    let ideas = MockIdeaGenerator::new().with_expected_views(777);
    let report = fx.build_loop(ideas.clone(), false).tick(now).await;
    assert_eq!(report.recurring_created, 2);

    let tasks = fx.active.snapshot().await;
    assert_eq!(tasks.len(), 2);
    for task in &tasks {
        assert!(task.is_auto_generated());
        assert_eq!(task.status, TaskStatus::Scheduled);
        assert_eq!(task.metadata[META_EXPECTED_VIEWS], serde_json::json!(777));
        let expected = match task.channel_id.as_str() {
            "daily-chan" => now + ChronoDuration::days(1),
            _ => now + ChronoDuration::days(30),
        };
        assert_eq!(task.scheduled_time, expected);
        assert!(fx.store.get_task(&task.task_id).is_some());
    }
    assert!(ideas.requests().iter().all(|(_, count)| *count == 1));
    assert!(ideas.requests().iter().any(|(category, _)| category == "cooking"));
}

#[tokio::test]
async fn test_recurring_skips_channel_without_ideas() {
    let fx = Fixture::new();
    fx.registry
        .upsert("c", SchedulingConfigBuilder::new(Frequency::Weekly).build())
        .await;

    let report = fx.build_loop(MockIdeaGenerator::empty(), false).tick(Utc::now()).await;
    assert_eq!(report.recurring_created, 0);
    assert!(fx.active.is_empty().await);
}

#[tokio::test]
async fn test_recurring_failure_does_not_block_promotion() {
    let fx = Fixture::new();
    fx.registry
        .upsert("c", SchedulingConfigBuilder::new(Frequency::Daily).build())
        .await;
    fx.add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::seconds(1)).build())
        .await;

    let report = fx.build_loop(MockIdeaGenerator::failing(), false).tick(Utc::now()).await;
    assert_eq!(report.enqueued, 1);
    assert_eq!(report.recurring_created, 0);
}

#[tokio::test]
async fn test_recurring_creates_every_tick_unless_deduplicated() {
    let fx = Fixture::new();
    fx.registry
        .upsert("c", SchedulingConfigBuilder::new(Frequency::Daily).build())
        .await;
    let scheduling_loop = fx.build_loop(MockIdeaGenerator::new(), false);
    scheduling_loop.tick(Utc::now()).await;
    scheduling_loop.tick(Utc::now()).await;
    assert_eq!(fx.active.len().await, 2);

    let fx = Fixture::new();
    fx.registry
        .upsert("c", SchedulingConfigBuilder::new(Frequency::Daily).build())
        .await;
    let scheduling_loop = fx.build_loop(MockIdeaGenerator::new(), true);
    scheduling_loop.tick(Utc::now()).await;
    scheduling_loop.tick(Utc::now()).await;
    assert_eq!(fx.active.len().await, 1);
}

#[tokio::test]
async fn test_rescheduled_task_waits_for_next_tick() {
    let fx = Fixture::new();
    let id = fx
        .add_task(ContentTaskBuilder::new().due_in(ChronoDuration::days(2)).build())
        .await;
    let scheduling_loop = fx.build_loop(MockIdeaGenerator::new(), false);

    assert_eq!(scheduling_loop.tick(Utc::now()).await.promoted, 0);

    fx.active
        .reschedule(&id, Utc::now() - ChronoDuration::seconds(1))
        .await;
    assert_eq!(fx.queue.depth(), 0);
    assert_eq!(fx.active.get(&id).await.unwrap().status, TaskStatus::Scheduled);

    assert_eq!(scheduling_loop.tick(Utc::now()).await.promoted, 1);
    assert_eq!(fx.queue.depth(), 1);
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() {
    let fx = Fixture::new();
    let id = fx
        .add_task(ContentTaskBuilder::new().overdue_by(ChronoDuration::seconds(1)).build())
        .await;
    let scheduling_loop = fx.build_loop(MockIdeaGenerator::new(), false);

    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(scheduling_loop.run(rx));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(fx.active.get(&id).await.unwrap().status, TaskStatus::Queued);

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop should stop")
        .unwrap();
}
