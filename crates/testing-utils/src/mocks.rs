//! Mock implementations of the collaborator traits
//!
//! Every mock is cheap to clone and shares its state between clones, so a
//! test can hand one copy to the scheduler and keep another for assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scheduler_domain::{
    ChannelConfig, ContentIdea, ContentPipeline, ContentTask, IdeaGenerator, MetricScope,
    PerformanceMetric, PipelineContext, PipelineOutcome, TaskResult, TaskStatus, TaskStore,
};
use scheduler_errors::{SchedulerError, SchedulerResult};
use serde_json::json;

/// Mock implementation of TaskStore for testing
///
/// Records every status written per task so tests can check the observed
/// transitions, and can be told to fail individual operations.
#[derive(Debug, Clone, Default)]
pub struct MockTaskStore {
    tasks: Arc<Mutex<HashMap<String, ContentTask>>>,
    channels: Arc<Mutex<HashMap<String, ChannelConfig>>>,
    metrics: Arc<Mutex<Vec<PerformanceMetric>>>,
    status_history: Arc<Mutex<HashMap<String, Vec<TaskStatus>>>>,
    fail_saves: Arc<AtomicBool>,
    fail_status_updates: Arc<AtomicBool>,
    fail_lists: Arc<AtomicBool>,
    slow_status: Arc<Mutex<Option<(TaskStatus, Duration)>>>,
}

impl MockTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(self, channel_id: &str) -> Self {
        self.add_channel(ChannelConfig::new(channel_id, format!("{channel_id} channel")));
        self
    }

    pub fn with_tasks(self, tasks: Vec<ContentTask>) -> Self {
        for task in tasks {
            self.insert_task(task);
        }
        self
    }

    pub fn add_channel(&self, config: ChannelConfig) {
        self.channels
            .lock()
            .unwrap()
            .insert(config.channel_id.clone(), config);
    }

    pub fn add_metric(&self, metric: PerformanceMetric) {
        self.metrics.lock().unwrap().push(metric);
    }

    /// Insert a task directly, recording its current status
    pub fn insert_task(&self, task: ContentTask) {
        self.status_history
            .lock()
            .unwrap()
            .entry(task.task_id.clone())
            .or_default()
            .push(task.status);
        self.tasks.lock().unwrap().insert(task.task_id.clone(), task);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Delay every `update_task_status` that writes `status`
    pub fn set_status_write_delay(&self, status: TaskStatus, delay: Duration) {
        *self.slow_status.lock().unwrap() = Some((status, delay));
    }

    pub fn get_task(&self, task_id: &str) -> Option<ContentTask> {
        self.tasks.lock().unwrap().get(task_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Every status persisted for the task, in write order
    pub fn status_history(&self, task_id: &str) -> Vec<TaskStatus> {
        self.status_history
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn all_status_histories(&self) -> HashMap<String, Vec<TaskStatus>> {
        self.status_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskStore for MockTaskStore {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> SchedulerResult<Vec<ContentTask>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(SchedulerError::store_error("mock list failure"));
        }
        let mut tasks: Vec<ContentTask> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        Ok(tasks)
    }

    async fn save_task(&self, task: &ContentTask) -> SchedulerResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SchedulerError::store_error("mock save failure"));
        }
        self.insert_task(task.clone());
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        result: Option<TaskResult>,
    ) -> SchedulerResult<()> {
        let delay = *self.slow_status.lock().unwrap();
        if let Some((slow, delay)) = delay {
            if slow == status {
                tokio::time::sleep(delay).await;
            }
        }
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(SchedulerError::store_error("mock status update failure"));
        }
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| SchedulerError::task_not_found(task_id))?;
        task.status = status;
        if let Some(result) = result {
            task.apply_result(&result);
        }
        self.status_history
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .push(status);
        Ok(())
    }

    async fn get_channel_config(&self, channel_id: &str) -> SchedulerResult<Option<ChannelConfig>> {
        Ok(self.channels.lock().unwrap().get(channel_id).cloned())
    }

    async fn get_performance_metrics(
        &self,
        scope: MetricScope,
        id: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<PerformanceMetric>> {
        Ok(self
            .metrics
            .lock()
            .unwrap()
            .iter()
            .filter(|m| match scope {
                MetricScope::Channel => m.channel_id == id,
                MetricScope::Category => m.category == id,
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Mock implementation of IdeaGenerator
///
/// Produces `"<category> idea #n"` titles with a fixed expected view count.
/// An empty generator returns no ideas; a failing one returns an error.
#[derive(Debug, Clone)]
pub struct MockIdeaGenerator {
    expected_views: u64,
    empty: bool,
    failing: bool,
    requests: Arc<Mutex<Vec<(String, usize)>>>,
    generated: Arc<AtomicUsize>,
}

impl Default for MockIdeaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdeaGenerator {
    pub fn new() -> Self {
        Self {
            expected_views: 5_000,
            empty: false,
            failing: false,
            requests: Arc::new(Mutex::new(Vec::new())),
            generated: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn with_expected_views(mut self, views: u64) -> Self {
        self.expected_views = views;
        self
    }

    /// `(category, count)` of every request
    pub fn requests(&self) -> Vec<(String, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdeaGenerator for MockIdeaGenerator {
    async fn generate_ideas(&self, category: &str, count: usize) -> SchedulerResult<Vec<ContentIdea>> {
        self.requests
            .lock()
            .unwrap()
            .push((category.to_string(), count));
        if self.failing {
            return Err(SchedulerError::Internal("mock idea generator failure".to_string()));
        }
        if self.empty {
            return Ok(Vec::new());
        }
        Ok((0..count)
            .map(|_| {
                let n = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
                ContentIdea {
                    title: format!("{category} idea #{n}"),
                    expected_views: self.expected_views,
                }
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub enum StubBehavior {
    Succeed,
    /// Returns `success: false` with this error text
    ReportFailure(String),
    /// Returns `Err` with this message
    Error(String),
    Panic(String),
}

/// Scriptable ContentPipeline
///
/// Tracks how many calls are in flight at once so tests can assert the
/// worker pool's concurrency bound.
#[derive(Debug, Clone)]
pub struct StubPipeline {
    behavior: StubBehavior,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl StubPipeline {
    fn with_behavior(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding() -> Self {
        Self::with_behavior(StubBehavior::Succeed)
    }

    pub fn reporting_failure(error: &str) -> Self {
        Self::with_behavior(StubBehavior::ReportFailure(error.to_string()))
    }

    pub fn erroring(message: &str) -> Self {
        Self::with_behavior(StubBehavior::Error(message.to_string()))
    }

    pub fn panicking(message: &str) -> Self {
        Self::with_behavior(StubBehavior::Panic(message.to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of simultaneous calls observed
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    pub fn executed_task_ids(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentPipeline for StubPipeline {
    async fn execute_full_pipeline(&self, context: &PipelineContext) -> SchedulerResult<PipelineOutcome> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(self.in_flight.clone());
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.executed
            .lock()
            .unwrap()
            .push(context.task.task_id.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.behavior {
            StubBehavior::Succeed => {
                let mut artifacts = HashMap::new();
                artifacts.insert(
                    "video_path".to_string(),
                    json!(format!("/videos/{}.mp4", context.task.task_id)),
                );
                Ok(PipelineOutcome::succeeded(artifacts))
            }
            StubBehavior::ReportFailure(error) => Ok(PipelineOutcome::failed(error.clone())),
            StubBehavior::Error(message) => Err(SchedulerError::Internal(message.clone())),
            StubBehavior::Panic(message) => panic!("{}", message),
        }
    }
}
