//! Test data builders with sensible defaults

use chrono::{DateTime, Duration, Utc};
use scheduler_domain::{
    ContentTask, Frequency, PerformanceMetric, QualityLevel, SchedulingConfig, TaskStatus,
    META_AUTO_GENERATED,
};
use serde_json::json;

/// Builder for ContentTask
///
/// Defaults to a scheduled daily "tech" task for `test-channel` due now.
pub struct ContentTaskBuilder {
    channel_id: String,
    title: String,
    category: String,
    frequency: Frequency,
    target_views: u64,
    scheduled_time: DateTime<Utc>,
    status: TaskStatus,
    priority: i32,
    auto_generated: bool,
}

impl Default for ContentTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTaskBuilder {
    pub fn new() -> Self {
        Self {
            channel_id: "test-channel".to_string(),
            title: "Test video".to_string(),
            category: "tech".to_string(),
            frequency: Frequency::Daily,
            target_views: 1_000,
            scheduled_time: Utc::now(),
            status: TaskStatus::Scheduled,
            priority: 1,
            auto_generated: false,
        }
    }

    pub fn with_channel(mut self, channel_id: &str) -> Self {
        self.channel_id = channel_id.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_scheduled_time(mut self, scheduled_time: DateTime<Utc>) -> Self {
        self.scheduled_time = scheduled_time;
        self
    }

    /// Due `offset` in the past
    pub fn overdue_by(mut self, offset: Duration) -> Self {
        self.scheduled_time = Utc::now() - offset;
        self
    }

    /// Due `offset` in the future
    pub fn due_in(mut self, offset: Duration) -> Self {
        self.scheduled_time = Utc::now() + offset;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }

    pub fn build(self) -> ContentTask {
        let mut task = ContentTask::new(
            self.channel_id,
            self.title,
            self.category,
            self.frequency,
            self.target_views,
            self.scheduled_time,
        )
        .with_priority(self.priority);
        task.status = self.status;
        if self.auto_generated {
            task = task.with_metadata(META_AUTO_GENERATED, json!(true));
        }
        task
    }
}

/// Builder for SchedulingConfig
pub struct SchedulingConfigBuilder {
    config: SchedulingConfig,
}

impl SchedulingConfigBuilder {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            config: SchedulingConfig::new(frequency, "tech"),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.config.category = category.to_string();
        self
    }

    pub fn with_target_views(mut self, target_views: u64) -> Self {
        self.config.target_views = target_views;
        self
    }

    pub fn with_quality(mut self, quality_level: QualityLevel) -> Self {
        self.config.quality_level = quality_level;
        self
    }

    pub fn with_themes(mut self, themes: &[&str]) -> Self {
        self.config.content_themes = themes.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn monetized(mut self) -> Self {
        self.config.monetization_enabled = true;
        self
    }

    pub fn build(self) -> SchedulingConfig {
        self.config
    }
}

/// A performance sample published `days_ago` days ago at `hour` UTC
pub fn performance_metric(
    channel_id: &str,
    category: &str,
    views: u64,
    days_ago: i64,
    hour: u32,
) -> PerformanceMetric {
    let day = (Utc::now() - Duration::days(days_ago)).date_naive();
    let published_at = day
        .and_hms_opt(hour % 24, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or_else(Utc::now);
    PerformanceMetric {
        channel_id: channel_id.to_string(),
        category: category.to_string(),
        views,
        engagement_rate: 0.04,
        published_at,
    }
}
