//! # 领域实体
//!
//! 内容任务调度子系统的核心数据模型：内容任务、任务状态机、发布频率、
//! 频道调度策略，以及与外部协作者（存储、选题生成、内容流水线）交换的数据。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use scheduler_errors::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 元数据键：由循环任务管理器自动生成
pub const META_AUTO_GENERATED: &str = "auto_generated";
/// 元数据键：首批任务所属批次
pub const META_BATCH_ID: &str = "batch_id";
/// 元数据键：任务在批次中的序号
pub const META_BATCH_INDEX: &str = "batch_index";
/// 元数据键：选题生成器给出的预期播放量
pub const META_EXPECTED_VIEWS: &str = "expected_views";

/// 发布频率
///
/// 每种频率对应一个固定宽度的时间偏移：每天 1 天、每周 7 天、每月 30 天。
/// 月度偏移是近似值，不做日历月计算。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn offset(&self) -> Duration {
        match self {
            Frequency::Daily => Duration::days(1),
            Frequency::Weekly => Duration::days(7),
            Frequency::Monthly => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// 更密集的下一档频率，已经是每天则返回 None
    pub fn more_frequent(&self) -> Option<Frequency> {
        match self {
            Frequency::Daily => None,
            Frequency::Weekly => Some(Frequency::Daily),
            Frequency::Monthly => Some(Frequency::Weekly),
        }
    }

    /// 更稀疏的下一档频率，已经是每月则返回 None
    pub fn less_frequent(&self) -> Option<Frequency> {
        match self {
            Frequency::Daily => Some(Frequency::Weekly),
            Frequency::Weekly => Some(Frequency::Monthly),
            Frequency::Monthly => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(SchedulerError::InvalidFrequency(s.to_string())),
        }
    }
}

/// 内容任务状态
///
/// 状态机：`scheduled → queued → executing → {completed | failed}`，
/// `cancelled` 只能从 `scheduled` 或 `queued` 进入，改期可以把任务重置回 `scheduled`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Scheduled,
    Queued,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Queued => "queued",
            TaskStatus::Executing => "executing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// 仍可被取消的状态
    pub fn is_cancellable(&self) -> bool {
        matches!(self, TaskStatus::Scheduled | TaskStatus::Queued)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, next),
            (Scheduled, Queued)
                | (Queued, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Scheduled, Cancelled)
                | (Queued, Cancelled)
                | (_, Scheduled)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(TaskStatus::Scheduled),
            "queued" => Ok(TaskStatus::Queued),
            "executing" => Ok(TaskStatus::Executing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(SchedulerError::validation_error(format!(
                "未知的任务状态: {s}"
            ))),
        }
    }
}

/// 内容任务
///
/// 一次定时的内容生成工作。`task_id` 在创建时生成且不可变，
/// `scheduled_time` 只能通过 [`ContentTask::reschedule`] 修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentTask {
    pub task_id: String,
    pub channel_id: String,
    pub title: String,
    pub category: String,
    pub frequency: Frequency,
    pub target_views: u64,
    pub scheduled_time: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub result: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_priority() -> i32 {
    1
}

impl ContentTask {
    pub fn new(
        channel_id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        frequency: Frequency,
        target_views: u64,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        let channel_id = channel_id.into();
        let now = Utc::now();
        Self {
            task_id: Self::generate_task_id(&channel_id, scheduled_time),
            channel_id,
            title: title.into(),
            category: category.into(),
            frequency,
            target_views,
            scheduled_time,
            status: TaskStatus::Scheduled,
            priority: default_priority(),
            metadata: HashMap::new(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 任务ID = 频道 + 目标时间戳 + 随机后缀，同一频道同一时刻的两个任务也不会冲突
    pub fn generate_task_id(channel_id: &str, scheduled_time: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}_{}",
            channel_id,
            scheduled_time.timestamp(),
            &suffix[..8]
        )
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// 处于 scheduled 且到期的任务
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Scheduled && self.scheduled_time <= now
    }

    pub fn is_auto_generated(&self) -> bool {
        self.metadata
            .get(META_AUTO_GENERATED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn transition_to(&mut self, next: TaskStatus) -> SchedulerResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                task_id: self.task_id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 改期：更新执行时间并重置为 scheduled，是否到期由下一次调度扫描判断
    pub fn reschedule(&mut self, new_time: DateTime<Utc>) -> SchedulerResult<()> {
        self.transition_to(TaskStatus::Scheduled)?;
        self.scheduled_time = new_time;
        Ok(())
    }

    pub fn apply_result(&mut self, result: &TaskResult) {
        match result {
            TaskResult::Artifacts(artifacts) => {
                self.result = Some(artifacts.clone());
                self.error = None;
            }
            TaskResult::Error(message) => {
                self.error = Some(message.clone());
            }
        }
    }
}

/// 内容质量等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Draft,
    #[default]
    Standard,
    High,
    Premium,
}

impl FromStr for QualityLevel {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(QualityLevel::Draft),
            "standard" => Ok(QualityLevel::Standard),
            "high" => Ok(QualityLevel::High),
            "premium" => Ok(QualityLevel::Premium),
            _ => Err(SchedulerError::InvalidQualityLevel(s.to_string())),
        }
    }
}

/// 频道调度策略
///
/// 由 `schedule_content` 创建，之后只能被新的 `schedule_content` 调用整体覆盖。
/// 未知的 `frequency` / `quality_level` 在反序列化时直接拒绝。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulingConfig {
    pub frequency: Frequency,
    pub category: String,
    #[serde(default = "default_target_views")]
    pub target_views: u64,
    #[serde(default)]
    pub monetization_enabled: bool,
    #[serde(default = "default_auto_publish")]
    pub auto_publish: bool,
    #[serde(default)]
    pub quality_level: QualityLevel,
    #[serde(default)]
    pub content_themes: Vec<String>,
}

fn default_target_views() -> u64 {
    10_000
}

fn default_auto_publish() -> bool {
    true
}

impl SchedulingConfig {
    pub fn new(frequency: Frequency, category: impl Into<String>) -> Self {
        Self {
            frequency,
            category: category.into(),
            target_views: default_target_views(),
            monetization_enabled: false,
            auto_publish: default_auto_publish(),
            quality_level: QualityLevel::default(),
            content_themes: Vec::new(),
        }
    }

    /// 从松散的 JSON 构造，字段类型或枚举值不合法时返回错误而不是退回默认值
    pub fn from_json(value: Value) -> SchedulerResult<Self> {
        let config: SchedulingConfig = serde_json::from_value(value)
            .map_err(|e| SchedulerError::validation_error(format!("调度配置无效: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        if self.category.trim().is_empty() {
            return Err(SchedulerError::validation_error("内容分类不能为空"));
        }
        if self.content_themes.iter().any(|t| t.trim().is_empty()) {
            return Err(SchedulerError::validation_error("内容主题不能为空字符串"));
        }
        Ok(())
    }
}

/// 存储中的频道记录，worker 执行任务前解析
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

fn default_language() -> String {
    "en".to_string()
}

impl ChannelConfig {
    pub fn new(channel_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            name: name.into(),
            language: default_language(),
            settings: HashMap::new(),
        }
    }
}

/// 选题生成器返回的候选内容
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentIdea {
    pub title: String,
    pub expected_views: u64,
}

/// 流水线执行上下文
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub task: ContentTask,
    pub channel: ChannelConfig,
}

/// 流水线执行结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineOutcome {
    pub success: bool,
    #[serde(default)]
    pub artifacts: HashMap<String, Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PipelineOutcome {
    pub fn succeeded(artifacts: HashMap<String, Value>) -> Self {
        Self {
            success: true,
            artifacts,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            artifacts: HashMap::new(),
            error: Some(error.into()),
        }
    }
}

/// 持久化到任务记录上的执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Artifacts(HashMap<String, Value>),
    Error(String),
}

/// 历史表现指标的查询范围
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricScope {
    Channel,
    Category,
}

impl MetricScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricScope::Channel => "channel",
            MetricScope::Category => "category",
        }
    }
}

/// 已发布内容的表现数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetric {
    pub channel_id: String,
    pub category: String,
    pub views: u64,
    #[serde(default)]
    pub engagement_rate: f64,
    pub published_at: DateTime<Utc>,
}
