use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("频道配置未找到: {channel_id}")]
    ChannelConfigMissing { channel_id: String },
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("任务执行错误: {0}")]
    TaskExecution(String),
    #[error("内容流水线崩溃: {0}")]
    PipelinePanicked(String),
    #[error("Worker异常: {0}")]
    TransientWorker(String),
    #[error("存储错误: {0}")]
    Store(String),
    #[error("启动失败: {0}")]
    Startup(String),
    #[error("任务未找到: {id}")]
    TaskNotFound { id: String },
    #[error("无效的发布频率: {0}")]
    InvalidFrequency(String),
    #[error("无效的质量等级: {0}")]
    InvalidQualityLevel(String),
    #[error("无效的状态转换: 任务 {task_id} 从 {from} 到 {to}")]
    InvalidTransition {
        task_id: String,
        from: String,
        to: String,
    },
    #[error("执行队列已关闭")]
    QueueClosed,
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    pub fn channel_config_missing<S: Into<String>>(channel_id: S) -> Self {
        Self::ChannelConfigMissing {
            channel_id: channel_id.into(),
        }
    }
    pub fn task_not_found<S: Into<String>>(id: S) -> Self {
        Self::TaskNotFound { id: id.into() }
    }
    pub fn store_error<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }
    pub fn execution_error<S: Into<String>>(msg: S) -> Self {
        Self::TaskExecution(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    /// 只有启动失败允许传播到子系统之外
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedulerError::Startup(_))
    }
    /// 只影响单个任务的错误，记录为任务失败后 worker 继续运行
    pub fn is_task_scoped(&self) -> bool {
        matches!(
            self,
            SchedulerError::ChannelConfigMissing { .. }
                | SchedulerError::Configuration(_)
                | SchedulerError::TaskExecution(_)
                | SchedulerError::PipelinePanicked(_)
        )
    }
    /// 错误分类名称，用于日志和指标标签
    pub fn category(&self) -> &'static str {
        match self {
            SchedulerError::ChannelConfigMissing { .. } | SchedulerError::Configuration(_) => {
                "configuration"
            }
            SchedulerError::TaskExecution(_) | SchedulerError::PipelinePanicked(_) => "execution",
            SchedulerError::TransientWorker(_) | SchedulerError::QueueClosed => "transient_worker",
            SchedulerError::Store(_) => "store",
            SchedulerError::Startup(_) => "startup",
            SchedulerError::TaskNotFound { .. } => "not_found",
            SchedulerError::InvalidFrequency(_)
            | SchedulerError::InvalidQualityLevel(_)
            | SchedulerError::InvalidTransition { .. }
            | SchedulerError::ValidationError(_) => "validation",
            SchedulerError::Serialization(_) => "serialization",
            SchedulerError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(err: anyhow::Error) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}
