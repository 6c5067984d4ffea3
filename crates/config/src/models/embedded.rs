use serde::{Deserialize, Serialize};

/// 嵌入式运行模式：内存存储 + 演练流水线
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddedConfig {
    /// 演练流水线模拟一次生成的耗时
    pub dry_run_delay_ms: u64,
    /// 启动时注册到内存存储中的频道
    pub channels: Vec<String>,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            dry_run_delay_ms: 500,
            channels: Vec::new(),
        }
    }
}

impl EmbeddedConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.channels.iter().any(|c| c.trim().is_empty()) {
            return Err(anyhow::anyhow!("频道ID不能为空"));
        }
        Ok(())
    }
}
