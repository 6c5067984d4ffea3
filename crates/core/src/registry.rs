use std::collections::HashMap;

use scheduler_domain::SchedulingConfig;
use tokio::sync::RwLock;

/// 频道调度策略表
///
/// 由 `schedule_content` 写入（整体覆盖），循环任务管理器和统计只读。
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    configs: RwLock<HashMap<String, SchedulingConfig>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入频道策略，返回被覆盖的旧策略
    pub async fn upsert(
        &self,
        channel_id: impl Into<String>,
        config: SchedulingConfig,
    ) -> Option<SchedulingConfig> {
        self.configs.write().await.insert(channel_id.into(), config)
    }

    pub async fn get(&self, channel_id: &str) -> Option<SchedulingConfig> {
        self.configs.read().await.get(channel_id).cloned()
    }

    /// 按频道ID排序的快照，循环任务按固定顺序处理各频道
    pub async fn snapshot(&self) -> Vec<(String, SchedulingConfig)> {
        let configs = self.configs.read().await;
        let mut entries: Vec<_> = configs
            .iter()
            .map(|(id, config)| (id.clone(), config.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub async fn len(&self) -> usize {
        self.configs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.configs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_domain::Frequency;

    #[tokio::test]
    async fn test_upsert_overwrites_whole_config() {
        let registry = ChannelRegistry::new();
        assert!(registry
            .upsert("c", SchedulingConfig::new(Frequency::Daily, "tech"))
            .await
            .is_none());

        let previous = registry
            .upsert("c", SchedulingConfig::new(Frequency::Weekly, "gaming"))
            .await
            .unwrap();
        assert_eq!(previous.frequency, Frequency::Daily);

        let current = registry.get("c").await.unwrap();
        assert_eq!(current.category, "gaming");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_sorted_by_channel() {
        let registry = ChannelRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            registry
                .upsert(id, SchedulingConfig::new(Frequency::Monthly, "tech"))
                .await;
        }
        let ids: Vec<_> = registry.snapshot().await.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }
}
