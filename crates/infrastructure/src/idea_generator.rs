use async_trait::async_trait;
use rand::Rng;
use scheduler_domain::{ContentIdea, IdeaGenerator};
use scheduler_errors::SchedulerResult;

const DEFAULT_ANGLES: &[&str] = &[
    "Beginner's guide",
    "Top 10",
    "Myths debunked",
    "Deep dive",
    "Weekly roundup",
];

/// 基于主题模板的选题生成器
///
/// 嵌入式模式下代替真实的选题服务，按模板轮换生成标题，
/// 预期播放量在 `[min_views, max_views)` 内随机。
#[derive(Debug, Clone)]
pub struct ThemeIdeaGenerator {
    angles: Vec<String>,
    min_views: u64,
    max_views: u64,
}

impl Default for ThemeIdeaGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ANGLES.iter().map(|a| a.to_string()).collect())
    }
}

impl ThemeIdeaGenerator {
    pub fn new(angles: Vec<String>) -> Self {
        let angles = if angles.is_empty() {
            DEFAULT_ANGLES.iter().map(|a| a.to_string()).collect()
        } else {
            angles
        };
        Self {
            angles,
            min_views: 1_000,
            max_views: 50_000,
        }
    }

    pub fn with_view_range(mut self, min_views: u64, max_views: u64) -> Self {
        self.min_views = min_views;
        self.max_views = max_views.max(min_views + 1);
        self
    }
}

#[async_trait]
impl IdeaGenerator for ThemeIdeaGenerator {
    async fn generate_ideas(&self, category: &str, count: usize) -> SchedulerResult<Vec<ContentIdea>> {
        let mut rng = rand::rng();
        let ideas = (0..count)
            .map(|i| {
                let angle = &self.angles[i % self.angles.len()];
                ContentIdea {
                    title: format!("{angle}: {category}"),
                    expected_views: rng.random_range(self.min_views..self.max_views),
                }
            })
            .collect();
        Ok(ideas)
    }
}
