//! # 领域服务
//!
//! 不属于单个实体的业务规则。目前只有排期优化：根据历史表现数据
//! 给出发布时间、内容分类和发布频率的建议。

use std::collections::BTreeMap;

use chrono::Timelike;
use serde_json::json;

use crate::entities::{PerformanceMetric, SchedulingConfig};
use crate::value_objects::{
    OptimizationReport, OptimizationStatus, ScheduleSuggestion, SuggestionKind,
};

/// 平均播放量达到目标的该倍数时建议提高频率
pub const HIGH_PERFORMANCE_RATIO: f64 = 1.2;
/// 平均播放量低于目标的该倍数时建议降低频率
pub const LOW_PERFORMANCE_RATIO: f64 = 0.5;

#[derive(Debug, Default, Clone, Copy)]
struct ViewAccumulator {
    total: u64,
    count: u64,
}

impl ViewAccumulator {
    fn add(&mut self, views: u64) {
        self.total += views;
        self.count += 1;
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        }
    }
}

/// 按平均值取最大的分组，平均值相同时取排序靠前的键
fn best_group<K: Clone + Ord>(groups: &BTreeMap<K, ViewAccumulator>) -> Option<(K, f64)> {
    let mut best: Option<(K, f64)> = None;
    for (key, acc) in groups {
        let avg = acc.average();
        match &best {
            Some((_, best_avg)) if avg <= *best_avg => {}
            _ => best = Some((key.clone(), avg)),
        }
    }
    best
}

pub struct ScheduleOptimizer;

impl ScheduleOptimizer {
    pub fn analyze(
        channel_id: &str,
        current: Option<&SchedulingConfig>,
        metrics: &[PerformanceMetric],
    ) -> OptimizationReport {
        if metrics.is_empty() {
            return OptimizationReport::no_data(channel_id);
        }

        let mut by_hour: BTreeMap<u32, ViewAccumulator> = BTreeMap::new();
        let mut by_category: BTreeMap<String, ViewAccumulator> = BTreeMap::new();
        let mut overall = ViewAccumulator::default();

        for metric in metrics {
            by_hour
                .entry(metric.published_at.hour())
                .or_default()
                .add(metric.views);
            by_category
                .entry(metric.category.clone())
                .or_default()
                .add(metric.views);
            overall.add(metric.views);
        }

        let mut suggestions = Vec::new();

        if let Some((hour, avg)) = best_group(&by_hour) {
            suggestions.push(ScheduleSuggestion {
                kind: SuggestionKind::Timing,
                recommendation: format!("publish around {hour:02}:00 UTC"),
                value: json!({ "hour_utc": hour, "average_views": avg }),
                rationale: format!(
                    "best of {} observed hourly slots, averaging {:.0} views",
                    by_hour.len(),
                    avg
                ),
            });
        }

        if let Some((category, avg)) = best_group(&by_category) {
            let rationale = match current {
                Some(config) if config.category != category => format!(
                    "'{category}' averages {avg:.0} views, outperforming current category '{}'",
                    config.category
                ),
                _ => format!("'{category}' averages {avg:.0} views"),
            };
            suggestions.push(ScheduleSuggestion {
                kind: SuggestionKind::Category,
                recommendation: format!("focus on '{category}' content"),
                value: json!(category),
                rationale,
            });
        }

        if let Some(config) = current {
            if config.target_views > 0 {
                let avg = overall.average();
                let ratio = avg / config.target_views as f64;
                let (suggested, rationale) = if ratio >= HIGH_PERFORMANCE_RATIO {
                    (
                        config.frequency.more_frequent().unwrap_or(config.frequency),
                        format!(
                            "average views {avg:.0} exceed target {} by {:.0}%",
                            config.target_views,
                            (ratio - 1.0) * 100.0
                        ),
                    )
                } else if ratio < LOW_PERFORMANCE_RATIO {
                    (
                        config.frequency.less_frequent().unwrap_or(config.frequency),
                        format!(
                            "average views {avg:.0} are below half of target {}",
                            config.target_views
                        ),
                    )
                } else {
                    (
                        config.frequency,
                        format!(
                            "average views {avg:.0} are in line with target {}",
                            config.target_views
                        ),
                    )
                };
                suggestions.push(ScheduleSuggestion {
                    kind: SuggestionKind::Frequency,
                    recommendation: if suggested == config.frequency {
                        format!("keep {} cadence", suggested)
                    } else {
                        format!("switch from {} to {}", config.frequency, suggested)
                    },
                    value: json!(suggested.as_str()),
                    rationale,
                });
            }
        }

        OptimizationReport {
            channel_id: channel_id.to_string(),
            status: OptimizationStatus::Optimized,
            sample_size: metrics.len(),
            suggestions,
        }
    }
}
