use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::types::{
    AnalysisInput, AnalysisResult, AnalysisSource, DegradationReason, PriceStatistics,
    TrendDirection,
};

use super::statistics::{
    best_offers, compute_statistics, daily_buckets, mean, regional_statistics,
};

/// 规则分析结果前缀
pub const FALLBACK_PREFIX: &str = "[FALLBACK ANALYSIS]";

/// 基于规则的确定性价格分析，LLM不可用时使用
#[derive(Debug, Clone)]
pub struct FallbackAnalyzer {
    confidence: f64,
    trend_threshold_pct: f64,
}

impl FallbackAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            confidence: config.fallback_confidence,
            trend_threshold_pct: config.trend_threshold_pct,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// 最近一天的均价与此前所有观测均价比较，返回趋势与变化百分比
    pub fn trend(&self, input: &AnalysisInput) -> (TrendDirection, Option<f64>) {
        let (_, buckets) = daily_buckets(input);
        if buckets.is_empty() {
            return (TrendDirection::Unknown, None);
        }
        if buckets.len() < 2 {
            return (TrendDirection::Stable, None);
        }

        let mut days: Vec<&Vec<f64>> = buckets.values().collect();
        let latest = days.pop().map(|day| mean(day)).unwrap_or_default();
        let trailing: Vec<f64> = days.into_iter().flatten().copied().collect();
        let trailing_avg = mean(&trailing);
        if trailing_avg <= 0.0 {
            return (TrendDirection::Stable, None);
        }

        let change_pct = (latest - trailing_avg) / trailing_avg * 100.0;
        let direction = if change_pct > self.trend_threshold_pct {
            TrendDirection::Increasing
        } else if change_pct < -self.trend_threshold_pct {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        (direction, Some(change_pct))
    }

    pub fn analyze(&self, input: &AnalysisInput, reason: DegradationReason) -> AnalysisResult {
        let Some(statistics) = compute_statistics(input) else {
            return AnalysisResult {
                summary: format!("{} No price data available for analysis.", FALLBACK_PREFIX),
                trend_direction: TrendDirection::Unknown,
                confidence: 0.0,
                reasoning_trace: Vec::new(),
                source: AnalysisSource::Fallback,
                degradation: Some(reason),
                statistics: None,
                regional_statistics: Default::default(),
                best_offers: Vec::new(),
            };
        };

        let (trend, change_pct) = self.trend(input);
        let change_text = match change_pct {
            Some(pct) => format!(" ({:+.1}% versus the trailing average)", pct),
            None => " (single snapshot, no earlier observations to compare)".to_string(),
        };

        let regional = regional_statistics(input);
        let mut summary = format!(
            "{} {} price observations for {} across {}. Trend based on {} prices from {}: average {:.2} {} (range {:.2}-{:.2}). Prices are {}{}.",
            FALLBACK_PREFIX,
            input.len(),
            input.device_model,
            input.region_codes().join(", "),
            statistics.currency,
            statistics.regions.join(", "),
            statistics.mean,
            statistics.currency,
            statistics.min,
            statistics.max,
            trend,
            change_text
        );
        if regional.len() > 1 {
            summary.push_str(&format!(" Regional price levels: {}.", regional_levels(&regional)));
        }

        AnalysisResult {
            summary,
            trend_direction: trend,
            confidence: self.confidence,
            reasoning_trace: Vec::new(),
            source: AnalysisSource::Fallback,
            degradation: Some(reason),
            statistics: Some(statistics),
            regional_statistics: regional,
            best_offers: best_offers(input),
        }
    }
}

/// 例如 "UK 849.00 GBP (3 prices), US 1024.00 USD (2 prices)"
pub fn regional_levels(regional: &BTreeMap<String, PriceStatistics>) -> String {
    regional
        .iter()
        .map(|(region, stats)| {
            format!(
                "{} {:.2} {} ({} prices)",
                region, stats.mean, stats.currency, stats.count
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
