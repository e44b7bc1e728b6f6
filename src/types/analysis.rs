use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::price::{CanonicalPriceRecord, Currency};

/// 价格趋势方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Unknown,
}

impl Display for TrendDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
            TrendDirection::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// 分析结果来源
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Llm,
    Fallback,
}

impl Display for AnalysisSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisSource::Llm => write!(f, "llm"),
            AnalysisSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// 降级到规则分析的原因
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DegradationReason {
    NoData,
    LlmDisabled,
    Timeout,
    MalformedResponse(String),
    LlmError(String),
    FormattingFailed(String),
}

impl Display for DegradationReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradationReason::NoData => write!(f, "no price data"),
            DegradationReason::LlmDisabled => write!(f, "LLM analysis disabled"),
            DegradationReason::Timeout => write!(f, "LLM call timed out"),
            DegradationReason::MalformedResponse(detail) => {
                write!(f, "malformed LLM response: {}", detail)
            }
            DegradationReason::LlmError(detail) => write!(f, "LLM error: {}", detail),
            DegradationReason::FormattingFailed(detail) => {
                write!(f, "price formatting failed: {}", detail)
            }
        }
    }
}

/// 价格统计（基于主要货币）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceStatistics {
    pub currency: Currency,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// 最近一天的平均价格
    pub latest: f64,
    pub std_dev: f64,
    pub vendor_count: usize,
    /// 参与统计的记录所在地区
    #[serde(default)]
    pub regions: Vec<String>,
}

/// 单个商家在某地区的最低报价
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BestOffer {
    pub vendor: String,
    pub region: String,
    pub price: f64,
    pub currency: Currency,
    #[serde(default)]
    pub url: Option<String>,
    /// 同币种内的性价比评分，满分50
    pub value_score: f64,
}

impl Display for BestOffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) at {:.2} {}",
            self.vendor, self.region, self.price, self.currency
        )
    }
}

/// 分析输入：按地区分组、组内按观测时间排序的价格记录
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisInput {
    pub device_model: String,
    pub regions: BTreeMap<String, Vec<CanonicalPriceRecord>>,
}

impl AnalysisInput {
    pub fn from_records(
        device_model: impl Into<String>,
        records: impl IntoIterator<Item = CanonicalPriceRecord>,
    ) -> Self {
        let mut regions: BTreeMap<String, Vec<CanonicalPriceRecord>> = BTreeMap::new();
        for record in records {
            regions.entry(record.region.clone()).or_default().push(record);
        }
        for group in regions.values_mut() {
            group.sort_by(|a, b| {
                a.observed_at
                    .cmp(&b.observed_at)
                    .then_with(|| a.vendor.cmp(&b.vendor))
                    .then_with(|| a.price.total_cmp(&b.price))
            });
        }

        Self {
            device_model: device_model.into(),
            regions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.values().all(|group| group.is_empty())
    }

    pub fn len(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn region_codes(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    /// 所有记录按时间先后排列
    pub fn chronological(&self) -> Vec<&CanonicalPriceRecord> {
        let mut all: Vec<&CanonicalPriceRecord> = self.regions.values().flatten().collect();
        all.sort_by(|a, b| {
            a.observed_at
                .cmp(&b.observed_at)
                .then_with(|| a.region.cmp(&b.region))
                .then_with(|| a.vendor.cmp(&b.vendor))
        });
        all
    }
}

/// 分析结果，返回后不可修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub summary: String,
    pub trend_direction: TrendDirection,
    /// 置信度 0.0-1.0
    pub confidence: f64,
    /// LLM推理过程，规则分析时为空
    #[serde(default)]
    pub reasoning_trace: Vec<String>,
    pub source: AnalysisSource,
    #[serde(default)]
    pub degradation: Option<DegradationReason>,
    #[serde(default)]
    pub statistics: Option<PriceStatistics>,
    /// 各地区按自身主要货币计算的统计
    #[serde(default)]
    pub regional_statistics: BTreeMap<String, PriceStatistics>,
    #[serde(default)]
    pub best_offers: Vec<BestOffer>,
}

impl AnalysisResult {
    pub fn is_fallback(&self) -> bool {
        self.source == AnalysisSource::Fallback
    }
}
