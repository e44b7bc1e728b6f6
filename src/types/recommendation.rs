use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::analysis::{AnalysisSource, BestOffer};
use super::price::Currency;

/// 购买建议动作
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Wait,
    Hold,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "buy"),
            Action::Wait => write!(f, "wait"),
            Action::Hold => write!(f, "hold"),
        }
    }
}

/// 目标价格区间
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBand {
    pub low: f64,
    pub high: f64,
    pub currency: Currency,
}

impl Display for PriceBand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}-{:.2} {}", self.low, self.high, self.currency)
    }
}

/// 最终返回给调用方的购买建议
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub action: Action,
    pub target_price_band: Option<PriceBand>,
    pub confidence: f64,
    pub explanation: String,
    /// 所依据的分析来源
    pub source: AnalysisSource,
    /// 按性价比排序的报价，首个为推荐购买的报价
    #[serde(default)]
    pub best_offers: Vec<BestOffer>,
}

impl Recommendation {
    pub fn best_offer(&self) -> Option<&BestOffer> {
        self.best_offers.first()
    }
}
