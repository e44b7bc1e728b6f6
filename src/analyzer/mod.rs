//! 价格分析：数据格式化、提示词生成与规则分析

pub mod fallback;
pub mod formatter;
pub mod prompt;
pub mod statistics;

pub use fallback::{FALLBACK_PREFIX, FallbackAnalyzer, regional_levels};
pub use formatter::{FormattedPrices, PriceFormatter};
pub use prompt::{AnalysisContext, LlmAnalysisResponse, LlmTrend, PriceAnalysisPromptGenerator};
pub use statistics::{best_offers, compute_statistics, regional_statistics};
