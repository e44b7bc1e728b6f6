use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::formatter::FormattedPrices;
use crate::config::AnalysisConfig;
use crate::llm::client::LlmRequest;
use crate::types::{PriceStatistics, TrendDirection};

/// LLM必须输出的趋势取值
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl From<LlmTrend> for TrendDirection {
    fn from(trend: LlmTrend) -> Self {
        match trend {
            LlmTrend::Increasing => TrendDirection::Increasing,
            LlmTrend::Decreasing => TrendDirection::Decreasing,
            LlmTrend::Stable => TrendDirection::Stable,
        }
    }
}

/// LLM分析输出
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LlmAnalysisResponse {
    /// 价格走势的简要结论
    pub summary: String,
    pub trend_direction: LlmTrend,
    /// 0.0-1.0
    pub confidence: f64,
    /// 推理步骤
    #[serde(default)]
    pub reasoning_trace: Vec<String>,
}

/// 提示词中的查询上下文
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisContext {
    pub device_model: String,
    pub category: String,
    pub regions: Vec<String>,
}

/// 价格分析提示词生成器
#[derive(Debug, Clone)]
pub struct PriceAnalysisPromptGenerator {
    include_justification: bool,
}

impl PriceAnalysisPromptGenerator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            include_justification: config.include_justification,
        }
    }

    pub fn output_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(LlmAnalysisResponse))
            .unwrap_or(serde_json::Value::Null)
    }

    pub fn generate(
        &self,
        formatted: &FormattedPrices,
        statistics: Option<&PriceStatistics>,
        context: &AnalysisContext,
    ) -> LlmRequest {
        let schema = Self::output_schema();
        let schema_text =
            serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());

        let (currency, stats_text) = match statistics {
            Some(stats) => (
                stats.currency.to_string(),
                format!(
                    "- observations: {}\n- vendors: {}\n- average: {:.2}\n- minimum: {:.2}\n- maximum: {:.2}\n- latest day average: {:.2}\n- standard deviation: {:.2}",
                    stats.count,
                    stats.vendor_count,
                    stats.mean,
                    stats.min,
                    stats.max,
                    stats.latest,
                    stats.std_dev
                ),
            ),
            None => ("n/a".to_string(), "- no statistics available".to_string()),
        };

        let justification = if self.include_justification {
            "In reasoning_trace, justify your conclusion by citing the current price level, how it compares to the average, the trend across the observation window and any notable vendor or regional differences.\n"
        } else {
            ""
        };

        let user_prompt = format!(
            include_str!("prompts/analysis_user.tpl"),
            context.device_model,
            context.category,
            context.regions.join(", "),
            currency,
            stats_text,
            formatted.text.trim_end(),
            justification,
            schema_text
        );

        LlmRequest {
            system_prompt: include_str!("prompts/analysis_sys.tpl").to_string(),
            user_prompt,
            schema,
        }
    }
}
