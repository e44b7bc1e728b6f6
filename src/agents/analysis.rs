use std::sync::Arc;
use std::time::Duration;

use crate::analyzer::{
    AnalysisContext, FallbackAnalyzer, LlmAnalysisResponse, PriceAnalysisPromptGenerator,
    PriceFormatter, best_offers, compute_statistics, regional_statistics,
};
use crate::config::AnalysisConfig;
use crate::llm::client::{LlmClient, LlmError, StructuredResponse};
use crate::types::{
    AnalysisInput, AnalysisResult, AnalysisSource, DegradationReason, TrendDirection,
};

/// 价格分析：优先调用LLM，失败时降级为规则分析，从不向调用方返回错误
pub struct AnalysisAgent {
    llm_client: Arc<dyn LlmClient>,
    config: AnalysisConfig,
    prompt_generator: PriceAnalysisPromptGenerator,
    fallback: FallbackAnalyzer,
}

impl AnalysisAgent {
    pub fn new(llm_client: Arc<dyn LlmClient>, config: AnalysisConfig) -> Self {
        Self {
            prompt_generator: PriceAnalysisPromptGenerator::new(&config),
            fallback: FallbackAnalyzer::new(&config),
            llm_client,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: AnalysisInput,
        context: AnalysisContext,
        llm_timeout: Duration,
    ) -> AnalysisResult {
        if input.is_empty() {
            return self.degrade(&input, DegradationReason::NoData);
        }

        let statistics = compute_statistics(&input);

        // 格式化可能涉及大量记录，放到阻塞线程池执行
        let formatter = PriceFormatter::new(self.config.max_prompt_chars);
        let formatted = {
            let input = input.clone();
            tokio::task::spawn_blocking(move || formatter.format(&input)).await
        };
        let formatted = match formatted {
            Ok(formatted) => formatted,
            Err(e) => {
                return self.degrade(&input, DegradationReason::FormattingFailed(e.to_string()));
            }
        };
        if formatted.omitted > 0 {
            tracing::debug!(
                "✂️ 价格数据超出提示词预算，省略 {} 条较早的记录",
                formatted.omitted
            );
        }

        let request = self
            .prompt_generator
            .generate(&formatted, statistics.as_ref(), &context);

        tracing::info!(
            model = %self.llm_client.model_name(),
            "🤖 调用LLM分析 {} 条价格记录，超时 {}s",
            formatted.included,
            llm_timeout.as_secs()
        );

        let response =
            match tokio::time::timeout(llm_timeout, self.llm_client.complete(&request, llm_timeout))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(LlmError::Timeout(_))) | Err(_) => {
                    return self.degrade(&input, DegradationReason::Timeout);
                }
                Ok(Err(LlmError::Unavailable(reason))) => {
                    tracing::debug!("LLM不可用: {}", reason);
                    return self.degrade(&input, DegradationReason::LlmDisabled);
                }
                Ok(Err(e)) => {
                    return self.degrade(&input, DegradationReason::LlmError(e.to_string()));
                }
            };

        match self.parse_response(&response) {
            Ok(parsed) => {
                let confidence = parsed.confidence.max(self.config.llm_min_confidence);
                let trend_direction: TrendDirection = parsed.trend_direction.into();
                tracing::info!(
                    trend = %trend_direction,
                    confidence,
                    "✅ LLM分析完成"
                );
                AnalysisResult {
                    summary: parsed.summary.trim().to_string(),
                    trend_direction,
                    confidence,
                    reasoning_trace: parsed
                        .reasoning_trace
                        .into_iter()
                        .map(|step| step.trim().to_string())
                        .filter(|step| !step.is_empty())
                        .collect(),
                    source: AnalysisSource::Llm,
                    degradation: None,
                    statistics,
                    regional_statistics: regional_statistics(&input),
                    best_offers: best_offers(&input),
                }
            }
            Err(detail) => self.degrade(&input, DegradationReason::MalformedResponse(detail)),
        }
    }

    /// 按schema解析并校验LLM输出
    fn parse_response(&self, response: &StructuredResponse) -> Result<LlmAnalysisResponse, String> {
        let value = response.json_value()?;
        let parsed: LlmAnalysisResponse =
            serde_json::from_value(value).map_err(|e| format!("schema mismatch: {}", e))?;

        if parsed.summary.trim().is_empty() {
            return Err("empty summary".to_string());
        }
        if !parsed.confidence.is_finite() || !(0.0..=1.0).contains(&parsed.confidence) {
            return Err(format!("confidence {} outside [0, 1]", parsed.confidence));
        }
        Ok(parsed)
    }

    fn degrade(&self, input: &AnalysisInput, reason: DegradationReason) -> AnalysisResult {
        tracing::warn!("⚠️ 使用规则分析替代LLM分析，原因：{}", reason);
        self.fallback.analyze(input, reason)
    }
}

#[cfg(test)]
mod tests;
