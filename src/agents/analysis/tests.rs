#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::agents::analysis::AnalysisAgent;
    use crate::analyzer::AnalysisContext;
    use crate::config::AnalysisConfig;
    use crate::llm::client::{
        DisabledLlmClient, LlmClient, LlmError, LlmRequest, StructuredResponse,
    };
    use crate::types::*;

    enum Reply {
        Content(&'static str),
        Error(LlmError),
        Hang,
    }

    struct FakeLlm {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeLlm {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn complete(
            &self,
            _request: &LlmRequest,
            _timeout: Duration,
        ) -> Result<StructuredResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Content(content) => Ok(StructuredResponse {
                    content: content.to_string(),
                    model: "fake".to_string(),
                }),
                Reply::Error(e) => Err(e.clone()),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(LlmError::Provider("unreachable".to_string()))
                }
            }
        }

        fn model_name(&self) -> String {
            "fake".to_string()
        }
    }

    fn input() -> AnalysisInput {
        let now = Utc::now();
        let records = [("amazon.com", 999.0), ("bestbuy.com", 1049.0)]
            .into_iter()
            .map(|(vendor, price)| {
                CanonicalPriceRecord::new("iPhone 15", vendor, "US", price, Currency::Usd, now)
                    .unwrap()
            });
        AnalysisInput::from_records("iPhone 15", records)
    }

    fn context() -> AnalysisContext {
        AnalysisContext {
            device_model: "iPhone 15".to_string(),
            category: "smartphone".to_string(),
            regions: vec!["US".to_string()],
        }
    }

    async fn run(llm: Arc<FakeLlm>, input: AnalysisInput) -> AnalysisResult {
        AnalysisAgent::new(llm, AnalysisConfig::default())
            .execute(input, context(), Duration::from_millis(200))
            .await
    }

    #[tokio::test]
    async fn test_llm_success() {
        let llm = FakeLlm::new(Reply::Content(
            "```json\n{\"summary\":\"Prices hover around 1024 USD\",\"trend_direction\":\"stable\",\"confidence\":0.85,\"reasoning_trace\":[\"two vendors\",\" \"]}\n```",
        ));
        let result = run(llm, input()).await;

        assert_eq!(result.source, AnalysisSource::Llm);
        assert_eq!(result.trend_direction, TrendDirection::Stable);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.reasoning_trace, vec!["two vendors".to_string()]);
        assert!(result.degradation.is_none());
        assert_eq!(result.statistics.unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_low_llm_confidence_is_clamped_above_fallback() {
        let llm = FakeLlm::new(Reply::Content(
            r#"{"summary":"Unclear","trend_direction":"decreasing","confidence":0.1}"#,
        ));
        let result = run(llm, input()).await;
        assert_eq!(result.source, AnalysisSource::Llm);
        assert_eq!(result.confidence, 0.4);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let llm = FakeLlm::new(Reply::Hang);
        let result = run(llm, input()).await;

        assert_eq!(result.source, AnalysisSource::Fallback);
        assert_eq!(result.degradation, Some(DegradationReason::Timeout));
        assert!(result.confidence <= AnalysisConfig::default().fallback_confidence);
        assert_eq!(result.trend_direction, TrendDirection::Stable);
    }

    #[tokio::test]
    async fn test_malformed_responses_fall_back() {
        for content in [
            "I think prices are going up.",
            r#"{"summary":"x","trend_direction":"sideways","confidence":0.9}"#,
            r#"{"summary":"","trend_direction":"stable","confidence":0.9}"#,
            r#"{"summary":"ok","trend_direction":"stable","confidence":1.7}"#,
        ] {
            let result = run(FakeLlm::new(Reply::Content(content)), input()).await;
            assert_eq!(result.source, AnalysisSource::Fallback, "content: {}", content);
            assert!(matches!(
                result.degradation,
                Some(DegradationReason::MalformedResponse(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let llm = FakeLlm::new(Reply::Error(LlmError::Provider("500".to_string())));
        let result = run(llm, input()).await;
        assert!(matches!(
            result.degradation,
            Some(DegradationReason::LlmError(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_client_and_empty_input() {
        let agent = AnalysisAgent::new(
            Arc::new(DisabledLlmClient::new("no api key")),
            AnalysisConfig::default(),
        );
        let result = agent
            .execute(input(), context(), Duration::from_secs(1))
            .await;
        assert_eq!(result.degradation, Some(DegradationReason::LlmDisabled));

        let llm = FakeLlm::new(Reply::Content("{}"));
        let result = run(llm.clone(), AnalysisInput::default()).await;
        assert_eq!(result.degradation, Some(DegradationReason::NoData));
        assert_eq!(result.trend_direction, TrendDirection::Unknown);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}
