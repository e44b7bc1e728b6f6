#[cfg(test)]
mod tests {
    use crate::llm::client::utils::extract_json_object;
    use crate::llm::client::{
        DisabledLlmClient, LlmClient, LlmError, LlmRequest, StructuredResponse,
    };
    use std::time::Duration;

    #[test]
    fn test_extract_json_from_plain_text() {
        let text = r#"{"summary": "ok", "confidence": 0.8}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_json_from_code_fence() {
        let text = "```json\n{\"summary\": \"ok\"}\n```";
        assert_eq!(extract_json_object(text), Some("{\"summary\": \"ok\"}"));
    }

    #[test]
    fn test_extract_json_with_surrounding_prose() {
        let text = "Here is the analysis:\n{\"a\": {\"b\": 1}}\nHope this helps.";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_extract_json_missing() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_structured_response_json_value() {
        let response = StructuredResponse {
            content: "```\n{\"trend_direction\": \"stable\"}\n```".to_string(),
            model: "test".to_string(),
        };
        let value = response.json_value().unwrap();
        assert_eq!(value["trend_direction"], "stable");

        let broken = StructuredResponse {
            content: "{not json}".to_string(),
            model: "test".to_string(),
        };
        assert!(broken.json_value().is_err());
    }

    #[tokio::test]
    async fn test_disabled_client_reports_unavailable() {
        let client = DisabledLlmClient::new("no api key");
        let request = LlmRequest {
            system_prompt: "sys".to_string(),
            user_prompt: "user".to_string(),
            schema: serde_json::json!({}),
        };
        let result = client.complete(&request, Duration::from_secs(1)).await;
        assert_eq!(result, Err(LlmError::Unavailable("no api key".to_string())));
        assert_eq!(client.model_name(), "disabled");
    }
}
