#[cfg(test)]
mod tests {
    use crate::config::{Config, LLMConfig, LLMProvider, ScoringPolicy, ScrapingBackend};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.run_timeout_seconds, 120);
        assert_eq!(config.scraping.max_parallel_scrapes, 3);
        assert_eq!(config.scraping.target_timeout_seconds, 30);
        assert_eq!(config.scraping.backend, ScrapingBackend::Http);
        assert_eq!(config.planning.default_regions, vec!["US", "UK", "EU"]);
        assert!(config.planning.max_targets.is_none());
        assert_eq!(config.analysis.fallback_confidence, 0.3);
        assert_eq!(config.recommendation.act_confidence_threshold, 0.5);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_config_default() {
        let llm = LLMConfig::default();
        assert!(llm.enabled);
        assert_eq!(llm.provider, LLMProvider::OpenAI);
        assert_eq!(llm.retry_attempts, 3);
        assert_eq!(llm.timeout_seconds, 60);
    }

    #[test]
    fn test_scoring_policy_default() {
        let scoring = ScoringPolicy::default();
        assert_eq!(scoring.neutral_success_rate, 0.5);
        assert_eq!(scoring.recency_weight, 0.0);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "openai".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            "Anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "ollama".parse::<LLMProvider>().unwrap(),
            LLMProvider::Ollama
        );
        assert!("unknown".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LLMProvider::DeepSeek.to_string(), "deepseek");
        assert_eq!(LLMProvider::OpenRouter.to_string(), "openrouter");
    }

    #[test]
    fn test_config_from_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("smartninja.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
run_timeout_seconds = 45

[llm]
provider = "anthropic"
model = "claude-test"
api_key = "key"

[scraping]
backend = "mock"
max_parallel_scrapes = 5

[planning]
default_regions = ["BR"]
max_targets = 4
"#
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.run_timeout_seconds, 45);
        assert_eq!(config.llm.provider, LLMProvider::Anthropic);
        assert_eq!(config.llm.model, "claude-test");
        assert_eq!(config.llm.retry_attempts, 3);
        assert_eq!(config.scraping.backend, ScrapingBackend::Mock);
        assert_eq!(config.scraping.max_parallel_scrapes, 5);
        assert_eq!(config.scraping.target_timeout_seconds, 30);
        assert_eq!(config.planning.default_regions, vec!["BR"]);
        assert_eq!(config.planning.max_targets, Some(4));
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = Config::from_file(&PathBuf::from("/nonexistent/smartninja.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[scraping]\nmax_parallel_scrapes = 0\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_validate_requires_fallback_below_llm_confidence() {
        let mut config = Config::default();
        config.analysis.fallback_confidence = 0.6;
        config.analysis.llm_min_confidence = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.planning.default_regions.clear();
        assert!(config.validate().is_err());
    }
}
