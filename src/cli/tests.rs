#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::{LLMProvider, ScrapingBackend};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["smartninja", "iPhone 15"]).unwrap();

        assert_eq!(args.device, "iPhone 15");
        assert!(args.regions.is_empty());
        assert!(args.vendors.is_empty());
        assert!(args.config.is_none());
        assert!(!args.offline);
        assert!(!args.no_llm);
        assert!(!args.json);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_require_device() {
        assert!(Args::try_parse_from(["smartninja"]).is_err());
    }

    #[test]
    fn test_args_repeated_regions_and_vendors() {
        let args = Args::try_parse_from([
            "smartninja",
            "Galaxy S24",
            "-r",
            "us",
            "--region",
            "UK",
            "--vendor",
            "amazon",
            "--vendor",
            "bestbuy",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.regions, vec!["us", "UK"]);
        assert!(args.verbose);

        let query = args.to_query();
        assert_eq!(query.device_model, "Galaxy S24");
        assert_eq!(query.regions, vec!["US", "UK"]);
        assert_eq!(
            query.vendors,
            Some(vec!["amazon".to_string(), "bestbuy".to_string()])
        );
    }

    #[test]
    fn test_into_config_overrides() {
        let args = Args::try_parse_from([
            "smartninja",
            "Pixel 8",
            "--config",
            "/nonexistent/ignored.toml",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/nonexistent/ignored.toml")));
        assert!(args.into_config().is_err());

        let args = Args::try_parse_from([
            "smartninja",
            "Pixel 8",
            "--offline",
            "--no-llm",
            "--llm-provider",
            "deepseek",
            "--model",
            "deepseek-chat",
            "--max-parallel-scrapes",
            "6",
            "--target-timeout",
            "5",
            "--run-timeout",
            "20",
            "--max-targets",
            "4",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.scraping.backend, ScrapingBackend::Mock);
        assert!(!config.llm.enabled);
        assert_eq!(config.llm.provider, LLMProvider::DeepSeek);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.scraping.max_parallel_scrapes, 6);
        assert_eq!(config.scraping.target_timeout_seconds, 5);
        assert_eq!(config.run_timeout_seconds, 20);
        assert_eq!(config.planning.max_targets, Some(4));
    }

    #[test]
    fn test_into_config_rejects_unknown_provider() {
        let args =
            Args::try_parse_from(["smartninja", "Pixel 8", "--llm-provider", "nope"]).unwrap();
        assert!(args.into_config().is_err());
    }
}
