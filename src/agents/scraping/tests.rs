#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::agents::scraping::ScrapingAgent;
    use crate::config::ScrapingConfig;
    use crate::scraping::{MockFailure, MockScrapingService};
    use crate::types::{ScrapeErrorKind, ScrapeTarget, TargetOutcome};

    fn target(site_id: &str) -> ScrapeTarget {
        ScrapeTarget {
            site_id: site_id.to_string(),
            url_template: format!("https://www.{}/search?q={{query}}", site_id),
            region: "US".to_string(),
            device_model: "iPhone 15".to_string(),
            priority: 1,
            score: 0.5,
            last_success_at: None,
        }
    }

    fn build_agent(service: Arc<MockScrapingService>, timeout_ms: u64) -> ScrapingAgent {
        let config = ScrapingConfig {
            max_parallel_scrapes: 3,
            transient_retry_backoff_ms: 10,
            ..ScrapingConfig::default()
        };
        ScrapingAgent::new(service, &config).with_target_timeout(Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn test_partial_success_is_not_an_error() {
        let service = MockScrapingService::new()
            .with_prices("amazon.com", vec![999.0])
            .with_prices("bestbuy.com", vec![1049.0])
            .with_failure("walmart.com", MockFailure::Blocked);
        let agent = build_agent(Arc::new(service), 1000);

        let targets = vec![target("amazon.com"), target("bestbuy.com"), target("walmart.com")];
        let outcome = agent.execute(&targets, None).await.unwrap();

        let mut prices: Vec<f64> = outcome.records.iter().map(|r| r.price).collect();
        prices.sort_by(f64::total_cmp);
        assert_eq!(prices, vec![999.0, 1049.0]);
        assert_eq!(outcome.succeeded(), 2);
        assert!(outcome.is_partial());
        assert!(!outcome.cancelled);

        let failed = &outcome.statuses[2];
        assert_eq!(failed.site_id, "walmart.com");
        assert_eq!(failed.outcome, TargetOutcome::Failed);
        assert_eq!(failed.error_kind, Some(ScrapeErrorKind::Blocked));
        assert_eq!(failed.attempts, 1);
    }

    #[tokio::test]
    async fn test_all_failures_exhaust() {
        let service = MockScrapingService::new()
            .with_failure("amazon.com", MockFailure::Blocked)
            .with_failure("bestbuy.com", MockFailure::Malformed);
        let agent = build_agent(Arc::new(service), 1000);

        let err = agent
            .execute(&[target("amazon.com"), target("bestbuy.com")], None)
            .await
            .unwrap_err();
        assert_eq!(err.statuses.len(), 2);
        assert!(!err.cancelled);
        assert_eq!(
            err.statuses[1].error_kind,
            Some(ScrapeErrorKind::SiteStructureChanged)
        );
    }

    #[tokio::test]
    async fn test_transient_error_is_retried_once() {
        let service = Arc::new(
            MockScrapingService::new()
                .with_prices("amazon.com", vec![999.0])
                .with_transient_failures("amazon.com", 1),
        );
        let agent = build_agent(service.clone(), 1000);

        let outcome = agent.execute(&[target("amazon.com")], None).await.unwrap();
        assert_eq!(outcome.statuses[0].attempts, 2);
        assert_eq!(service.call_count("amazon.com"), 2);

        let service = Arc::new(
            MockScrapingService::new()
                .with_prices("amazon.com", vec![999.0])
                .with_transient_failures("amazon.com", 5),
        );
        let agent = build_agent(service.clone(), 1000);
        let err = agent.execute(&[target("amazon.com")], None).await.unwrap_err();
        assert_eq!(err.statuses[0].error_kind, Some(ScrapeErrorKind::Transient));
        assert_eq!(service.call_count("amazon.com"), 2);
    }

    #[tokio::test]
    async fn test_slow_target_is_bounded_by_target_timeout() {
        let service = MockScrapingService::new()
            .with_prices("amazon.com", vec![999.0])
            .with_prices("bestbuy.com", vec![1049.0])
            .with_delay("walmart.com", Duration::from_secs(30));
        let agent = build_agent(Arc::new(service), 100);

        let started = std::time::Instant::now();
        let outcome = agent
            .execute(
                &[target("amazon.com"), target("bestbuy.com"), target("walmart.com")],
                None,
            )
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.records.len(), 2);
        let slow = &outcome.statuses[2];
        assert_eq!(slow.outcome, TargetOutcome::Failed);
        assert_eq!(slow.error_kind, Some(ScrapeErrorKind::Transient));
        assert_eq!(slow.attempts, 2);
    }

    #[tokio::test]
    async fn test_deadline_cancels_unfinished_targets() {
        let service = MockScrapingService::new()
            .with_prices("amazon.com", vec![999.0])
            .with_delay("walmart.com", Duration::from_secs(30));
        let agent = build_agent(Arc::new(service), 60_000);

        let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
        let outcome = agent
            .execute(&[target("amazon.com"), target("walmart.com")], Some(deadline))
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.statuses[1].outcome, TargetOutcome::Cancelled);
        assert_eq!(outcome.records.len(), 1);
    }
}
