#[cfg(test)]
mod tests {
    use crate::types::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(vendor: &str, region: &str, price: f64, days_ago: i64) -> CanonicalPriceRecord {
        CanonicalPriceRecord::new(
            "iPhone 15",
            vendor,
            region,
            price,
            Currency::Usd,
            Utc::now() - Duration::days(days_ago),
        )
        .unwrap()
    }

    #[test]
    fn test_record_rejects_negative_price() {
        let result = CanonicalPriceRecord::new(
            "iPhone 15",
            "amazon.com",
            "US",
            -1.0,
            Currency::Usd,
            Utc::now(),
        );
        assert_eq!(result, Err(RecordError::InvalidPrice(-1.0)));
    }

    #[test]
    fn test_record_rejects_future_observation() {
        let future = Utc::now() + Duration::hours(2);
        let result =
            CanonicalPriceRecord::new("iPhone 15", "amazon.com", "US", 10.0, Currency::Usd, future);
        assert!(matches!(result, Err(RecordError::FutureObservation(_))));
    }

    #[test]
    fn test_record_uppercases_region() {
        let record = record("amazon.com", "us", 999.0, 0);
        assert_eq!(record.region, "US");
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(Currency::from_symbol("R$"), Some(Currency::Brl));
        assert_eq!(Currency::from_symbol("£"), Some(Currency::Gbp));
        assert_eq!(Currency::for_region("de"), Some(Currency::Eur));
        assert_eq!(Currency::for_region("ZZ"), None);
        assert!("XYZ".parse::<Currency>().is_err());
        assert_eq!(serde_json::to_string(&Currency::Eur).unwrap(), "\"EUR\"");
    }

    #[test]
    fn test_ambiguous_symbols_follow_region_currency() {
        assert_eq!(Currency::from_symbol("¥"), Some(Currency::Jpy));
        assert_eq!(
            Currency::from_symbol_in_region("¥", Some(Currency::Cny)),
            Some(Currency::Cny)
        );
        assert_eq!(
            Currency::from_symbol_in_region("¥", Some(Currency::Usd)),
            Some(Currency::Jpy)
        );
        assert_eq!(
            Currency::from_symbol_in_region("$", Some(Currency::Cad)),
            Some(Currency::Cad)
        );
        assert_eq!(
            Currency::from_symbol_in_region("$", Some(Currency::Gbp)),
            Some(Currency::Usd)
        );
        assert_eq!(
            Currency::from_symbol_in_region("£", Some(Currency::Cny)),
            Some(Currency::Gbp)
        );
    }

    #[test]
    fn test_scrape_target_url_encodes_model() {
        let target = ScrapeTarget {
            site_id: "amazon.com".to_string(),
            url_template: "https://www.amazon.com/s?k={query}".to_string(),
            region: "US".to_string(),
            device_model: "iPhone 15 Pro".to_string(),
            priority: 1,
            score: 0.9,
            last_success_at: None,
        };
        assert_eq!(target.url(), "https://www.amazon.com/s?k=iPhone%2015%20Pro");
        assert_eq!(target.label(), "amazon.com@US");
    }

    #[test]
    fn test_analysis_input_groups_and_orders_by_region() {
        let input = AnalysisInput::from_records(
            "iPhone 15",
            vec![
                record("walmart.com", "US", 1049.0, 0),
                record("amazon.co.uk", "UK", 899.0, 1),
                record("amazon.com", "US", 999.0, 3),
            ],
        );

        assert_eq!(input.len(), 3);
        assert_eq!(input.region_codes(), vec!["UK".to_string(), "US".to_string()]);
        let us = &input.regions["US"];
        assert_eq!(us[0].vendor, "amazon.com");
        assert_eq!(us[1].vendor, "walmart.com");

        let chronological = input.chronological();
        assert_eq!(chronological[0].price, 999.0);
        assert_eq!(chronological[2].price, 1049.0);
    }

    #[test]
    fn test_empty_analysis_input() {
        let input = AnalysisInput::from_records("iPhone 15", Vec::new());
        assert!(input.is_empty());
        assert_eq!(input.len(), 0);
    }

    #[test]
    fn test_pipeline_state_transitions() {
        assert!(PipelineState::Pending.can_transition_to(PipelineState::Planning));
        assert!(PipelineState::Planning.can_transition_to(PipelineState::Failed));
        assert!(PipelineState::Scraping.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::Analyzing.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::Recommending.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::Planning.can_transition_to(PipelineState::Analyzing));
        assert!(!PipelineState::Done.can_transition_to(PipelineState::Planning));
    }

    #[test]
    fn test_pipeline_run_tracks_failed_stage() {
        let mut run = PipelineRun::new(PriceQuery::new("Nokia 3310"));
        run.advance(PipelineState::Planning);
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        run.record_stage(StageRecord {
            stage: StageName::Planning,
            status: StageStatus::Failed,
            started_at: at,
            finished_at: at,
            duration_ms: 3,
            error: Some("unknown device".to_string()),
            note: None,
        });
        run.advance(PipelineState::Failed);

        assert!(run.is_failed());
        assert!(run.finished_at.is_some());
        assert_eq!(run.failed_stage(), Some(StageName::Planning));
        assert_eq!(run.total_duration_ms(), 3);
    }

    #[test]
    fn test_serialized_tags() {
        assert_eq!(serde_json::to_string(&AnalysisSource::Fallback).unwrap(), "\"fallback\"");
        assert_eq!(serde_json::to_string(&Action::Wait).unwrap(), "\"wait\"");
        assert_eq!(
            serde_json::to_string(&TrendDirection::Stable).unwrap(),
            "\"stable\""
        );
    }
}
