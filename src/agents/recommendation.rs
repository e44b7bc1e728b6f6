use crate::analyzer::regional_levels;
use crate::config::RecommendationConfig;
use crate::types::{
    Action, AnalysisResult, AnalysisSource, PriceBand, Recommendation, TrendDirection,
};

/// 购买建议生成，纯函数：相同的分析结果总是得到相同的建议
pub struct RecommendationAgent {
    config: RecommendationConfig,
}

impl RecommendationAgent {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    pub fn recommend(&self, analysis: &AnalysisResult) -> Recommendation {
        let (action, rationale) = self.select_action(analysis);
        let target_price_band = analysis.statistics.as_ref().map(|stats| PriceBand {
            low: stats.min,
            high: stats.mean.max(stats.min),
            currency: stats.currency,
        });

        let mut explanation = format!(
            "Recommendation: {}. Prices are {} (confidence {:.2}, source: {} analysis).",
            action.to_string().to_uppercase(),
            analysis.trend_direction,
            analysis.confidence,
            analysis.source
        );

        let llm_reasoning = analysis.source == AnalysisSource::Llm
            && !analysis.reasoning_trace.is_empty();
        if llm_reasoning {
            explanation.push_str(" Reasoning: ");
            explanation.push_str(&analysis.reasoning_trace.join("; "));
            explanation.push('.');
        } else {
            explanation.push(' ');
            explanation.push_str(&rule_based_explanation(analysis));
        }

        explanation.push(' ');
        explanation.push_str(&rationale);

        if let Some(offer) = analysis.best_offers.first() {
            explanation.push_str(&format!(" Best offer: {}.", offer));
        }

        if let Some(band) = &target_price_band {
            explanation.push_str(&format!(" Target price band: {}.", band));
        }

        if analysis.source == AnalysisSource::Fallback {
            let reason = analysis
                .degradation
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "LLM analysis unavailable".to_string());
            explanation.push_str(&format!(
                " Note: this recommendation is based on the rule-based fallback analysis ({}).",
                reason
            ));
        }

        Recommendation {
            action,
            target_price_band,
            confidence: analysis.confidence,
            explanation,
            source: analysis.source,
            best_offers: analysis.best_offers.clone(),
        }
    }

    fn select_action(&self, analysis: &AnalysisResult) -> (Action, String) {
        let threshold = self.config.act_confidence_threshold;
        if analysis.confidence < threshold {
            return (
                Action::Wait,
                format!(
                    "Confidence is below {:.2}, so waiting for more price data is advised.",
                    threshold
                ),
            );
        }

        match analysis.trend_direction {
            TrendDirection::Increasing => (
                Action::Buy,
                "Prices are rising, so buying now avoids paying more later.".to_string(),
            ),
            TrendDirection::Decreasing => (
                Action::Wait,
                "Prices are falling, so waiting is likely to yield a better price.".to_string(),
            ),
            TrendDirection::Stable => {
                let margin = self.config.deal_margin_pct;
                match &analysis.statistics {
                    Some(stats) if stats.latest <= stats.mean * (1.0 - margin / 100.0) => (
                        Action::Buy,
                        format!(
                            "Prices are stable and the latest price is at least {:.1}% below average, which is a good deal.",
                            margin
                        ),
                    ),
                    _ => (
                        Action::Hold,
                        "Prices are stable without a notable discount, so there is no urgency to buy.".to_string(),
                    ),
                }
            }
            TrendDirection::Unknown => (
                Action::Wait,
                "The price trend cannot be determined yet.".to_string(),
            ),
        }
    }
}

fn rule_based_explanation(analysis: &AnalysisResult) -> String {
    let Some(stats) = analysis.statistics.as_ref() else {
        return "No price data was available for analysis.".to_string();
    };

    let scope = if stats.regions.is_empty() {
        String::new()
    } else {
        format!(" in {}", stats.regions.join(", "))
    };
    let mut text = format!(
        "Observed {} prices from {} vendors{} averaging {:.2} {} (range {:.2}-{:.2}, latest {:.2}).",
        stats.count,
        stats.vendor_count,
        scope,
        stats.mean,
        stats.currency,
        stats.min,
        stats.max,
        stats.latest
    );
    if analysis.regional_statistics.len() > 1 {
        text.push_str(&format!(
            " Regional price levels: {}.",
            regional_levels(&analysis.regional_statistics)
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BestOffer, Currency, DegradationReason, PriceStatistics};

    fn stats(mean: f64, latest: f64) -> PriceStatistics {
        PriceStatistics {
            currency: Currency::Usd,
            count: 4,
            mean,
            min: 950.0,
            max: 1100.0,
            latest,
            std_dev: 20.0,
            vendor_count: 2,
            regions: vec!["US".to_string()],
        }
    }

    fn analysis(
        trend: TrendDirection,
        confidence: f64,
        source: AnalysisSource,
        statistics: Option<PriceStatistics>,
    ) -> AnalysisResult {
        AnalysisResult {
            summary: "summary".to_string(),
            trend_direction: trend,
            confidence,
            reasoning_trace: match source {
                AnalysisSource::Llm => vec!["prices rose 5% this week".to_string()],
                AnalysisSource::Fallback => Vec::new(),
            },
            source,
            degradation: match source {
                AnalysisSource::Llm => None,
                AnalysisSource::Fallback => Some(DegradationReason::LlmDisabled),
            },
            statistics,
            regional_statistics: Default::default(),
            best_offers: Vec::new(),
        }
    }

    fn agent() -> RecommendationAgent {
        RecommendationAgent::new(RecommendationConfig::default())
    }

    #[test]
    fn test_action_rules() {
        let s = Some(stats(1000.0, 1000.0));
        let cases = [
            (TrendDirection::Increasing, 0.8, Action::Buy),
            (TrendDirection::Decreasing, 0.8, Action::Wait),
            (TrendDirection::Stable, 0.8, Action::Hold),
            (TrendDirection::Unknown, 0.8, Action::Wait),
            (TrendDirection::Increasing, 0.3, Action::Wait),
        ];
        for (trend, confidence, expected) in cases {
            let result =
                agent().recommend(&analysis(trend, confidence, AnalysisSource::Llm, s.clone()));
            assert_eq!(result.action, expected, "{:?} @ {}", trend, confidence);
        }

        let deal = agent().recommend(&analysis(
            TrendDirection::Stable,
            0.8,
            AnalysisSource::Llm,
            Some(stats(1000.0, 940.0)),
        ));
        assert_eq!(deal.action, Action::Buy);
    }

    #[test]
    fn test_llm_reasoning_in_explanation() {
        let result = agent().recommend(&analysis(
            TrendDirection::Increasing,
            0.8,
            AnalysisSource::Llm,
            Some(stats(1000.0, 1050.0)),
        ));
        assert!(result.explanation.contains("prices rose 5% this week"));
        assert!(!result.explanation.contains("fallback"));
        assert_eq!(
            result.target_price_band,
            Some(PriceBand {
                low: 950.0,
                high: 1000.0,
                currency: Currency::Usd
            })
        );
    }

    #[test]
    fn test_fallback_explanation_discloses_source() {
        let result = agent().recommend(&analysis(
            TrendDirection::Stable,
            0.3,
            AnalysisSource::Fallback,
            Some(stats(1024.0, 1024.0)),
        ));
        assert_eq!(result.action, Action::Wait);
        assert_eq!(result.source, AnalysisSource::Fallback);
        assert!(result.explanation.contains("source: fallback"));
        assert!(result.explanation.contains("rule-based fallback"));
        assert!(result.explanation.contains("averaging 1024.00 USD"));
    }

    #[test]
    fn test_recommendation_is_deterministic() {
        let input = analysis(
            TrendDirection::Decreasing,
            0.7,
            AnalysisSource::Llm,
            Some(stats(1000.0, 980.0)),
        );
        let first = serde_json::to_string(&agent().recommend(&input)).unwrap();
        let second = serde_json::to_string(&agent().recommend(&input)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_data() {
        let result = agent().recommend(&analysis(
            TrendDirection::Unknown,
            0.0,
            AnalysisSource::Fallback,
            None,
        ));
        assert_eq!(result.action, Action::Wait);
        assert!(result.target_price_band.is_none());
        assert!(result.explanation.contains("No price data"));
    }

    fn offer(vendor: &str, region: &str, price: f64, currency: Currency) -> BestOffer {
        BestOffer {
            vendor: vendor.to_string(),
            region: region.to_string(),
            price,
            currency,
            url: Some(format!("https://{}/p/1", vendor)),
            value_score: 50.0,
        }
    }

    #[test]
    fn test_best_offer_named_in_explanation() {
        let mut input = analysis(
            TrendDirection::Increasing,
            0.8,
            AnalysisSource::Llm,
            Some(stats(1000.0, 1050.0)),
        );
        input.best_offers = vec![
            offer("walmart.com", "US", 949.0, Currency::Usd),
            offer("amazon.com", "US", 999.0, Currency::Usd),
        ];

        let result = agent().recommend(&input);
        assert_eq!(result.action, Action::Buy);
        assert_eq!(result.best_offer().map(|o| o.vendor.as_str()), Some("walmart.com"));
        assert_eq!(result.best_offers.len(), 2);
        assert!(result.explanation.contains("Best offer: walmart.com (US) at 949.00 USD."));
    }

    #[test]
    fn test_rule_based_explanation_lists_regions() {
        let mut uk = stats(850.0, 850.0);
        uk.currency = Currency::Gbp;
        uk.regions = vec!["UK".to_string()];
        let mut input = analysis(
            TrendDirection::Stable,
            0.3,
            AnalysisSource::Fallback,
            Some(stats(1000.0, 1000.0)),
        );
        input.regional_statistics = [
            ("UK".to_string(), uk),
            ("US".to_string(), stats(1000.0, 1000.0)),
        ]
        .into_iter()
        .collect();

        let result = agent().recommend(&input);
        assert!(result.explanation.contains("vendors in US averaging 1000.00 USD"));
        assert!(result.explanation.contains(
            "Regional price levels: UK 850.00 GBP (4 prices), US 1000.00 USD (4 prices)."
        ));
    }
}
