//! 确定性的模拟抓取服务，用于离线运行与测试

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::service::{ScrapeError, ScrapingService};
use crate::types::{Currency, RawPayload, RawScrapeResult, ScrapeTarget};

/// 美元基准价
const BASE_PRICES: &[(&str, f64)] = &[
    ("iphone 15 pro max", 1199.0),
    ("iphone 15 pro", 999.0),
    ("iphone 15", 799.0),
    ("galaxy s24 ultra", 1299.0),
    ("galaxy s24", 799.0),
    ("pixel 8 pro", 999.0),
    ("pixel 8", 699.0),
    ("xiaomi 14", 699.0),
    ("huawei p60", 899.0),
];

const UNKNOWN_BASE_PRICE: f64 = 599.0;

fn region_multiplier(region: &str) -> f64 {
    match region {
        "UK" | "GB" => 1.15,
        "EU" | "DE" => 1.1,
        "BR" => 1.2,
        "IN" => 0.9,
        "JP" => 1.05,
        "CN" => 0.95,
        _ => 1.0,
    }
}

/// 模拟的失败方式
#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    Connection,
    Blocked,
    /// 返回的页面中没有价格信息
    Malformed,
    HttpStatus(u16),
}

#[derive(Debug, Clone)]
enum Behavior {
    Prices(Vec<f64>),
    Fail(MockFailure),
}

/// 模拟抓取服务
#[derive(Debug, Default)]
pub struct MockScrapingService {
    behaviors: HashMap<String, Behavior>,
    delays: HashMap<String, Duration>,
    transient_failures: HashMap<String, u32>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MockScrapingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定站点返回固定价格
    pub fn with_prices(mut self, site_id: impl Into<String>, prices: Vec<f64>) -> Self {
        self.behaviors.insert(site_id.into(), Behavior::Prices(prices));
        self
    }

    /// 指定站点始终失败
    pub fn with_failure(mut self, site_id: impl Into<String>, failure: MockFailure) -> Self {
        self.behaviors.insert(site_id.into(), Behavior::Fail(failure));
        self
    }

    /// 指定站点前 `times` 次请求出现连接错误
    pub fn with_transient_failures(mut self, site_id: impl Into<String>, times: u32) -> Self {
        self.transient_failures.insert(site_id.into(), times);
        self
    }

    /// 指定站点的响应延迟
    pub fn with_delay(mut self, site_id: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(site_id.into(), delay);
        self
    }

    /// 站点被请求的次数
    pub fn call_count(&self, site_id: &str) -> u32 {
        self.calls
            .lock()
            .map(|calls| calls.get(site_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn register_call(&self, site_id: &str) -> u32 {
        match self.calls.lock() {
            Ok(mut calls) => {
                let count = calls.entry(site_id.to_string()).or_insert(0);
                *count += 1;
                *count
            }
            Err(_) => 0,
        }
    }

    fn generated_prices(target: &ScrapeTarget) -> Vec<f64> {
        let model = target.device_model.to_lowercase();
        let base = BASE_PRICES
            .iter()
            .find(|(name, _)| model.contains(name))
            .map(|(_, price)| *price)
            .unwrap_or(UNKNOWN_BASE_PRICE);
        let regional = base * region_multiplier(&target.region);

        let mut hasher = DefaultHasher::new();
        (&target.device_model, &target.site_id, &target.region).hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());

        let count = rng.random_range(3..=5);
        (0..count)
            .map(|_| {
                let variation: f64 = rng.random_range(0.93..1.07);
                ((regional * variation) * 100.0).round() / 100.0
            })
            .collect()
    }

    fn failure(
        &self,
        target: &ScrapeTarget,
        failure: &MockFailure,
    ) -> Result<RawScrapeResult, ScrapeError> {
        match failure {
            MockFailure::Connection => Err(ScrapeError::Connection {
                site_id: target.site_id.clone(),
                message: "connection reset by peer".to_string(),
            }),
            MockFailure::Blocked => Err(ScrapeError::Blocked {
                site_id: target.site_id.clone(),
                reason: "request rejected by bot protection".to_string(),
            }),
            MockFailure::Malformed => Ok(self.raw(
                target,
                RawPayload::Html("<html><body><div>layout changed</div></body></html>".to_string()),
                200,
            )),
            MockFailure::HttpStatus(status) => Ok(self.raw(
                target,
                RawPayload::Html(String::new()),
                *status,
            )),
        }
    }

    fn raw(&self, target: &ScrapeTarget, payload: RawPayload, status: u16) -> RawScrapeResult {
        RawScrapeResult {
            site_id: target.site_id.clone(),
            region: target.region.clone(),
            source_url: target.url(),
            raw_payload: payload,
            fetched_at: Utc::now(),
            status,
        }
    }
}

#[async_trait]
impl ScrapingService for MockScrapingService {
    async fn scrape(&self, target: &ScrapeTarget) -> Result<RawScrapeResult, ScrapeError> {
        let call = self.register_call(&target.site_id);

        if let Some(delay) = self.delays.get(&target.site_id) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(times) = self.transient_failures.get(&target.site_id)
            && call <= *times
        {
            return self.failure(target, &MockFailure::Connection);
        }

        let prices = match self.behaviors.get(&target.site_id) {
            Some(Behavior::Fail(failure)) => return self.failure(target, failure),
            Some(Behavior::Prices(prices)) => prices.clone(),
            None => Self::generated_prices(target),
        };

        let currency = Currency::for_region(&target.region).unwrap_or(Currency::Usd);
        let fetched_at = Utc::now();
        let results: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(index, price)| {
                json!({
                    "title": format!("{} ({})", target.device_model, index + 1),
                    "price": price,
                    "currency": currency.code(),
                    "url": format!("{}#offer-{}", target.url(), index + 1),
                    "store": target.site_id,
                    "date": fetched_at.to_rfc3339(),
                })
            })
            .collect();

        Ok(RawScrapeResult {
            site_id: target.site_id.clone(),
            region: target.region.clone(),
            source_url: target.url(),
            raw_payload: RawPayload::Json(json!({ "results": results })),
            fetched_at,
            status: 200,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(site_id: &str, region: &str) -> ScrapeTarget {
        ScrapeTarget {
            site_id: site_id.to_string(),
            url_template: format!("https://www.{}/search?q={{query}}", site_id),
            region: region.to_string(),
            device_model: "iPhone 15".to_string(),
            priority: 1,
            score: 0.5,
            last_success_at: None,
        }
    }

    #[tokio::test]
    async fn test_generated_prices_are_deterministic_and_regional() {
        let service = MockScrapingService::new();
        let first = MockScrapingService::generated_prices(&target("amazon.com", "US"));
        let second = MockScrapingService::generated_prices(&target("amazon.com", "US"));
        assert_eq!(first, second);
        assert!((3..=5).contains(&first.len()));
        assert!(first.iter().all(|p| (799.0 * 0.92..=799.0 * 1.08).contains(p)));

        let uk = service.scrape(&target("amazon.co.uk", "UK")).await.unwrap();
        let RawPayload::Json(value) = uk.raw_payload else {
            panic!("expected JSON payload");
        };
        assert_eq!(value["results"][0]["currency"], "GBP");
    }

    #[tokio::test]
    async fn test_fixed_prices_and_failures() {
        let service = MockScrapingService::new()
            .with_prices("amazon.com", vec![999.0])
            .with_failure("walmart.com", MockFailure::Blocked)
            .with_transient_failures("target.com", 1);

        let ok = service.scrape(&target("amazon.com", "US")).await.unwrap();
        assert_eq!(ok.status, 200);

        assert!(matches!(
            service.scrape(&target("walmart.com", "US")).await,
            Err(ScrapeError::Blocked { .. })
        ));

        assert!(service.scrape(&target("target.com", "US")).await.is_err());
        assert!(service.scrape(&target("target.com", "US")).await.is_ok());
        assert_eq!(service.call_count("target.com"), 2);
    }
}
