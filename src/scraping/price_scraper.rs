use std::sync::Arc;
use std::time::Duration;

use super::service::{ScrapeError, ScrapingService};
use crate::types::{RawScrapeResult, ScrapeTarget};

/// 通过抓取服务获取单个目标的原始结果，并对每次请求施加超时
#[derive(Clone)]
pub struct PriceScraper {
    service: Arc<dyn ScrapingService>,
    target_timeout: Duration,
}

impl PriceScraper {
    pub fn new(service: Arc<dyn ScrapingService>, target_timeout: Duration) -> Self {
        Self {
            service,
            target_timeout,
        }
    }

    pub fn with_target_timeout(mut self, target_timeout: Duration) -> Self {
        self.target_timeout = target_timeout;
        self
    }

    pub async fn fetch(&self, target: &ScrapeTarget) -> Result<RawScrapeResult, ScrapeError> {
        match tokio::time::timeout(self.target_timeout, self.service.scrape(target)).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout {
                site_id: target.site_id.clone(),
                timeout: self.target_timeout,
            }),
        }
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub fn target_timeout(&self) -> Duration {
        self.target_timeout
    }
}
