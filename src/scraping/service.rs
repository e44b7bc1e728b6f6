//! 抓取服务：按目标获取原始搜索结果页

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};

use super::normalizer::NormalizationError;
use crate::config::ScrapingConfig;
use crate::types::{RawPayload, RawScrapeResult, ScrapeTarget};

/// 单个目标的抓取错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScrapeError {
    #[error("scrape of {site_id} timed out after {timeout:?}")]
    Timeout { site_id: String, timeout: Duration },
    #[error("connection to {site_id} failed: {message}")]
    Connection { site_id: String, message: String },
    #[error("{site_id} blocked the request: {reason}")]
    Blocked { site_id: String, reason: String },
    #[error("could not normalize result from {site_id}: {source}")]
    Normalization {
        site_id: String,
        #[source]
        source: NormalizationError,
    },
    #[error("scrape of {site_id} failed: {message}")]
    Other { site_id: String, message: String },
}

/// 抓取服务
#[async_trait]
pub trait ScrapingService: Send + Sync {
    /// 抓取单个目标，返回原始结果
    async fn scrape(&self, target: &ScrapeTarget) -> Result<RawScrapeResult, ScrapeError>;

    fn name(&self) -> &str;
}

/// 基于HTTP的抓取服务，每次调用使用独立的客户端会话
#[derive(Debug, Clone)]
pub struct HttpScrapingService {
    user_agent: String,
    timeout: Duration,
}

impl HttpScrapingService {
    pub fn new(config: &ScrapingConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.target_timeout(),
        }
    }

    fn build_client(&self, site_id: &str) -> Result<reqwest::Client, ScrapeError> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&self.user_agent).map_err(|e| ScrapeError::Other {
            site_id: site_id.to_string(),
            message: format!("invalid user agent: {}", e),
        })?;
        headers.insert(USER_AGENT, user_agent);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );

        reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScrapeError::Other {
                site_id: site_id.to_string(),
                message: format!("failed to create HTTP client: {}", e),
            })
    }
}

#[async_trait]
impl ScrapingService for HttpScrapingService {
    async fn scrape(&self, target: &ScrapeTarget) -> Result<RawScrapeResult, ScrapeError> {
        let url = target.url();
        let site_id = target.site_id.clone();
        let client = self.build_client(&site_id)?;

        tracing::debug!(site_id = %site_id, url = %url, "🌐 请求商家搜索页");

        let response = client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::Timeout {
                    site_id: site_id.clone(),
                    timeout: self.timeout,
                }
            } else {
                ScrapeError::Connection {
                    site_id: site_id.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));

        let body = response.text().await.map_err(|e| ScrapeError::Connection {
            site_id: site_id.clone(),
            message: format!("failed to read response body: {}", e),
        })?;

        let raw_payload = if is_json {
            match serde_json::from_str(&body) {
                Ok(value) => RawPayload::Json(value),
                Err(_) => RawPayload::Html(body),
            }
        } else {
            RawPayload::Html(body)
        };

        Ok(RawScrapeResult {
            site_id,
            region: target.region.clone(),
            source_url: url,
            raw_payload,
            fetched_at: Utc::now(),
            status,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
