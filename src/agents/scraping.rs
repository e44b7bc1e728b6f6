use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};

use tokio::time::Instant;

use crate::config::ScrapingConfig;
use crate::error::ScrapingExhaustedError;
use crate::scraping::{
    ErrorDecision, PriceScraper, ResultNormalizer, ScrapeError, ScrapingErrorHandler,
    ScrapingService,
};
use crate::types::{CanonicalPriceRecord, ScrapeTarget, TargetOutcome, TargetStatus};
use crate::utils::threads::do_parallel_with_limit;

/// 抓取阶段输出
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapingOutcome {
    pub records: Vec<CanonicalPriceRecord>,
    pub statuses: Vec<TargetStatus>,
    /// 是否有目标因截止时间被取消
    pub cancelled: bool,
}

impl ScrapingOutcome {
    pub fn succeeded(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_success()).count()
    }

    /// 部分目标失败
    pub fn is_partial(&self) -> bool {
        self.succeeded() < self.statuses.len()
    }
}

/// 并发抓取所有目标，单个目标的失败不会影响其它目标
pub struct ScrapingAgent {
    scraper: PriceScraper,
    normalizer: ResultNormalizer,
    error_handler: ScrapingErrorHandler,
    max_parallel: usize,
}

impl ScrapingAgent {
    pub fn new(service: Arc<dyn ScrapingService>, config: &ScrapingConfig) -> Self {
        Self {
            scraper: PriceScraper::new(service, config.target_timeout()),
            normalizer: ResultNormalizer::new(),
            error_handler: ScrapingErrorHandler::new(config.transient_retry_backoff()),
            max_parallel: config.max_parallel_scrapes.max(1),
        }
    }

    /// 覆盖单目标超时，精度高于配置文件的秒级设置
    pub fn with_target_timeout(mut self, timeout: Duration) -> Self {
        self.scraper = self.scraper.with_target_timeout(timeout);
        self
    }

    /// 执行抓取；`deadline` 到达时未完成的目标记为取消
    pub async fn execute(
        &self,
        targets: &[ScrapeTarget],
        deadline: Option<Instant>,
    ) -> Result<ScrapingOutcome, ScrapingExhaustedError> {
        tracing::info!(
            service = self.scraper.service_name(),
            "🚀 启动并发抓取，共 {} 个目标，最大并发数：{}",
            targets.len(),
            self.max_parallel
        );

        let futures: Vec<_> = targets
            .iter()
            .map(|target| Box::pin(self.scrape_target(target)))
            .collect();
        let results = do_parallel_with_limit(futures, self.max_parallel, deadline).await;

        let mut records = Vec::new();
        let mut statuses = Vec::with_capacity(targets.len());
        let mut cancelled = false;
        for (target, result) in targets.iter().zip(results) {
            match result {
                Some((status, target_records)) => {
                    records.extend(target_records);
                    statuses.push(status);
                }
                None => {
                    cancelled = true;
                    tracing::warn!(
                        site_id = %target.site_id,
                        region = %target.region,
                        "⏰ 抓取目标 {} 因运行超时被取消",
                        target.label()
                    );
                    statuses.push(TargetStatus {
                        site_id: target.site_id.clone(),
                        region: target.region.clone(),
                        outcome: TargetOutcome::Cancelled,
                        attempts: 0,
                        records: 0,
                        error_kind: None,
                        error: Some("cancelled by run timeout".to_string()),
                        duration_ms: 0,
                    });
                }
            }
        }

        let succeeded = statuses.iter().filter(|s| s.is_success()).count();
        if succeeded == 0 {
            tracing::error!("❌ 所有 {} 个抓取目标均失败", statuses.len());
            return Err(ScrapingExhaustedError {
                statuses,
                cancelled,
            });
        }

        tracing::info!(
            "✅ 抓取完成：成功 {} / {} 个目标，获得 {} 条价格记录",
            succeeded,
            statuses.len(),
            records.len()
        );
        Ok(ScrapingOutcome {
            records,
            statuses,
            cancelled,
        })
    }

    /// 抓取并标准化单个目标，临时错误重试一次
    async fn scrape_target(
        &self,
        target: &ScrapeTarget,
    ) -> (TargetStatus, Vec<CanonicalPriceRecord>) {
        let label = target.label();
        let started = StdInstant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let error = match self.fetch_and_normalize(target).await {
                Ok(records) => {
                    tracing::debug!(
                        site_id = %target.site_id,
                        region = %target.region,
                        "📦 {} 返回 {} 条价格记录",
                        label,
                        records.len()
                    );
                    let status = TargetStatus {
                        site_id: target.site_id.clone(),
                        region: target.region.clone(),
                        outcome: TargetOutcome::Succeeded,
                        attempts: attempt,
                        records: records.len(),
                        error_kind: None,
                        error: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                    };
                    return (status, records);
                }
                Err(error) => error,
            };

            let (kind, decision) = self.error_handler.handle(&label, &error, attempt);
            match decision {
                ErrorDecision::RetryAfter(delay) => tokio::time::sleep(delay).await,
                ErrorDecision::RecordAndSkip => {
                    let status = TargetStatus {
                        site_id: target.site_id.clone(),
                        region: target.region.clone(),
                        outcome: TargetOutcome::Failed,
                        attempts: attempt,
                        records: 0,
                        error_kind: Some(kind),
                        error: Some(error.to_string()),
                        duration_ms: started.elapsed().as_millis() as u64,
                    };
                    return (status, Vec::new());
                }
            }
        }
    }

    async fn fetch_and_normalize(
        &self,
        target: &ScrapeTarget,
    ) -> Result<Vec<CanonicalPriceRecord>, ScrapeError> {
        let raw = self.scraper.fetch(target).await?;
        let site_id = raw.site_id.clone();

        // HTML解析属于CPU密集型工作，放到阻塞线程池执行
        let normalizer = self.normalizer.clone();
        let device_model = target.device_model.clone();
        let normalized =
            tokio::task::spawn_blocking(move || normalizer.normalize(&device_model, &raw)).await;

        match normalized {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(source)) => Err(ScrapeError::Normalization { site_id, source }),
            Err(join_error) => Err(ScrapeError::Other {
                site_id,
                message: format!("normalization task failed: {}", join_error),
            }),
        }
    }
}

#[cfg(test)]
mod tests;
