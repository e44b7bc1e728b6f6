//! 抓取错误分类与重试策略

use std::time::Duration;

use super::normalizer::NormalizationError;
use super::service::ScrapeError;
use crate::types::ScrapeErrorKind;

/// 对单次失败的处理决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    /// 等待固定时间后重试一次
    RetryAfter(Duration),
    /// 记录并跳过该目标
    RecordAndSkip,
}

/// 抓取错误处理器
#[derive(Debug, Clone)]
pub struct ScrapingErrorHandler {
    backoff: Duration,
}

impl ScrapingErrorHandler {
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    /// 错误分类
    pub fn classify(&self, error: &ScrapeError) -> ScrapeErrorKind {
        match error {
            ScrapeError::Timeout { .. } | ScrapeError::Connection { .. } => {
                ScrapeErrorKind::Transient
            }
            ScrapeError::Blocked { .. } => ScrapeErrorKind::Blocked,
            ScrapeError::Normalization { source, .. } => classify_normalization(source),
            ScrapeError::Other { .. } => ScrapeErrorKind::Unknown,
        }
    }

    /// 根据错误类型与已尝试次数决定是否重试，仅临时错误且首次失败时重试
    pub fn decide(&self, kind: ScrapeErrorKind, attempt: u32) -> ErrorDecision {
        match kind {
            ScrapeErrorKind::Transient if attempt <= 1 => ErrorDecision::RetryAfter(self.backoff),
            _ => ErrorDecision::RecordAndSkip,
        }
    }

    /// 分类并给出处理决定
    pub fn handle(
        &self,
        label: &str,
        error: &ScrapeError,
        attempt: u32,
    ) -> (ScrapeErrorKind, ErrorDecision) {
        let kind = self.classify(error);
        let decision = self.decide(kind, attempt);
        match decision {
            ErrorDecision::RetryAfter(delay) => tracing::warn!(
                target_label = %label,
                kind = %kind,
                "🔁 抓取 {} 出现临时错误，{}ms 后重试: {}",
                label,
                delay.as_millis(),
                error
            ),
            ErrorDecision::RecordAndSkip => tracing::warn!(
                target_label = %label,
                kind = %kind,
                "⚠️ 放弃抓取 {} (第 {} 次尝试): {}",
                label,
                attempt,
                error
            ),
        }
        (kind, decision)
    }
}

fn classify_normalization(error: &NormalizationError) -> ScrapeErrorKind {
    match error {
        NormalizationError::HttpStatus(status) => classify_status(*status),
        NormalizationError::EmptyPayload => ScrapeErrorKind::Transient,
        NormalizationError::BotChallenge(_) => ScrapeErrorKind::Blocked,
        NormalizationError::UnrecognizedShape(_) | NormalizationError::NoPriceFound => {
            ScrapeErrorKind::SiteStructureChanged
        }
    }
}

fn classify_status(status: u16) -> ScrapeErrorKind {
    match status {
        408 | 500..=599 => ScrapeErrorKind::Transient,
        401 | 403 | 429 => ScrapeErrorKind::Blocked,
        404 | 410 => ScrapeErrorKind::SiteStructureChanged,
        _ => ScrapeErrorKind::Unknown,
    }
}
