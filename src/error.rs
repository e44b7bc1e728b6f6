use std::time::Duration;

use thiserror::Error;

use crate::types::{StageName, TargetStatus};

/// 规划阶段错误：没有任何可用的抓取目标
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("device model must not be empty")]
    EmptyDeviceModel,
    #[error("device model '{0}' does not resolve to any known vendor source")]
    UnknownDevice(String),
    #[error("no vendor source for '{device_model}' matches the vendor filter {vendors:?}")]
    NoVendorSources {
        device_model: String,
        vendors: Vec<String>,
    },
}

/// 所有抓取目标均失败
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ScrapingExhaustedError {
    pub statuses: Vec<TargetStatus>,
    /// 是否因运行超时而被取消
    pub cancelled: bool,
}

impl std::fmt::Display for ScrapingExhaustedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "all {} scrape targets failed", self.statuses.len())?;
        if self.cancelled {
            write!(f, " (cancelled by run timeout)")?;
        }
        Ok(())
    }
}

/// 同步桥接错误
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to build isolated runtime: {0}")]
    RuntimeBuild(#[from] std::io::Error),
    #[error("bridged operation panicked: {0}")]
    Panicked(String),
}

/// 导致流水线进入 `Failed` 状态的错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),
    #[error("scraping failed: {0}")]
    ScrapingExhausted(#[from] ScrapingExhaustedError),
    #[error("run timeout of {timeout:?} exceeded during {stage}")]
    TimeoutExceeded { stage: StageName, timeout: Duration },
    #[error("pipeline could not be executed: {0}")]
    Bridge(#[from] BridgeError),
}

impl PipelineError {
    /// 失败所在的阶段，桥接失败时为 `None`
    pub fn stage(&self) -> Option<StageName> {
        match self {
            PipelineError::Planning(_) => Some(StageName::Planning),
            PipelineError::ScrapingExhausted(_) => Some(StageName::Scraping),
            PipelineError::TimeoutExceeded { stage, .. } => Some(*stage),
            PipelineError::Bridge(_) => None,
        }
    }
}
