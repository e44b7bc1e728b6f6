//! 站点历史表现存储
//!
//! 规划阶段只读取成功率；运行结束后由编排器调用 `record_run_outcome` 回写结果。

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::{PipelineRun, TargetOutcome};

/// 保留的最近运行记录数
const MAX_RECENT_RUNS: usize = 50;

/// 单个站点的历史表现
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteHistory {
    /// 成功率 0.0-1.0
    pub success_rate: f64,
    /// 已记录的抓取次数
    pub attempts: u32,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// 历史存储
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 站点成功率，无数据时返回 `None`
    async fn get_success_rate(&self, site_id: &str) -> Option<f64>;

    /// 站点完整历史，默认只携带成功率
    async fn site_history(&self, site_id: &str) -> Option<SiteHistory> {
        self.get_success_rate(site_id).await.map(|rate| SiteHistory {
            success_rate: rate.clamp(0.0, 1.0),
            attempts: 0,
            last_success_at: None,
        })
    }

    /// 运行结束后写入结果
    async fn record_run_outcome(&self, run: &PipelineRun) -> Result<()>;
}

/// 内存中的历史存储
#[derive(Default)]
pub struct InMemoryHistoryStore {
    sites: RwLock<HashMap<String, SiteHistory>>,
    recent_runs: RwLock<Vec<PipelineRun>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以主流商家的历史表现作为初始数据（成功率 × 数据质量）
    pub fn with_seeded_defaults() -> Self {
        let seeded = [
            ("amazon.com", 0.92, 0.95),
            ("bestbuy.com", 0.88, 0.90),
            ("walmart.com", 0.85, 0.82),
            ("apple.com", 0.95, 0.98),
            ("target.com", 0.80, 0.75),
            ("bhphotovideo.com", 0.90, 0.92),
            ("samsung.com", 0.93, 0.94),
            ("google.com/store", 0.91, 0.93),
        ];

        let sites = seeded
            .into_iter()
            .map(|(site, success, quality)| {
                (
                    site.to_string(),
                    SiteHistory {
                        success_rate: success * quality,
                        attempts: 50,
                        last_success_at: None,
                    },
                )
            })
            .collect();

        Self {
            sites: RwLock::new(sites),
            recent_runs: RwLock::new(Vec::new()),
        }
    }

    pub async fn insert(&self, site_id: impl Into<String>, history: SiteHistory) {
        self.sites.write().await.insert(site_id.into(), history);
    }

    pub async fn recent_runs(&self) -> Vec<PipelineRun> {
        self.recent_runs.read().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get_success_rate(&self, site_id: &str) -> Option<f64> {
        self.sites
            .read()
            .await
            .get(site_id)
            .map(|history| history.success_rate)
    }

    async fn site_history(&self, site_id: &str) -> Option<SiteHistory> {
        self.sites.read().await.get(site_id).cloned()
    }

    async fn record_run_outcome(&self, run: &PipelineRun) -> Result<()> {
        let observed_at = run.finished_at.unwrap_or_else(Utc::now);

        {
            let mut sites = self.sites.write().await;
            for status in &run.target_outcomes {
                // 被取消的目标不代表站点表现
                let hit = match status.outcome {
                    TargetOutcome::Succeeded => 1.0,
                    TargetOutcome::Failed => 0.0,
                    TargetOutcome::Cancelled => continue,
                };

                let entry = sites.entry(status.site_id.clone()).or_insert(SiteHistory {
                    success_rate: 0.5,
                    attempts: 0,
                    last_success_at: None,
                });
                let n = entry.attempts as f64;
                entry.success_rate = ((entry.success_rate * n + hit) / (n + 1.0)).clamp(0.0, 1.0);
                entry.attempts = entry.attempts.saturating_add(1);
                if status.outcome == TargetOutcome::Succeeded {
                    entry.last_success_at = Some(observed_at);
                }
            }
        }

        let mut runs = self.recent_runs.write().await;
        runs.push(run.clone());
        if runs.len() > MAX_RECENT_RUNS {
            let overflow = runs.len() - MAX_RECENT_RUNS;
            runs.drain(..overflow);
        }

        tracing::debug!(run_id = %run.run_id, "📝 已记录运行结果到历史存储");
        Ok(())
    }
}
