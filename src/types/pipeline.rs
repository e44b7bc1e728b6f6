use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::price::{PriceQuery, TargetStatus};

/// 流水线阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Planning,
    Scraping,
    Analyzing,
    Recommending,
}

impl StageName {
    pub fn all() -> [StageName; 4] {
        [
            StageName::Planning,
            StageName::Scraping,
            StageName::Analyzing,
            StageName::Recommending,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Planning => "planning",
            StageName::Scraping => "scraping",
            StageName::Analyzing => "analyzing",
            StageName::Recommending => "recommending",
        }
    }

    pub fn state(&self) -> PipelineState {
        match self {
            StageName::Planning => PipelineState::Planning,
            StageName::Scraping => PipelineState::Scraping,
            StageName::Analyzing => PipelineState::Analyzing,
            StageName::Recommending => PipelineState::Recommending,
        }
    }
}

impl Display for StageName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 流水线状态机
///
/// `Planning → Scraping → Analyzing → Recommending → Done`，
/// 仅 `Planning` 与 `Scraping` 可以进入 `Failed`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Pending,
    Planning,
    Scraping,
    Analyzing,
    Recommending,
    Done,
    Failed,
}

impl PipelineState {
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Pending, Planning)
                | (Planning, Scraping)
                | (Scraping, Analyzing)
                | (Analyzing, Recommending)
                | (Recommending, Done)
                | (Planning, Failed)
                | (Scraping, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Pending => "pending",
            PipelineState::Planning => "planning",
            PipelineState::Scraping => "scraping",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Recommending => "recommending",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// 阶段执行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Succeeded,
    /// 阶段完成但有部分失败或使用了降级路径
    Degraded,
    Failed,
}

impl Display for StageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageStatus::Succeeded => "succeeded",
            StageStatus::Degraded => "degraded",
            StageStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// 单个阶段的执行记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageRecord {
    pub stage: StageName,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// 一次完整流水线运行的观测记录，不参与业务决策
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub query: PriceQuery,
    pub state: PipelineState,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub stage_statuses: Vec<StageRecord>,
    #[serde(default)]
    pub target_outcomes: Vec<TargetStatus>,
}

impl PipelineRun {
    pub fn new(query: PriceQuery) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query,
            state: PipelineState::Pending,
            started_at: Utc::now(),
            finished_at: None,
            stage_statuses: Vec::new(),
            target_outcomes: Vec::new(),
        }
    }

    /// 推进状态机
    pub fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid pipeline transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn record_stage(&mut self, record: StageRecord) {
        self.stage_statuses.push(record);
    }

    pub fn is_failed(&self) -> bool {
        self.state == PipelineState::Failed
    }

    /// 失败所在的阶段
    pub fn failed_stage(&self) -> Option<StageName> {
        self.stage_statuses
            .iter()
            .find(|record| record.status == StageStatus::Failed)
            .map(|record| record.stage)
    }

    pub fn stage(&self, stage: StageName) -> Option<&StageRecord> {
        self.stage_statuses.iter().find(|record| record.stage == stage)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.stage_statuses.iter().map(|record| record.duration_ms).sum()
    }
}
