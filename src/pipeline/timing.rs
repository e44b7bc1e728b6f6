use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::types::{StageName, StageRecord, StageStatus};

/// 阶段计时，生成写入 `PipelineRun` 的阶段记录
pub struct StageClock {
    start_time: Instant,
    stage_starts: HashMap<StageName, (Instant, DateTime<Utc>)>,
    stage_durations: Vec<(StageName, Duration, StageStatus)>,
}

impl Default for StageClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StageClock {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            stage_starts: HashMap::new(),
            stage_durations: Vec::new(),
        }
    }

    /// 开始一个阶段的计时
    pub fn start(&mut self, stage: StageName) {
        tracing::info!(stage = stage.as_str(), "▶️ 进入阶段：{}", stage);
        self.stage_starts.insert(stage, (Instant::now(), Utc::now()));
    }

    /// 结束阶段计时并生成阶段记录，未调用 `start` 时按零耗时处理
    pub fn finish(
        &mut self,
        stage: StageName,
        status: StageStatus,
        error: Option<String>,
        note: Option<String>,
    ) -> StageRecord {
        let finished_at = Utc::now();
        let (duration, started_at) = match self.stage_starts.remove(&stage) {
            Some((instant, started_at)) => (instant.elapsed(), started_at),
            None => (Duration::ZERO, finished_at),
        };
        self.stage_durations.push((stage, duration, status));

        tracing::info!(
            stage = stage.as_str(),
            status = %status,
            "⏹️ 阶段 {} 结束 ({})，耗时 {:.3}秒",
            stage,
            status,
            duration.as_secs_f64()
        );

        StageRecord {
            stage,
            status,
            started_at,
            finished_at,
            duration_ms: duration.as_millis() as u64,
            error,
            note,
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn stage_duration(&self, stage: StageName) -> Option<Duration> {
        self.stage_durations
            .iter()
            .find(|(name, _, _)| *name == stage)
            .map(|(_, duration, _)| *duration)
    }

    /// 格式化的执行时间报告
    pub fn timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.total_duration().as_secs_f64()
        );

        if !self.stage_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (stage, duration, status) in &self.stage_durations {
                report.push_str(&format!(
                    "- {}: {:.3}秒 ({})\n",
                    stage,
                    duration.as_secs_f64(),
                    status
                ));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_records_and_report() {
        let mut clock = StageClock::new();
        clock.start(StageName::Planning);
        std::thread::sleep(Duration::from_millis(5));
        let record = clock.finish(
            StageName::Planning,
            StageStatus::Succeeded,
            None,
            Some("3 targets".to_string()),
        );

        assert_eq!(record.stage, StageName::Planning);
        assert!(record.duration_ms >= 5);
        assert!(record.finished_at >= record.started_at);
        assert_eq!(record.note.as_deref(), Some("3 targets"));
        assert!(clock.stage_duration(StageName::Planning).is_some());
        assert!(clock.stage_duration(StageName::Scraping).is_none());

        let report = clock.timing_report();
        assert!(report.contains("总执行时间"));
        assert!(report.contains("- planning:"));
        assert!(report.contains("(succeeded)"));
    }

    #[test]
    fn test_finish_without_start() {
        let mut clock = StageClock::new();
        let record = clock.finish(
            StageName::Analyzing,
            StageStatus::Degraded,
            None,
            None,
        );
        assert_eq!(record.duration_ms, 0);
        assert_eq!(record.started_at, record.finished_at);
    }
}
