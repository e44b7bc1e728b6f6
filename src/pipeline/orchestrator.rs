use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;

use super::bridge::AsyncBridge;
use super::context::PipelineContext;
use super::timing::StageClock;
use crate::agents::{AnalysisAgent, PlanningAgent, RecommendationAgent, ScrapingAgent};
use crate::analyzer::AnalysisContext;
use crate::error::PipelineError;
use crate::scraping::SiteCatalog;
use crate::types::{
    AnalysisInput, PipelineRun, PipelineState, PriceQuery, Recommendation, StageName,
    StageStatus,
};

/// 一次运行的结果与观测记录
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub run: PipelineRun,
    #[serde(serialize_with = "serialize_outcome")]
    pub outcome: Result<Recommendation, PipelineError>,
}

impl PipelineReport {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.outcome.as_ref().ok()
    }

    pub fn into_result(self) -> Result<Recommendation, PipelineError> {
        self.outcome
    }
}

fn serialize_outcome<S>(
    outcome: &Result<Recommendation, PipelineError>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    #[derive(Serialize)]
    #[serde(rename_all = "lowercase")]
    enum Outcome<'a> {
        Recommendation(&'a Recommendation),
        Error(String),
    }

    match outcome {
        Ok(recommendation) => Outcome::Recommendation(recommendation).serialize(serializer),
        Err(e) => Outcome::Error(e.to_string()).serialize(serializer),
    }
}

/// 流水线编排：Planning → Scraping → Analyzing → Recommending 严格顺序执行
pub struct PipelineOrchestrator {
    context: PipelineContext,
    planner: PlanningAgent,
    scraper: ScrapingAgent,
    analyzer: AnalysisAgent,
    recommender: RecommendationAgent,
}

impl PipelineOrchestrator {
    pub fn new(context: PipelineContext) -> Self {
        let config = &context.config;
        Self {
            planner: PlanningAgent::new(SiteCatalog::new(), config.planning.clone()),
            scraper: ScrapingAgent::new(context.scraping_service.clone(), &config.scraping),
            analyzer: AnalysisAgent::new(context.llm_client.clone(), config.analysis.clone()),
            recommender: RecommendationAgent::new(config.recommendation.clone()),
            context,
        }
    }

    /// 替换抓取阶段，便于调整单目标超时等参数
    pub fn with_scraping_agent(mut self, scraper: ScrapingAgent) -> Self {
        self.scraper = scraper;
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// 同步入口：在独立运行时中执行完整流水线
    pub fn run_pipeline(&self, query: PriceQuery) -> PipelineReport {
        match AsyncBridge::new().run(self.execute(query.clone())) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("❌ 流水线无法执行: {}", e);
                let mut run = PipelineRun::new(query);
                run.state = PipelineState::Failed;
                run.finished_at = Some(Utc::now());
                PipelineReport {
                    run,
                    outcome: Err(e.into()),
                }
            }
        }
    }

    pub async fn execute(&self, query: PriceQuery) -> PipelineReport {
        let mut run = PipelineRun::new(query.clone());
        let mut clock = StageClock::new();
        let deadline = Instant::now() + self.context.config.run_timeout();

        tracing::info!(
            run_id = %run.run_id,
            "🚀 开始价格分析：{}",
            query.device_model
        );

        let outcome = self.drive(&query, &mut run, &mut clock, deadline).await;
        match &outcome {
            Ok(recommendation) => tracing::info!(
                run_id = %run.run_id,
                action = %recommendation.action,
                source = %recommendation.source,
                "🎉 流水线完成，建议：{}",
                recommendation.action
            ),
            Err(e) => tracing::error!(
                run_id = %run.run_id,
                stage = ?e.stage(),
                "❌ 流水线失败: {}",
                e
            ),
        }

        // 运行结束后才回写历史
        if let Err(e) = self.context.history.record_run_outcome(&run).await {
            tracing::warn!(run_id = %run.run_id, "⚠️ 写入运行历史失败: {}", e);
        }
        tracing::info!("⏱️ 流水线执行耗时统计:\n{}", clock.timing_report());

        PipelineReport { run, outcome }
    }

    async fn drive(
        &self,
        query: &PriceQuery,
        run: &mut PipelineRun,
        clock: &mut StageClock,
        deadline: Instant,
    ) -> Result<Recommendation, PipelineError> {
        let run_timeout = self.context.config.run_timeout();

        // 1. 规划
        run.advance(PipelineState::Planning);
        clock.start(StageName::Planning);
        let planned = tokio::time::timeout_at(
            deadline,
            self.planner.execute(query, self.context.history.as_ref()),
        )
        .await;
        let targets = match planned {
            Ok(Ok(targets)) => targets,
            Ok(Err(e)) => return Err(fail(run, clock, StageName::Planning, e.into())),
            Err(_) => {
                let error = PipelineError::TimeoutExceeded {
                    stage: StageName::Planning,
                    timeout: run_timeout,
                };
                return Err(fail(run, clock, StageName::Planning, error));
            }
        };
        run.record_stage(clock.finish(
            StageName::Planning,
            StageStatus::Succeeded,
            None,
            Some(format!("{} targets planned", targets.len())),
        ));

        // 2. 抓取
        run.advance(PipelineState::Scraping);
        clock.start(StageName::Scraping);
        let scraped = match self.scraper.execute(&targets, Some(deadline)).await {
            Ok(outcome) => outcome,
            Err(exhausted) => {
                run.target_outcomes = exhausted.statuses.clone();
                let error = if exhausted.cancelled {
                    PipelineError::TimeoutExceeded {
                        stage: StageName::Scraping,
                        timeout: run_timeout,
                    }
                } else {
                    exhausted.into()
                };
                return Err(fail(run, clock, StageName::Scraping, error));
            }
        };
        run.target_outcomes = scraped.statuses.clone();
        if scraped.cancelled {
            let error = PipelineError::TimeoutExceeded {
                stage: StageName::Scraping,
                timeout: run_timeout,
            };
            return Err(fail(run, clock, StageName::Scraping, error));
        }
        let scrape_note = format!(
            "{}/{} targets succeeded, {} records",
            scraped.succeeded(),
            scraped.statuses.len(),
            scraped.records.len()
        );
        let scrape_status = if scraped.is_partial() {
            StageStatus::Degraded
        } else {
            StageStatus::Succeeded
        };
        run.record_stage(clock.finish(StageName::Scraping, scrape_status, None, Some(scrape_note)));

        // 3. 分析，LLM超时不超过剩余的运行时间
        run.advance(PipelineState::Analyzing);
        clock.start(StageName::Analyzing);
        let input = AnalysisInput::from_records(query.device_model.trim(), scraped.records);
        let context = AnalysisContext {
            device_model: query.device_model.trim().to_string(),
            category: self
                .planner
                .catalog()
                .product_category(&query.device_model)
                .as_str()
                .to_string(),
            regions: input.region_codes(),
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        let llm_timeout = self.context.config.llm.timeout().min(remaining);
        let analysis = self.analyzer.execute(input, context, llm_timeout).await;
        let (analysis_status, analysis_note) = match &analysis.degradation {
            Some(reason) => (StageStatus::Degraded, Some(format!("fallback: {}", reason))),
            None => (StageStatus::Succeeded, Some("llm".to_string())),
        };
        run.record_stage(clock.finish(
            StageName::Analyzing,
            analysis_status,
            None,
            analysis_note,
        ));

        // 4. 生成建议
        run.advance(PipelineState::Recommending);
        clock.start(StageName::Recommending);
        let recommendation = self.recommender.recommend(&analysis);
        run.record_stage(clock.finish(
            StageName::Recommending,
            StageStatus::Succeeded,
            None,
            Some(format!("action: {}", recommendation.action)),
        ));
        run.advance(PipelineState::Done);

        Ok(recommendation)
    }
}

/// 记录失败阶段并结束运行
fn fail(
    run: &mut PipelineRun,
    clock: &mut StageClock,
    stage: StageName,
    error: PipelineError,
) -> PipelineError {
    run.record_stage(clock.finish(stage, StageStatus::Failed, Some(error.to_string()), None));
    run.advance(PipelineState::Failed);
    error
}
