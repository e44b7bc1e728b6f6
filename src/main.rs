use anyhow::{Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use smartninja_rs::cli::Args;
use smartninja_rs::pipeline::{PipelineContext, PipelineOrchestrator, PipelineReport};

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.into_config()?;
    init_tracing(config.verbose);

    let context = PipelineContext::new(config)?;
    let orchestrator = PipelineOrchestrator::new(context);
    let report = orchestrator.run_pipeline(args.to_query());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match report.outcome {
        Ok(_) => Ok(()),
        Err(e) => Err(anyhow!("price analysis failed: {}", e)),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "smartninja_rs=debug"
    } else {
        "smartninja_rs=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_report(report: &PipelineReport) {
    let run = &report.run;
    println!("📱 {} ({})", run.query.device_model, run.run_id);

    match &report.outcome {
        Ok(recommendation) => {
            println!(
                "\n💡 建议: {} (置信度 {:.2}, 来源 {})",
                recommendation.action.to_string().to_uppercase(),
                recommendation.confidence,
                recommendation.source
            );
            if let Some(band) = &recommendation.target_price_band {
                println!("🎯 目标价格区间: {}", band);
            }
            if !recommendation.best_offers.is_empty() {
                println!("\n🏷️ 最佳报价:");
                for (rank, offer) in recommendation.best_offers.iter().take(5).enumerate() {
                    println!(
                        "{}. {}  {}",
                        rank + 1,
                        offer,
                        offer.url.as_deref().unwrap_or_default()
                    );
                }
            }
            println!("\n{}", recommendation.explanation);
        }
        Err(e) => {
            println!("\n❌ 运行失败: {}", e);
        }
    }

    println!("\n📊 阶段状态:");
    for stage in &run.stage_statuses {
        let detail = stage
            .error
            .as_deref()
            .or(stage.note.as_deref())
            .unwrap_or_default();
        println!(
            "- {:<12} {:<10} {:>6}ms  {}",
            stage.stage.as_str(),
            stage.status.to_string(),
            stage.duration_ms,
            detail
        );
    }

    if !run.target_outcomes.is_empty() {
        println!("\n🌐 抓取目标:");
        for target in &run.target_outcomes {
            let error = target.error.as_deref().unwrap_or_default();
            println!(
                "- {}@{} {:?} ({} 条记录, {} 次尝试) {}",
                target.site_id,
                target.region,
                target.outcome,
                target.records,
                target.attempts,
                error
            );
        }
    }
}
