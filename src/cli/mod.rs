use crate::config::{Config, DEFAULT_CONFIG_FILE, LLMProvider, ScrapingBackend};
use crate::types::PriceQuery;
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

/// SmartNinja - 由Rust与AI驱动的手机价格追踪与购买建议引擎
#[derive(Parser, Debug)]
#[command(name = "smartninja")]
#[command(
    about = "Tracks smartphone prices across markets: plans scraping targets, scrapes vendor sites concurrently, analyzes prices with an LLM (with rule-based fallback) and recommends whether to buy, wait or hold."
)]
#[command(version)]
pub struct Args {
    /// 设备型号，例如 "iPhone 15"
    pub device: String,

    /// 目标地区，可重复指定 (US, UK, EU, CA, AU, IN, BR)
    #[arg(short, long = "region")]
    pub regions: Vec<String>,

    /// 只抓取指定商家，可重复指定
    #[arg(long = "vendor")]
    pub vendors: Vec<String>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 使用离线模拟数据代替真实抓取
    #[arg(long)]
    pub offline: bool,

    /// 禁用LLM分析，直接使用规则分析
    #[arg(long)]
    pub no_llm: bool,

    /// 以JSON格式输出结果
    #[arg(long)]
    pub json: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 分析所用模型
    #[arg(long)]
    pub model: Option<String>,

    /// LLM调用超时时间（秒）
    #[arg(long)]
    pub llm_timeout: Option<u64>,

    /// 最大并行抓取数
    #[arg(long)]
    pub max_parallel_scrapes: Option<usize>,

    /// 单个目标的抓取超时时间（秒）
    #[arg(long)]
    pub target_timeout: Option<u64>,

    /// 整个流水线的超时时间（秒）
    #[arg(long)]
    pub run_timeout: Option<u64>,

    /// 抓取目标数量上限
    #[arg(long)]
    pub max_targets: Option<usize>,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(&self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path)
                .with_context(|| format!("⚠️ 无法读取配置文件 {:?}", config_path))?
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE);

            if default_config_path.exists() {
                Config::from_file(&default_config_path).with_context(|| {
                    format!("⚠️ 无法读取默认配置文件 {:?}", default_config_path)
                })?
            } else {
                // 默认配置文件不存在，使用默认值
                Config::default()
            }
        };

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            config.llm.provider = provider_str
                .parse::<LLMProvider>()
                .map_err(|e| anyhow!(e))?;
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(timeout) = self.llm_timeout {
            config.llm.timeout_seconds = timeout;
        }
        if self.no_llm {
            config.llm.enabled = false;
        }

        // 抓取配置
        if self.offline {
            config.scraping.backend = ScrapingBackend::Mock;
        }
        if let Some(max_parallel_scrapes) = self.max_parallel_scrapes {
            config.scraping.max_parallel_scrapes = max_parallel_scrapes;
        }
        if let Some(target_timeout) = self.target_timeout {
            config.scraping.target_timeout_seconds = target_timeout;
        }

        // 其他配置
        if let Some(run_timeout) = self.run_timeout {
            config.run_timeout_seconds = run_timeout;
        }
        if let Some(max_targets) = self.max_targets {
            config.planning.max_targets = Some(max_targets);
        }
        config.verbose = self.verbose;

        config.validate()?;
        Ok(config)
    }

    /// 根据参数构建价格查询
    pub fn to_query(&self) -> PriceQuery {
        let mut query = PriceQuery::new(self.device.trim())
            .with_regions(self.regions.iter().map(|r| r.trim().to_ascii_uppercase()));
        if !self.vendors.is_empty() {
            query = query.with_vendors(self.vendors.iter().cloned());
        }
        query
    }
}

// Include tests
#[cfg(test)]
mod tests;
