use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "smartninja.toml";

/// LLM API KEY 环境变量
pub const LLM_API_KEY_ENV: &str = "SMARTNINJA_LLM_API_KEY";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 抓取服务后端
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrapingBackend {
    /// 直接通过HTTP请求商家搜索页
    #[default]
    Http,
    /// 确定性的离线模拟数据
    Mock,
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 整个流水线运行的超时时间（秒）
    pub run_timeout_seconds: u64,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 抓取配置
    pub scraping: ScrapingConfig,

    /// 目标规划配置
    pub planning: PlanningConfig,

    /// 价格分析配置
    pub analysis: AnalysisConfig,

    /// 建议生成配置
    pub recommendation: RecommendationConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// 是否启用LLM分析，关闭时直接使用规则分析
    pub enabled: bool,

    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 分析所用模型
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 抓取配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScrapingConfig {
    pub backend: ScrapingBackend,

    /// 最大并行抓取数
    pub max_parallel_scrapes: usize,

    /// 单个目标的超时时间（秒）
    pub target_timeout_seconds: u64,

    /// 临时错误重试前的固定等待（毫秒）
    pub transient_retry_backoff_ms: u64,

    pub user_agent: String,
}

/// 站点评分策略
///
/// `score = (1 - recency_weight) * shrunk_rate + recency_weight * recency`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringPolicy {
    /// 无历史数据时的中性成功率
    pub neutral_success_rate: f64,

    /// 向中性值收缩的伪样本数，0表示直接使用历史成功率
    pub prior_weight: f64,

    /// 最近成功时间的权重
    pub recency_weight: f64,

    /// 最近成功时间的半衰期（小时）
    pub recency_half_life_hours: f64,
}

/// 目标规划配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PlanningConfig {
    /// 查询未指定地区时使用的全局默认地区
    pub default_regions: Vec<String>,

    pub scoring: ScoringPolicy,

    /// 目标数量上限
    pub max_targets: Option<usize>,
}

/// 价格分析配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 提示词中价格数据的最大字符数
    pub max_prompt_chars: usize,

    /// 规则分析的固定置信度
    pub fallback_confidence: f64,

    /// LLM分析置信度下限，必须高于规则分析置信度
    pub llm_min_confidence: f64,

    /// 判定涨跌的百分比阈值
    pub trend_threshold_pct: f64,

    /// 是否要求LLM给出决策依据
    pub include_justification: bool,
}

/// 建议生成配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RecommendationConfig {
    /// 低于该置信度时建议等待
    pub act_confidence_threshold: f64,

    /// 价格平稳时，最新价低于均价该百分比才建议购买
    pub deal_margin_pct: f64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.run_timeout_seconds == 0 {
            bail!("run_timeout_seconds must be greater than zero");
        }
        if self.llm.timeout_seconds == 0 {
            bail!("llm.timeout_seconds must be greater than zero");
        }
        if self.scraping.max_parallel_scrapes == 0 {
            bail!("scraping.max_parallel_scrapes must be at least 1");
        }
        if self.scraping.target_timeout_seconds == 0 {
            bail!("scraping.target_timeout_seconds must be greater than zero");
        }
        if self.planning.default_regions.is_empty() {
            bail!("planning.default_regions must not be empty");
        }

        let scoring = &self.planning.scoring;
        for (name, value) in [
            ("planning.scoring.neutral_success_rate", scoring.neutral_success_rate),
            ("planning.scoring.recency_weight", scoring.recency_weight),
            ("analysis.fallback_confidence", self.analysis.fallback_confidence),
            ("analysis.llm_min_confidence", self.analysis.llm_min_confidence),
            (
                "recommendation.act_confidence_threshold",
                self.recommendation.act_confidence_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        if scoring.prior_weight < 0.0 || scoring.recency_half_life_hours <= 0.0 {
            bail!("planning.scoring weights must be positive");
        }
        if self.analysis.fallback_confidence >= self.analysis.llm_min_confidence {
            bail!(
                "analysis.fallback_confidence ({}) must be lower than analysis.llm_min_confidence ({})",
                self.analysis.fallback_confidence,
                self.analysis.llm_min_confidence
            );
        }
        if self.analysis.trend_threshold_pct < 0.0 || self.recommendation.deal_margin_pct < 0.0 {
            bail!("percentage thresholds must not be negative");
        }
        Ok(())
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }
}

impl LLMConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ScrapingConfig {
    pub fn target_timeout(&self) -> Duration {
        Duration::from_secs(self.target_timeout_seconds)
    }

    pub fn transient_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.transient_retry_backoff_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_timeout_seconds: 120,
            llm: LLMConfig::default(),
            scraping: ScrapingConfig::default(),
            planning: PlanningConfig::default(),
            analysis: AnalysisConfig::default(),
            recommendation: RecommendationConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: LLMProvider::default(),
            api_key: std::env::var(LLM_API_KEY_ENV).unwrap_or_default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            model: String::from("gpt-4o-mini"),
            max_tokens: 2048,
            temperature: 0.2,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 60,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            backend: ScrapingBackend::default(),
            max_parallel_scrapes: 3,
            target_timeout_seconds: 30,
            transient_retry_backoff_ms: 500,
            user_agent: String::from(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            ),
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            neutral_success_rate: 0.5,
            prior_weight: 2.0,
            recency_weight: 0.0,
            recency_half_life_hours: 72.0,
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            default_regions: vec!["US".to_string(), "UK".to_string(), "EU".to_string()],
            scoring: ScoringPolicy::default(),
            max_targets: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 6000,
            fallback_confidence: 0.3,
            llm_min_confidence: 0.4,
            trend_threshold_pct: 2.0,
            include_justification: true,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            act_confidence_threshold: 0.5,
            deal_margin_pct: 5.0,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
