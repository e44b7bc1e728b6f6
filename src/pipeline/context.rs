use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, LLMProvider, ScrapingBackend};
use crate::history::{HistoryStore, InMemoryHistoryStore};
use crate::llm::client::{DisabledLlmClient, LlmClient, ProviderLlmClient};
use crate::scraping::{HttpScrapingService, MockScrapingService, ScrapingService};

/// 流水线运行所需的配置与外部协作者
#[derive(Clone)]
pub struct PipelineContext {
    /// 配置
    pub config: Config,
    /// LLM客户端
    pub llm_client: Arc<dyn LlmClient>,
    /// 抓取服务
    pub scraping_service: Arc<dyn ScrapingService>,
    /// 站点历史存储
    pub history: Arc<dyn HistoryStore>,
}

impl PipelineContext {
    /// 按配置创建上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = Self::build_llm_client(&config)?;
        let scraping_service: Arc<dyn ScrapingService> = match config.scraping.backend {
            ScrapingBackend::Http => Arc::new(HttpScrapingService::new(&config.scraping)),
            ScrapingBackend::Mock => Arc::new(MockScrapingService::new()),
        };
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistoryStore::with_seeded_defaults());

        Ok(Self {
            config,
            llm_client,
            scraping_service,
            history,
        })
    }

    /// 使用注入的协作者创建上下文
    pub fn with_collaborators(
        config: Config,
        llm_client: Arc<dyn LlmClient>,
        scraping_service: Arc<dyn ScrapingService>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            llm_client,
            scraping_service,
            history,
        }
    }

    fn build_llm_client(config: &Config) -> Result<Arc<dyn LlmClient>> {
        let llm = &config.llm;
        if !llm.enabled {
            tracing::info!("ℹ️ LLM分析已禁用，将使用规则分析");
            return Ok(Arc::new(DisabledLlmClient::new(
                "LLM analysis disabled by configuration",
            )));
        }
        if llm.api_key.trim().is_empty() && llm.provider != LLMProvider::Ollama {
            tracing::warn!(
                "⚠️ 未配置 {} 的API Key，将使用规则分析",
                llm.provider
            );
            return Ok(Arc::new(DisabledLlmClient::new(format!(
                "no API key configured for provider {}",
                llm.provider
            ))));
        }

        Ok(Arc::new(ProviderLlmClient::new(llm.clone())?))
    }
}
