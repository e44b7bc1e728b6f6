//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::config::LLMConfig;

mod providers;
pub mod utils;

use providers::ProviderClient;

/// 结构化补全请求
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// 期望的输出JSON Schema
    pub schema: serde_json::Value,
}

/// 模型的原始响应，由调用方按schema解析
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredResponse {
    pub content: String,
    pub model: String,
}

impl StructuredResponse {
    /// 提取响应中的JSON对象
    pub fn json_value(&self) -> Result<serde_json::Value, String> {
        let block = utils::extract_json_object(&self.content)
            .ok_or_else(|| "response does not contain a JSON object".to_string())?;
        serde_json::from_str(block).map_err(|e| format!("invalid JSON: {}", e))
    }
}

/// LLM调用错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM provider error: {0}")]
    Provider(String),
    #[error("LLM unavailable: {0}")]
    Unavailable(String),
}

/// LLM客户端
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 执行一次结构化补全，必须在 `timeout` 内返回
    async fn complete(
        &self,
        request: &LlmRequest,
        timeout: Duration,
    ) -> Result<StructuredResponse, LlmError>;

    fn model_name(&self) -> String;
}

/// 基于rig的多Provider客户端
#[derive(Clone)]
pub struct ProviderLlmClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl ProviderLlmClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// 通用重试逻辑，重试间隔按指数增长
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    tracing::warn!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries,
                        max_retries,
                        err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    let delay = retry_delay_ms.saturating_mul(1 << (retries - 1).min(6));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }
}

#[async_trait]
impl LlmClient for ProviderLlmClient {
    async fn complete(
        &self,
        request: &LlmRequest,
        timeout: Duration,
    ) -> Result<StructuredResponse, LlmError> {
        let agent = self
            .client
            .create_agent(&self.config.model, &request.system_prompt, &self.config)
            .map_err(|e| LlmError::Provider(e.to_string()))?;

        let call = self.retry_with_backoff(|| async { agent.prompt(&request.user_prompt).await });
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(content)) => Ok(StructuredResponse {
                content,
                model: self.config.model.clone(),
            }),
            Ok(Err(e)) => Err(LlmError::Provider(e.to_string())),
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    }

    fn model_name(&self) -> String {
        format!("{}/{}", self.config.provider, self.config.model)
    }
}

/// 未启用或未配置LLM时使用的客户端
#[derive(Debug, Clone)]
pub struct DisabledLlmClient {
    reason: String,
}

impl DisabledLlmClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmClient for DisabledLlmClient {
    async fn complete(
        &self,
        _request: &LlmRequest,
        _timeout: Duration,
    ) -> Result<StructuredResponse, LlmError> {
        Err(LlmError::Unavailable(self.reason.clone()))
    }

    fn model_name(&self) -> String {
        "disabled".to_string()
    }
}

#[cfg(test)]
mod tests;
