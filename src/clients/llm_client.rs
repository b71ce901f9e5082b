//! LLM 客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（DeepSeek、Azure、Doubao 等），通过 base url 切换
//!
//! 批处理只依赖 [`CompletionClient`] trait，测试中换成脚本化的假实现即可，
//! 不需要网络也不需要环境变量。

use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ConfigError, LlmError};

/// 一次补全请求
///
/// `system` 在整个批次中共享同一份（内含完整参考文本），只有 `user` 随题目变化。
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Arc<str>,
    pub user: String,
}

/// 补全接口
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// 发送一次请求，返回模型的原始文本
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// 基于 async-openai 的客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    /// 创建新的 LLM 客户端，缺少 API 密钥时返回配置错误
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn build_messages(
        &self,
        request: &CompletionRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(&*request.system)
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user.as_str())
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            "调用 LLM API，模型: {}，用户消息长度: {} 字符",
            self.model_name,
            request.user.chars().count()
        );

        let messages = self.build_messages(request)?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                classify_api_error(&self.model_name, e.to_string())
            })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

/// 把 API 错误文本归类，限流单独区分以便日志中一眼看出
fn classify_api_error(model: &str, message: String) -> LlmError {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        LlmError::RateLimited {
            model: model.to_string(),
        }
    } else {
        LlmError::ApiCallFailed {
            model: model.to_string(),
            message,
        }
    }
}
