//! LLM 层：补全客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use message::{Message, Role};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage, DEEPSEEK_BASE_URL};
pub use traits::{LlmClient, LlmError};

/// 根据配置与环境变量选择补全后端（OpenAI 兼容 / DeepSeek / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let key = match provider.as_str() {
        "deepseek" => std::env::var("DEEPSEEK_API_KEY")
            .ok()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
        "mock" => None,
        _ => std::env::var("OPENAI_API_KEY").ok(),
    };

    match key {
        Some(key) if provider == "deepseek" => {
            let base = cfg.llm.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
            tracing::info!(model = %cfg.llm.model, "Using DeepSeek completion backend");
            Arc::new(OpenAiClient::new(
                Some(base),
                &cfg.llm.model,
                &key,
                cfg.llm.max_tokens,
            ))
        }
        Some(key) => {
            tracing::info!(model = %cfg.llm.model, "Using OpenAI-compatible completion backend");
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                &key,
                cfg.llm.max_tokens,
            ))
        }
        None => {
            tracing::warn!(provider = %provider, "No API key set or provider is mock, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}
