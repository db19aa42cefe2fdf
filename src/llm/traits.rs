//! 补全服务抽象
//!
//! 所有后端（OpenAI 兼容 / Mock / Scripted）实现 LlmClient：单次非流式 complete。
//! 服务端声明的错误以 LlmError 返回，上层不做重试。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// 补全服务错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// 服务端返回的错误（如鉴权失败、限流、参数错误）
    #[error("API error: {0}")]
    Api(String),

    /// 请求构建失败
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 服务返回了空内容
    #[error("Empty response from completion service")]
    EmptyResponse,
}

/// 补全客户端 trait：单次补全，无流式
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 单条 user prompt 的便捷调用
    async fn complete_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(&[Message::user(prompt)]).await
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
