//! Mock 补全客户端（用于测试与无 API Key 的本地运行）
//!
//! - MockLlmClient：无后端时的占位实现，规划请求回一段说明文字，推理请求直接 finish。
//! - ScriptedLlmClient：按顺序回放预置回复并记录收到的 prompt，用于驱动完整编排流程的测试。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Mock 客户端：不调用任何服务
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if last_user.contains("Response format:") {
            Ok("Thought: No completion backend is configured.\n\
                Action: finish\n\
                Final Answer: Mock backend, nothing was generated."
                .to_string())
        } else {
            Ok("PLAN\nGoal: (mock backend, configure an API key to get a real plan)".to_string())
        }
    }
}

/// 回放客户端：每次 complete 弹出一条预置回复；回复耗尽时返回 EmptyResponse
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条回复（可为错误）
    pub fn push(&self, reply: Result<String, LlmError>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// 已收到的 prompt（每次调用取最后一条 user 消息）
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt);

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replays_in_order() {
        let client = ScriptedLlmClient::new(["one", "two"]);
        client.push(Err(LlmError::Api("quota".into())));

        assert_eq!(client.complete_prompt("a").await.unwrap(), "one");
        assert_eq!(client.complete_prompt("b").await.unwrap(), "two");
        assert_eq!(
            client.complete_prompt("c").await,
            Err(LlmError::Api("quota".into()))
        );
        assert_eq!(client.complete_prompt("d").await, Err(LlmError::EmptyResponse));
        assert_eq!(client.prompts(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_mock_finishes_reasoning_prompts() {
        let reply = MockLlmClient
            .complete_prompt("Request: x\nResponse format:\n...")
            .await
            .unwrap();
        assert!(reply.contains("Action: finish"));
    }
}
