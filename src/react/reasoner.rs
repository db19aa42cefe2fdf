//! 推理引擎：拼提示词、调用一次补全服务、解析为 Decision
//!
//! 服务出错时不重试，直接返回 FINISH(ServiceError)。

use std::sync::Arc;

use crate::core::Mode;
use crate::llm::LlmClient;
use crate::react::history::render_recent;
use crate::react::prompts::reasoning_prompt;
use crate::react::{parse_decision, Decision, FinishReason, HistoryEntry};

pub struct ReasoningEngine {
    llm: Arc<dyn LlmClient>,
    history_window: usize,
}

impl ReasoningEngine {
    pub fn new(llm: Arc<dyn LlmClient>, history_window: usize) -> Self {
        Self { llm, history_window }
    }

    pub fn build_prompt(&self, instruction: &str, history: &[HistoryEntry], mode: Mode) -> String {
        reasoning_prompt(instruction, mode, &render_recent(history, self.history_window))
    }

    pub async fn decide(&self, instruction: &str, history: &[HistoryEntry], mode: Mode) -> Decision {
        let prompt = self.build_prompt(instruction, history, mode);
        tracing::debug!(prompt_chars = prompt.len(), "reasoning prompt built");

        match self.llm.complete_prompt(&prompt).await {
            Ok(reply) => {
                let decision = parse_decision(&reply);
                tracing::debug!(action = decision.action.tool_name(), "reply parsed");
                decision
            }
            Err(e) => {
                tracing::error!(error = %e, "completion service failed during reasoning");
                Decision::finish(
                    "Error occurred while reasoning",
                    format!("Completion service error: {}", e),
                    FinishReason::ServiceError,
                )
            }
        }
    }
}
