//! 规划生成器：一次补全调用产出供人审阅的自由文本计划，不做解析

use std::sync::Arc;

use crate::context::ProjectContext;
use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::react::prompts::{error_fix_plan_prompt, feature_plan_prompt, project_plan_prompt};

pub struct PlanGenerator {
    llm: Arc<dyn LlmClient>,
}

impl PlanGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 选择提示词：无上下文为项目规划；有构建 / 导入 / 组件错误为修复规划；否则为功能规划
    pub fn build_prompt(instruction: &str, context: Option<&ProjectContext>) -> String {
        match context {
            None => project_plan_prompt(instruction),
            Some(ctx) if ctx.detected_errors.needs_fix_plan() => error_fix_plan_prompt(ctx),
            Some(ctx) => feature_plan_prompt(instruction, ctx),
        }
    }

    pub async fn plan(&self, instruction: &str, context: Option<&ProjectContext>) -> Result<String, AgentError> {
        let prompt = Self::build_prompt(instruction, context);
        let plan = self.llm.complete_prompt(&prompt).await?;
        tracing::info!(plan_chars = plan.len(), with_context = context.is_some(), "plan generated");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DetectedErrors, PageSummary, ProjectMetadata};
    use crate::llm::{LlmError, ScriptedLlmClient};

    fn context(errors: DetectedErrors) -> ProjectContext {
        ProjectContext {
            pages: vec![PageSummary {
                name: "home".into(),
                path: "app/page.js".into(),
                content_preview: String::new(),
                detected_issues: Vec::new(),
            }],
            components: Vec::new(),
            detected_errors: errors,
            metadata: ProjectMetadata::new(),
        }
    }

    #[test]
    fn test_prompt_variant_selection() {
        assert!(PlanGenerator::build_prompt("bakery", None).contains("website plan"));

        let feature = PlanGenerator::build_prompt("add pricing", Some(&context(DetectedErrors::default())));
        assert!(feature.contains("- Pages: home"));
        assert!(feature.contains("REQUEST: add pricing"));

        let mut errors = DetectedErrors::default();
        errors.missing_imports.push("framer-motion".into());
        let fix = PlanGenerator::build_prompt("add pricing", Some(&context(errors)));
        assert!(fix.contains("Fix errors"));
        assert!(fix.contains("framer-motion"));
    }

    #[tokio::test]
    async fn test_plan_failure_is_structured() {
        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push(Err(LlmError::Api("down".into())));
        let err = PlanGenerator::new(llm).plan("x", None).await.unwrap_err();
        assert!(matches!(err, AgentError::CompletionService(LlmError::Api(_))));
    }
}
