//! 会话：计划确认协议与跨运行的已应用迭代计数
//!
//! 每个会话最多持有一个待确认计划；confirm 使用计划中保存的字段执行，cancel 丢弃计划。
//! 计数规则：FRESH 完成后归零；MODIFY 以 Finished / IterationCap 结束且至少应用一个动作时加一。

use crate::core::{AgentError, AutoFixOutcome, Mode, Orchestrator, PendingPlan, RunRequest, RunResult};

pub struct AgentSession {
    orchestrator: Orchestrator,
    pending: Option<PendingPlan>,
    iteration_count: usize,
}

impl AgentSession {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            pending: None,
            iteration_count: 0,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// 从外部恢复计数（例如调用方自行持久化了计数）
    pub fn set_iteration_count(&mut self, count: usize) {
        self.iteration_count = count;
    }

    pub fn pending(&self) -> Option<&PendingPlan> {
        self.pending.as_ref()
    }

    /// 提交指令：生成计划并等待确认（新计划替换旧计划）
    pub async fn submit(&mut self, instruction: &str, mode: Mode) -> Result<RunResult, AgentError> {
        let request = RunRequest::new(instruction, mode).with_iteration_count(self.iteration_count);
        let result = self.orchestrator.run(request).await?;
        self.pending = PendingPlan::from_result(&result);
        if let Some(plan) = &self.pending {
            tracing::info!(mode = %plan.mode, "plan awaiting confirmation");
        }
        self.record(&result);
        Ok(result)
    }

    /// 确认待执行计划
    pub async fn confirm(&mut self) -> Result<RunResult, AgentError> {
        let plan = self.pending.take().ok_or(AgentError::NoPendingPlan)?;
        let result = self.orchestrator.run(plan.into_confirmed_request()).await?;
        self.record(&result);
        Ok(result)
    }

    /// 取消并返回待确认计划
    pub fn cancel(&mut self) -> Option<PendingPlan> {
        let plan = self.pending.take();
        if plan.is_some() {
            tracing::info!("pending plan cancelled");
        }
        plan
    }

    /// 恢复一个序列化保存过的计划（替换当前待确认计划）
    pub fn restore(&mut self, plan: PendingPlan) {
        self.pending = Some(plan);
    }

    pub async fn auto_fix(&mut self) -> Result<AutoFixOutcome, AgentError> {
        let outcome = self.orchestrator.auto_fix(self.iteration_count).await?;
        if let AutoFixOutcome::Ran { result } = &outcome {
            self.record(result);
        }
        Ok(outcome)
    }

    fn record(&mut self, result: &RunResult) {
        let RunResult::Complete {
            mode,
            stop_reason,
            applied_actions,
            ..
        } = result
        else {
            return;
        };
        match mode {
            Mode::Fresh => self.iteration_count = 0,
            Mode::Modify if stop_reason.is_success() && *applied_actions > 0 => {
                self.iteration_count += 1;
            }
            Mode::Modify => {}
        }
        tracing::debug!(iteration_count = self.iteration_count, "session counter updated");
    }
}
