//! Agent 编排器：计划 -> 确认 -> 受限执行循环
//!
//! 状态流转：PLANNING -> AWAITING_CONFIRMATION -> EXECUTING -> {COMPLETE, FAILED, CAP_REACHED}。
//! 只有调用方输入错误返回 Err；其余结局都是 RunResult。
//! 每次运行生成一个 run_id，并在 `run` span 内执行。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AgentSection;
use crate::context::{ContextAnalyzer, DetectedErrors, DiagnosticFeed, ProjectContext, SnapshotStore};
use crate::core::{AgentError, Mode, RunPhase, RunRequest, RunResult};
use crate::project::{ArtifactStore, Scaffolder};
use crate::react::{execute_loop, LoopSession, PlanGenerator, ReasoningEngine, RunEvent};
use crate::tools::ToolExecutor;

/// 自动修复的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoFixOutcome {
    /// 没有可修复的项目
    NoProject,
    /// 没有检测到错误
    NoErrors,
    /// 已执行修复运行
    Ran { result: RunResult },
}

/// 编排器（由 OrchestratorBuilder 构建）
pub struct Orchestrator {
    pub(crate) settings: AgentSection,
    pub(crate) store: ArtifactStore,
    pub(crate) snapshot: SnapshotStore,
    pub(crate) analyzer: ContextAnalyzer,
    pub(crate) planner: PlanGenerator,
    pub(crate) reasoner: ReasoningEngine,
    pub(crate) executor: ToolExecutor,
    pub(crate) scaffolder: Arc<dyn Scaffolder>,
    pub(crate) diagnostics: Arc<dyn DiagnosticFeed>,
    pub(crate) event_tx: Option<UnboundedSender<RunEvent>>,
}

impl Orchestrator {
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn analyzer(&self) -> &ContextAnalyzer {
        &self.analyzer
    }

    pub fn settings(&self) -> &AgentSection {
        &self.settings
    }

    fn send(&self, ev: RunEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }

    fn enter(&self, run_id: &str, phase: RunPhase) {
        tracing::info!(?phase, "phase");
        self.send(RunEvent::Phase {
            run_id: run_id.to_string(),
            phase,
        });
    }

    /// 结束于 FAILED
    fn fail(&self, run_id: &str, error: impl std::fmt::Display, needs_new_project: bool) -> RunResult {
        let error = error.to_string();
        tracing::error!(error = %error, "run failed");
        self.send(RunEvent::Error { text: error.clone() });
        self.enter(run_id, RunPhase::Failed);
        RunResult::Failed {
            error,
            needs_new_project,
        }
    }

    /// 执行一次运行
    pub async fn run(&self, req: RunRequest) -> Result<RunResult, AgentError> {
        if req.instruction.trim().is_empty() {
            return Err(AgentError::EmptyInstruction);
        }
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id, mode = %req.mode);
        Ok(self.run_inner(&run_id, req).instrument(span).await)
    }

    async fn run_inner(&self, run_id: &str, req: RunRequest) -> RunResult {
        let instruction = req.instruction.trim();
        tracing::info!(
            instruction = %instruction,
            iteration_count = req.iteration_count,
            confirmed = req.confirmed,
            auto_fix = req.auto_fix,
            "run started"
        );

        let cap = self.settings.max_applied_iterations;
        if req.mode == Mode::Modify && req.iteration_count >= cap {
            let error = AgentError::IterationCapReached { limit: cap }.to_string();
            tracing::warn!(limit = cap, "applied iteration cap reached");
            self.enter(run_id, RunPhase::CapReached);
            return RunResult::CapReached {
                error,
                suggest_regenerate: true,
            };
        }

        if !req.confirmed && !req.auto_fix {
            self.enter(run_id, RunPhase::Planning);
            let context = match req.mode {
                Mode::Fresh => None,
                Mode::Modify => match self.analyzer.analyze() {
                    Ok(Some(ctx)) if !ctx.pages.is_empty() => Some(ctx),
                    Ok(_) => return self.fail(run_id, AgentError::NoExistingProject, true),
                    Err(e) => return self.fail(run_id, e, false),
                },
            };
            let plan = match self.planner.plan(instruction, context.as_ref()).await {
                Ok(plan) => plan,
                Err(e) => return self.fail(run_id, format!("Error generating plan: {}", e), false),
            };
            self.enter(run_id, RunPhase::AwaitingConfirmation);
            return RunResult::AwaitingConfirmation {
                plan,
                mode: req.mode,
                instruction: instruction.to_string(),
                iteration_count: req.iteration_count,
                context,
            };
        }

        match req.mode {
            Mode::Fresh if req.confirmed => {
                if let Err(e) = self.store.delete_all() {
                    return self.fail(run_id, format!("Failed to delete existing project: {}", e), false);
                }
                if let Err(e) = self.scaffolder.scaffold(&self.store) {
                    return self.fail(run_id, format!("Failed to initialize project: {}", e), false);
                }
            }
            Mode::Modify if !self.store.project_exists() => {
                return self.fail(run_id, AgentError::NoExistingProject, true);
            }
            _ => {}
        }

        self.enter(run_id, RunPhase::Executing);
        let mut session = LoopSession::new(&self.reasoner, &self.executor, &self.store, &self.snapshot)
            .with_limits(self.settings.max_reasoning_steps, self.settings.min_root_page_bytes);
        if let Some(tx) = &self.event_tx {
            session = session.with_event_tx(tx);
        }
        let outcome = execute_loop(&session, instruction, req.mode).await;

        let context = if outcome.stop_reason.is_success() {
            self.diagnostics.clear();
            self.rebuild_context()
        } else {
            None
        };

        tracing::info!(
            iterations = outcome.iterations,
            applied_actions = outcome.applied_actions,
            stop_reason = ?outcome.stop_reason,
            "execution finished"
        );
        self.enter(run_id, RunPhase::Complete);
        RunResult::Complete {
            history: outcome.history,
            iterations: outcome.iterations,
            mode: req.mode,
            stop_reason: outcome.stop_reason,
            applied_actions: outcome.applied_actions,
            context,
        }
    }

    fn rebuild_context(&self) -> Option<ProjectContext> {
        match self.analyzer.analyze() {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(error = %e, "context rebuild after apply failed");
                None
            }
        }
    }

    /// 自动修复：分析诊断，有错误时以 MODIFY + autoFix（跳过确认）执行修复指令
    pub async fn auto_fix(&self, iteration_count: usize) -> Result<AutoFixOutcome, AgentError> {
        let Some(context) = self.analyzer.analyze()? else {
            return Ok(AutoFixOutcome::NoProject);
        };
        if context.detected_errors.is_empty() {
            tracing::info!("auto-fix: no errors detected");
            return Ok(AutoFixOutcome::NoErrors);
        }

        let instruction = error_summary(&context.detected_errors);
        tracing::info!(summary = %instruction, "auto-fix triggered");
        let request = RunRequest::new(instruction, Mode::Modify)
            .with_iteration_count(iteration_count)
            .auto_fix();
        let result = self.run(request).await?;
        Ok(AutoFixOutcome::Ran { result })
    }
}

/// 自动修复指令
pub fn error_summary(errors: &DetectedErrors) -> String {
    let mut summary = format!(
        "Fix the following errors:\n- Missing imports: {}\n- Missing components: {} issues\n- Build errors: {} issues",
        errors.missing_imports.join(", "),
        errors.missing_components.len(),
        errors.build_errors.len()
    );
    if !errors.other.is_empty() {
        summary.push_str(&format!("\n- Other: {} issues", errors.other.len()));
    }
    summary
}
