//! 运行状态定义：模式、阶段、请求、结果与待确认计划
//!
//! RunResult 以 `status` 字段区分四种形态，字段名为 camelCase，可直接作为 JSON 返回给调用方。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ProjectContext;
use crate::core::AgentError;
use crate::react::HistoryEntry;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// 丢弃现有项目后重建
    Fresh,
    /// 在现有项目上增量修改
    Modify,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Fresh => f.write_str("FRESH"),
            Mode::Modify => f.write_str("MODIFY"),
        }
    }
}

impl FromStr for Mode {
    type Err = AgentError;

    /// 接受 fresh / new 与 modify / iterate（不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" | "new" => Ok(Mode::Fresh),
            "modify" | "iterate" => Ok(Mode::Modify),
            _ => Err(AgentError::InvalidMode(s.to_string())),
        }
    }
}

/// 运行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    Planning,
    AwaitingConfirmation,
    Executing,
    Complete,
    Failed,
    CapReached,
}

/// 循环结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// 模型声明完成（且通过完成校验）
    Finished,
    /// 达到单次运行推理步数上限
    IterationCap,
    /// 工具执行失败
    ActionFailed,
    /// 补全服务出错
    ServiceError,
}

impl StopReason {
    /// 是否视为成功应用（清空诊断、重建上下文、推进迭代计数）
    pub fn is_success(&self) -> bool {
        matches!(self, StopReason::Finished | StopReason::IterationCap)
    }
}

/// 单次运行请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub instruction: String,
    pub mode: Mode,
    /// MODIFY 已应用的迭代次数（跨运行）
    #[serde(default)]
    pub iteration_count: usize,
    #[serde(default)]
    pub confirmed: bool,
    /// 自动修复：跳过计划确认直接执行
    #[serde(default)]
    pub auto_fix: bool,
}

impl RunRequest {
    pub fn new(instruction: impl Into<String>, mode: Mode) -> Self {
        Self {
            instruction: instruction.into(),
            mode,
            iteration_count: 0,
            confirmed: false,
            auto_fix: false,
        }
    }

    pub fn with_iteration_count(mut self, count: usize) -> Self {
        self.iteration_count = count;
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }

    pub fn auto_fix(mut self) -> Self {
        self.auto_fix = true;
        self
    }
}

/// 运行结果（四种形态之一）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum RunResult {
    AwaitingConfirmation {
        plan: String,
        mode: Mode,
        instruction: String,
        iteration_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<ProjectContext>,
    },
    Complete {
        history: Vec<HistoryEntry>,
        iterations: usize,
        mode: Mode,
        stop_reason: StopReason,
        applied_actions: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<ProjectContext>,
    },
    Failed {
        error: String,
        needs_new_project: bool,
    },
    CapReached {
        error: String,
        suggest_regenerate: bool,
    },
}

impl RunResult {
    pub fn failed(error: impl fmt::Display) -> Self {
        RunResult::Failed {
            error: error.to_string(),
            needs_new_project: false,
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self {
            RunResult::AwaitingConfirmation { .. } => RunPhase::AwaitingConfirmation,
            RunResult::Complete { .. } => RunPhase::Complete,
            RunResult::Failed { .. } => RunPhase::Failed,
            RunResult::CapReached { .. } => RunPhase::CapReached,
        }
    }
}

/// 等待确认的计划；可序列化，便于跨进程保存后恢复
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPlan {
    pub plan: String,
    pub mode: Mode,
    pub instruction: String,
    pub iteration_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ProjectContext>,
    pub created_at: DateTime<Utc>,
}

impl PendingPlan {
    /// 从 AWAITING_CONFIRMATION 结果中提取计划
    pub fn from_result(result: &RunResult) -> Option<Self> {
        match result {
            RunResult::AwaitingConfirmation {
                plan,
                mode,
                instruction,
                iteration_count,
                context,
            } => Some(Self {
                plan: plan.clone(),
                mode: *mode,
                instruction: instruction.clone(),
                iteration_count: *iteration_count,
                context: context.clone(),
                created_at: Utc::now(),
            }),
            _ => None,
        }
    }

    /// 用保存的字段构造已确认的执行请求
    pub fn into_confirmed_request(self) -> RunRequest {
        RunRequest::new(self.instruction, self.mode)
            .with_iteration_count(self.iteration_count)
            .confirmed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("new".parse::<Mode>().unwrap(), Mode::Fresh);
        assert_eq!("MODIFY".parse::<Mode>().unwrap(), Mode::Modify);
        assert_eq!("iterate".parse::<Mode>().unwrap(), Mode::Modify);
        assert!(matches!("rebuild".parse::<Mode>(), Err(AgentError::InvalidMode(_))));
    }

    #[test]
    fn test_run_result_is_status_tagged() {
        let v = serde_json::to_value(RunResult::CapReached {
            error: "cap".into(),
            suggest_regenerate: true,
        })
        .unwrap();
        assert_eq!(v["status"], "CAP_REACHED");
        assert_eq!(v["suggestRegenerate"], true);

        let v = serde_json::to_value(RunResult::AwaitingConfirmation {
            plan: "p".into(),
            mode: Mode::Fresh,
            instruction: "i".into(),
            iteration_count: 0,
            context: None,
        })
        .unwrap();
        assert_eq!(v["status"], "AWAITING_CONFIRMATION");
        assert_eq!(v["mode"], "FRESH");
        assert_eq!(v["iterationCount"], 0);
        assert!(v.get("context").is_none());
    }

    #[test]
    fn test_pending_plan_round_trip_into_request() {
        let result = RunResult::AwaitingConfirmation {
            plan: "PLAN".into(),
            mode: Mode::Modify,
            instruction: "add pricing".into(),
            iteration_count: 2,
            context: None,
        };
        let pending = PendingPlan::from_result(&result).unwrap();
        let json = serde_json::to_string(&pending).unwrap();
        let restored: PendingPlan = serde_json::from_str(&json).unwrap();
        let req = restored.into_confirmed_request();
        assert!(req.confirmed);
        assert!(!req.auto_fix);
        assert_eq!(req.iteration_count, 2);
        assert_eq!(req.mode, Mode::Modify);
        assert!(PendingPlan::from_result(&RunResult::failed("x")).is_none());
    }
}
