//! 运行过程事件：供前端 / CLI 实时展示阶段、决策、工具调用与观察

use serde::Serialize;

use crate::core::{RunPhase, StopReason};

/// 单个过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// 阶段变更
    Phase { run_id: String, phase: RunPhase },
    /// 推理步数更新
    StepUpdate { step: usize, max_steps: usize },
    /// 推理结果
    Decision { thought: String, action: String },
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览）
    Observation {
        tool: String,
        success: bool,
        preview: String,
    },
    /// 完成校验未通过，已追加纠正提示
    GuardNote { text: String },
    /// 循环结束
    LoopFinished { iterations: usize, stop_reason: StopReason },
    /// 错误
    Error { text: String },
}
