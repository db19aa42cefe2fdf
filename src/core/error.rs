//! Agent 错误类型
//!
//! 单步内的错误（解析失败、工具失败）以数据形式记录在 RunResult 中；
//! 只有调用方输入错误（空指令、非法模式）会以 Err 返回给调用方。

use thiserror::Error;

use crate::context::SnapshotError;
use crate::llm::LlmError;
use crate::project::ArtifactError;

/// 编排过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Instruction is required")]
    EmptyInstruction,

    #[error("Invalid mode: {0} (expected FRESH or MODIFY)")]
    InvalidMode(String),

    /// MODIFY 时磁盘上没有可修改的项目，调用方可改用 FRESH
    #[error("No existing project found. Generate a project first or switch to FRESH mode.")]
    NoExistingProject,

    /// MODIFY 已应用迭代次数达到上限，建议重新生成
    #[error("Maximum iterations ({limit}) reached. Consider regenerating the project.")]
    IterationCapReached { limit: usize },

    #[error("Completion service error: {0}")]
    CompletionService(#[from] LlmError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("No plan is awaiting confirmation")]
    NoPendingPlan,

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}
