//! 核心编排层：错误、运行状态、编排器构建、主控流程与会话

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use builder::OrchestratorBuilder;
pub use error::AgentError;
pub use orchestrator::{error_summary, AutoFixOutcome, Orchestrator};
pub use session::AgentSession;
pub use state::{Mode, PendingPlan, RunPhase, RunRequest, RunResult, StopReason};
