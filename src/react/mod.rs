//! 认知层：提示词、回复解析、推理引擎、规划生成与执行循环

pub mod decision;
pub mod events;
pub mod history;
pub mod loop_;
pub mod parser;
pub mod planner;
pub mod prompts;
pub mod reasoner;

pub use decision::{Action, Decision, FinishReason};
pub use events::RunEvent;
pub use history::{render_recent, HistoryEntry, Observation};
pub use loop_::{execute_loop, LoopOutcome, LoopSession};
pub use parser::parse_decision;
pub use planner::PlanGenerator;
pub use reasoner::ReasoningEngine;
