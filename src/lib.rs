//! sitesmith - 网站生成智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **context**: 项目上下文重建、诊断分类、侧车元数据
//! - **core**: 运行状态、编排器、计划确认会话
//! - **llm**: 补全客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock / Scripted）
//! - **observability**: 日志初始化
//! - **project**: 页面 / 组件的冲突安全落盘、片段拼接、脚手架
//! - **react**: 提示词、回复解析、推理引擎、规划生成、执行循环
//! - **tools**: 产物工具与带超时审计的执行器

pub mod config;
pub mod context;
pub mod core;
pub mod llm;
pub mod observability;
pub mod project;
pub mod react;
pub mod tools;

pub use crate::core::{AgentError, AgentSession, Mode, Orchestrator, OrchestratorBuilder, RunRequest, RunResult};
