//! 编排器构建器：统一装配 LLM、产物存储、分析器、工具与脚手架
//!
//! CLI 与测试共用同一套装配逻辑；未显式提供的协作者按配置创建默认实现。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::config::AppConfig;
use crate::context::{ContextAnalyzer, DiagnosticBuffer, DiagnosticFeed, SnapshotStore};
use crate::core::Orchestrator;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::project::{ArtifactStore, NextAppScaffold, ProjectLayout, Scaffolder};
use crate::react::{PlanGenerator, ReasoningEngine, RunEvent};
use crate::tools::{
    CreateComponentTool, CreatePageTool, FixErrorTool, ToolExecutor, ToolRegistry, UpdatePageTool,
};

/// 编排器构建器
pub struct OrchestratorBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    project_root: Option<PathBuf>,
    diagnostics: Option<Arc<dyn DiagnosticFeed>>,
    scaffolder: Option<Arc<dyn Scaffolder>>,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            project_root: None,
            diagnostics: None,
            scaffolder: None,
            event_tx: None,
        }
    }

    /// 指定补全后端（默认按配置选择）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 覆盖配置中的项目根目录
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticFeed>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn with_scaffolder(mut self, scaffolder: Arc<dyn Scaffolder>) -> Self {
        self.scaffolder = Some(scaffolder);
        self
    }

    /// 设置事件推送通道
    pub fn with_event_sender(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 构建产物工具注册表
    pub fn build_tool_registry(store: &ArtifactStore) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(CreatePageTool::new(store.clone()));
        tools.register(CreateComponentTool::new(store.clone()));
        tools.register(UpdatePageTool::new(store.clone()));
        tools.register(FixErrorTool::new(store.clone()));
        tools
    }

    pub fn build(self) -> Orchestrator {
        let root = self
            .project_root
            .unwrap_or_else(|| self.config.app.project_root());
        let store = ArtifactStore::new(&root, ProjectLayout::from(&self.config.project));
        let snapshot = SnapshotStore::new(root.join(&self.config.project.sidecar_file));
        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| Arc::new(DiagnosticBuffer::new()));
        let llm = self
            .llm
            .unwrap_or_else(|| create_llm_from_config(&self.config));

        let analyzer = ContextAnalyzer::new(store.clone(), snapshot.clone(), diagnostics.clone());
        let executor = ToolExecutor::new(
            Self::build_tool_registry(&store),
            self.config.agent.tool_timeout_secs,
        );
        tracing::debug!(root = %root.display(), tools = ?executor.tool_names(), "orchestrator assembled");

        Orchestrator {
            settings: self.config.agent.clone(),
            store,
            snapshot,
            analyzer,
            planner: PlanGenerator::new(llm.clone()),
            reasoner: ReasoningEngine::new(llm, self.config.agent.history_window),
            executor,
            scaffolder: self
                .scaffolder
                .unwrap_or_else(|| Arc::new(NextAppScaffold::default())),
            diagnostics,
            event_tx: self.event_tx,
        }
    }
}
