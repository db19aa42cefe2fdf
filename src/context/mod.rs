//! 项目上下文：摘要重建、诊断分类与跨运行元数据

pub mod analyzer;
pub mod diagnostics;
pub mod snapshot;
pub mod types;

pub use analyzer::{categorize, missing_imports, ContextAnalyzer};
pub use diagnostics::{DiagnosticBuffer, DiagnosticFeed};
pub use snapshot::{SnapshotError, SnapshotStore};
pub use types::{
    ComponentSummary, DetectedErrors, PageSummary, ProjectContext, ProjectMetadata,
};
