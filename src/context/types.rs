//! 项目上下文数据结构（每次从磁盘重建，只有 metadata 跨运行持久化）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 页面摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub name: String,
    pub path: String,
    pub content_preview: String,
    pub detected_issues: Vec<String>,
}

/// 组件摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSummary {
    pub name: String,
    pub path: String,
    pub content_preview: String,
    pub detected_issues: Vec<String>,
}

/// 按类别归档的诊断信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedErrors {
    pub missing_imports: Vec<String>,
    pub missing_components: Vec<String>,
    pub build_errors: Vec<String>,
    pub other: Vec<String>,
}

impl DetectedErrors {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.missing_imports.len()
            + self.missing_components.len()
            + self.build_errors.len()
            + self.other.len()
    }

    /// 是否存在需要走修复计划的错误（构建 / 导入 / 组件），other 不计入
    pub fn needs_fix_plan(&self) -> bool {
        !self.missing_imports.is_empty()
            || !self.missing_components.is_empty()
            || !self.build_errors.is_empty()
    }
}

/// 跨运行元数据（写入侧车文件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub total_iterations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_details: Option<String>,
}

impl ProjectMetadata {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_modified: now,
            total_iterations: 0,
            last_action: None,
            last_details: None,
        }
    }
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// 现有项目的摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub pages: Vec<PageSummary>,
    pub components: Vec<ComponentSummary>,
    pub detected_errors: DetectedErrors,
    pub metadata: ProjectMetadata,
}

impl ProjectContext {
    pub fn page_names(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }
}
