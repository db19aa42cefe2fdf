//! 产物工具：createPage / createComponent / updatePage / fixError
//!
//! 每个工具持有 ArtifactStore 的副本，在阻塞线程池上执行文件操作。
//! 阻塞任务无法取消，执行器超时后会等到它结束再返回。

use async_trait::async_trait;
use serde_json::Value;

use crate::project::{ArtifactError, ArtifactStore, SplicePosition};
use crate::tools::{Tool, ToolOutput};

/// 取第一个存在且非空的字符串参数
fn arg(args: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| args.get(*k).and_then(Value::as_str))
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn require(args: &Value, keys: &[&str], what: &str) -> Result<String, String> {
    arg(args, keys).ok_or_else(|| format!("Missing required parameter: {}", what))
}

/// 在阻塞线程池上运行存储操作
pub(crate) async fn run_blocking<T, F>(store: &ArtifactStore, op: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(ArtifactStore) -> Result<T, ArtifactError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(store))
        .await
        .map_err(|e| format!("Storage task failed: {e}"))?
        .map_err(|e| e.to_string())
}

pub struct CreatePageTool {
    store: ArtifactStore,
}

impl CreatePageTool {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreatePageTool {
    fn name(&self) -> &str {
        "createPage"
    }

    fn description(&self) -> &str {
        "Create or replace a page. Args: {\"name\": \"home|about|...\", \"content\": \"page source\"}"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let name = require(&args, &["name"], "name")?;
        let content = require(&args, &["content"], "content")?;
        let receipt = run_blocking(&self.store, move |s| s.write_page(&name, &content))
            .await
            .map_err(|e| format!("Failed to create page: {e}"))?;
        Ok(ToolOutput::new(
            format!("Page created: {} ({} bytes)", receipt.rel_path, receipt.bytes),
            Some(receipt.rel_path),
        ))
    }
}

pub struct CreateComponentTool {
    store: ArtifactStore,
}

impl CreateComponentTool {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateComponentTool {
    fn name(&self) -> &str {
        "createComponent"
    }

    fn description(&self) -> &str {
        "Create or replace a component. Args: {\"name\": \"Header\", \"content\": \"component source\"}"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let name = require(&args, &["name"], "name")?;
        let content = require(&args, &["content"], "content")?;
        let receipt = run_blocking(&self.store, move |s| s.write_component(&name, &content))
            .await
            .map_err(|e| format!("Failed to create component: {e}"))?;
        Ok(ToolOutput::new(
            format!("Component created: {} ({} bytes)", receipt.rel_path, receipt.bytes),
            Some(receipt.rel_path),
        ))
    }
}

pub struct UpdatePageTool {
    store: ArtifactStore,
}

impl UpdatePageTool {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdatePageTool {
    fn name(&self) -> &str {
        "updatePage"
    }

    fn description(&self) -> &str {
        "Insert a section into an existing page. Args: {\"name\": \"home\", \"section\": \"...\", \"position\": \"before_closing|after_opening|replace|append\"}"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let name = require(&args, &["name"], "name")?;
        let section = require(&args, &["section", "content"], "section")?;
        let position = arg(&args, &["position"])
            .map(|p| SplicePosition::parse_lenient(&p))
            .unwrap_or_default();
        let receipt = run_blocking(&self.store, move |s| s.update_page(&name, &section, position))
            .await
            .map_err(|e| format!("Failed to update page: {e}"))?;
        Ok(ToolOutput::new(
            format!("Page updated: {} ({})", receipt.rel_path, position),
            Some(receipt.rel_path),
        ))
    }
}

pub struct FixErrorTool {
    store: ArtifactStore,
}

impl FixErrorTool {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for FixErrorTool {
    fn name(&self) -> &str {
        "fixError"
    }

    fn description(&self) -> &str {
        "Append a fix to an existing project file. Args: {\"name\": \"app/page.js\", \"content\": \"fix\"}"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let target = require(&args, &["name", "filePath"], "name")?;
        let fix = require(&args, &["content", "fix"], "content")?;
        let rel = target.clone();
        run_blocking(&self.store, move |s| s.append_to_file(&rel, &fix))
            .await
            .map_err(|e| format!("Failed to fix: {e}"))?;
        Ok(ToolOutput::new(format!("Fixed: {}", target), Some(target)))
    }
}
