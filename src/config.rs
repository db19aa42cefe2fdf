//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SITESMITH__*` 覆盖（双下划线表示嵌套，如 `SITESMITH__AGENT__MAX_REASONING_STEPS=5`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub project: ProjectSection,
}

/// [app] 段：应用名、生成项目根目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 生成项目根目录，未设置时用 ./output/site-project
    pub project_root: Option<PathBuf>,
}

impl AppSection {
    pub fn project_root(&self) -> PathBuf {
        self.project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("output").join("site-project"))
    }
}

/// [llm] 段：后端选择与模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4000
}

/// [agent] 段：两个上限相互独立（单次运行的推理步数 / MODIFY 跨运行的已应用次数）
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 单次运行内最多推理步数
    #[serde(default = "default_max_reasoning_steps")]
    pub max_reasoning_steps: usize,
    /// MODIFY 模式跨运行最多已应用迭代次数
    #[serde(default = "default_max_applied_iterations")]
    pub max_applied_iterations: usize,
    /// 回显给推理引擎的最近历史条数
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// FRESH 完成校验：根页面最少字节数
    #[serde(default = "default_min_root_page_bytes")]
    pub min_root_page_bytes: usize,
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_reasoning_steps: default_max_reasoning_steps(),
            max_applied_iterations: default_max_applied_iterations(),
            history_window: default_history_window(),
            min_root_page_bytes: default_min_root_page_bytes(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_max_reasoning_steps() -> usize {
    10
}

fn default_max_applied_iterations() -> usize {
    5
}

fn default_history_window() -> usize {
    6
}

fn default_min_root_page_bytes() -> usize {
    500
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [project] 段：生成项目的目录布局
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,
    #[serde(default = "default_components_dir")]
    pub components_dir: String,
    #[serde(default = "default_page_file")]
    pub page_file: String,
    #[serde(default = "default_component_extension")]
    pub component_extension: String,
    /// 侧车元数据文件名（位于项目根目录下）
    #[serde(default = "default_sidecar_file")]
    pub sidecar_file: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            components_dir: default_components_dir(),
            page_file: default_page_file(),
            component_extension: default_component_extension(),
            sidecar_file: default_sidecar_file(),
        }
    }
}

fn default_pages_dir() -> String {
    "app".to_string()
}

fn default_components_dir() -> String {
    "components".to_string()
}

fn default_page_file() -> String {
    "page.js".to_string()
}

fn default_component_extension() -> String {
    "js".to_string()
}

fn default_sidecar_file() -> String {
    ".sitesmith-context.json".to_string()
}

/// 从 config 目录加载配置，环境变量 SITESMITH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SITESMITH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SITESMITH")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_caps_independent() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.max_reasoning_steps, 10);
        assert_eq!(cfg.agent.max_applied_iterations, 5);
        assert_eq!(cfg.agent.history_window, 6);
        assert_eq!(cfg.project.pages_dir, "app");
        assert_eq!(
            cfg.app.project_root(),
            PathBuf::from("output").join("site-project")
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let c = config::Config::builder()
            .add_source(config::File::from_str(
                "[agent]\nmax_reasoning_steps = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let cfg: AppConfig = c.try_deserialize().unwrap();
        assert_eq!(cfg.agent.max_reasoning_steps, 5);
        assert_eq!(cfg.agent.max_applied_iterations, 5);
        assert_eq!(cfg.llm.provider, "openai");
    }
}
