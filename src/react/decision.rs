//! 推理结果：Decision = thought + 结构化 action

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::project::SplicePosition;

/// FINISH 的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// 模型主动声明完成
    Declared,
    /// 回复无法解析为可执行动作
    Unparseable,
    /// 补全服务出错
    ServiceError,
}

/// 单步动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum Action {
    CreatePage {
        name: String,
        content: String,
    },
    CreateComponent {
        name: String,
        content: String,
    },
    UpdatePage {
        name: String,
        section: String,
        position: SplicePosition,
    },
    /// 向项目内文件追加修复片段；target 为相对项目根目录的路径
    FixError {
        target: String,
        fix: String,
    },
    Finish {
        final_answer: String,
        reason: FinishReason,
    },
}

impl Action {
    /// 对应的工具名
    pub fn tool_name(&self) -> &'static str {
        match self {
            Action::CreatePage { .. } => "createPage",
            Action::CreateComponent { .. } => "createComponent",
            Action::UpdatePage { .. } => "updatePage",
            Action::FixError { .. } => "fixError",
            Action::Finish { .. } => "finish",
        }
    }

    /// 工具参数（JSON）
    pub fn params(&self) -> Value {
        match self {
            Action::CreatePage { name, content } | Action::CreateComponent { name, content } => {
                json!({ "name": name, "content": content })
            }
            Action::UpdatePage {
                name,
                section,
                position,
            } => json!({ "name": name, "section": section, "position": position.as_str() }),
            Action::FixError { target, fix } => json!({ "name": target, "content": fix }),
            Action::Finish { final_answer, .. } => json!({ "finalAnswer": final_answer }),
        }
    }

    /// 动作作用的目标（页面名 / 组件名 / 文件路径）
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::CreatePage { name, .. }
            | Action::CreateComponent { name, .. }
            | Action::UpdatePage { name, .. } => Some(name),
            Action::FixError { target, .. } => Some(target),
            Action::Finish { .. } => None,
        }
    }

    /// 侧车元数据中记录的动作标签
    pub fn metadata_label(&self) -> Option<&'static str> {
        match self {
            Action::CreatePage { .. } => Some("page_created"),
            Action::CreateComponent { .. } => Some("component_created"),
            Action::UpdatePage { .. } => Some("page_updated"),
            Action::FixError { .. } => Some("error_fixed"),
            Action::Finish { .. } => None,
        }
    }
}

/// 推理引擎单步输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub thought: String,
    pub action: Action,
}

impl Decision {
    pub fn finish(thought: impl Into<String>, final_answer: impl Into<String>, reason: FinishReason) -> Self {
        Self {
            thought: thought.into(),
            action: Action::Finish {
                final_answer: final_answer.into(),
                reason,
            },
        }
    }
}
