//! 单次运行的历史记录（只追加），以及回显给推理引擎的最近窗口渲染

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::StopReason;

/// 工具执行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Observation {
    pub fn ok(message: impl Into<String>, file_path: Option<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            file_path,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            file_path: None,
            error: Some(error.into()),
        }
    }

    /// 错误优先，其次消息
    pub fn summary(&self) -> &str {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("")
    }
}

/// 历史条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum HistoryEntry {
    UserInstruction {
        content: String,
    },
    Reason {
        thought: String,
        step: usize,
    },
    Act {
        tool: String,
        params: Value,
        step: usize,
    },
    Observe {
        result: Observation,
        step: usize,
    },
    SystemNote {
        content: String,
        step: usize,
    },
    Complete {
        final_answer: String,
        stop_reason: StopReason,
        step: usize,
    },
}

/// Result 行最多展示的字符数
const RESULT_PREVIEW_CHARS: usize = 100;

/// 渲染最近 window 条历史；只有指令一条时返回空串
pub fn render_recent(history: &[HistoryEntry], window: usize) -> String {
    if history.len() <= 1 {
        return String::new();
    }
    let start = history.len().saturating_sub(window);
    let mut out = String::from("\nRecent Actions:\n");
    for entry in &history[start..] {
        match entry {
            HistoryEntry::Reason { thought, .. } => {
                out.push_str(&format!("Thought: {}\n", thought));
            }
            HistoryEntry::Act { tool, params, .. } => {
                let target = params
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                out.push_str(&format!("Action: {}({})\n", tool, target));
            }
            HistoryEntry::Observe { result, .. } => {
                let preview: String = result.summary().chars().take(RESULT_PREVIEW_CHARS).collect();
                out.push_str(&format!("Result: {}\n", preview));
            }
            HistoryEntry::SystemNote { content, .. } => {
                out.push_str(&format!("Note: {}\n", content));
            }
            HistoryEntry::UserInstruction { .. } | HistoryEntry::Complete { .. } => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_only_after_first_step() {
        let history = vec![HistoryEntry::UserInstruction {
            content: "bakery".into(),
        }];
        assert_eq!(render_recent(&history, 6), "");
    }

    #[test]
    fn test_render_window() {
        let mut history = vec![HistoryEntry::UserInstruction {
            content: "bakery".into(),
        }];
        history.push(HistoryEntry::Reason {
            thought: "old thought".into(),
            step: 1,
        });
        history.push(HistoryEntry::Reason {
            thought: "create header".into(),
            step: 2,
        });
        history.push(HistoryEntry::Act {
            tool: "createComponent".into(),
            params: json!({"name": "Header", "content": "x"}),
            step: 2,
        });
        history.push(HistoryEntry::Observe {
            result: Observation::failed("e".repeat(150)),
            step: 2,
        });
        history.push(HistoryEntry::SystemNote {
            content: "Home page still has placeholder".into(),
            step: 3,
        });

        let text = render_recent(&history, 4);
        assert!(!text.contains("old thought"));
        assert!(text.contains("Thought: create header"));
        assert!(text.contains("Action: createComponent(Header)"));
        assert!(text.contains(&format!("Result: {}\n", "e".repeat(100))));
        assert!(text.contains("Note: Home page still has placeholder"));
    }

    #[test]
    fn test_entry_tagging() {
        let v = serde_json::to_value(HistoryEntry::Complete {
            final_answer: "done".into(),
            stop_reason: StopReason::Finished,
            step: 3,
        })
        .unwrap();
        assert_eq!(v["type"], "COMPLETE");
        assert_eq!(v["finalAnswer"], "done");
        assert_eq!(v["stopReason"], "Finished");
    }
}
