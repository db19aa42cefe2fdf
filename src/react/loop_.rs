//! 执行循环：Reason -> Act -> Observe，直到 FINISH、工具失败或达到步数上限
//!
//! FRESH 模式下的 FINISH（服务错误除外）要先通过根页面校验：根页面缺失、仍是占位内容或过短时，
//! 追加一条 SYSTEM_NOTE 纠正提示并继续下一步。
//! 可选 event_tx：向前端推送 StepUpdate / Decision / ToolCall / Observation / GuardNote。

use tokio::sync::mpsc::UnboundedSender;

use crate::context::SnapshotStore;
use crate::core::{Mode, StopReason};
use crate::project::{is_placeholder, ArtifactKind, ArtifactStore, ROOT_PAGE_NAME};
use crate::react::{Action, FinishReason, HistoryEntry, ReasoningEngine, RunEvent};
use crate::tools::ToolExecutor;

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 循环结束时的汇总
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub history: Vec<HistoryEntry>,
    pub iterations: usize,
    pub stop_reason: StopReason,
    /// 成功执行的工具调用次数
    pub applied_actions: usize,
}

/// 执行循环所需的协作者
pub struct LoopSession<'a> {
    pub reasoner: &'a ReasoningEngine,
    pub executor: &'a ToolExecutor,
    pub store: &'a ArtifactStore,
    pub snapshot: &'a SnapshotStore,
    pub max_steps: usize,
    pub min_root_page_bytes: usize,
    pub event_tx: Option<&'a UnboundedSender<RunEvent>>,
}

impl<'a> LoopSession<'a> {
    pub fn new(
        reasoner: &'a ReasoningEngine,
        executor: &'a ToolExecutor,
        store: &'a ArtifactStore,
        snapshot: &'a SnapshotStore,
    ) -> Self {
        Self {
            reasoner,
            executor,
            store,
            snapshot,
            max_steps: 10,
            min_root_page_bytes: 500,
            event_tx: None,
        }
    }

    pub fn with_limits(mut self, max_steps: usize, min_root_page_bytes: usize) -> Self {
        self.max_steps = max_steps;
        self.min_root_page_bytes = min_root_page_bytes;
        self
    }

    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send(&self, ev: RunEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 根页面校验；未通过时返回纠正提示
    async fn root_page_problem(&self) -> Option<String> {
        let store = self.store.clone();
        let read = tokio::task::spawn_blocking(move || store.read(ArtifactKind::Page, ROOT_PAGE_NAME))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));
        let content = match read {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "could not verify home page");
                return Some(
                    "Home page does not exist yet. Must create the home page with name='home' before finishing"
                        .to_string(),
                );
            }
        };
        if is_placeholder(&content) {
            return Some("Home page still has placeholder. Must create home page with name='home'".to_string());
        }
        if content.len() <= self.min_root_page_bytes {
            return Some(format!(
                "Home page is only {} bytes, too short to be complete. Create the full home page with name='home'",
                content.len()
            ));
        }
        None
    }
}

/// 运行执行循环；不返回错误，所有失败都体现在 LoopOutcome 中
pub async fn execute_loop(session: &LoopSession<'_>, instruction: &str, mode: Mode) -> LoopOutcome {
    let mut history = vec![HistoryEntry::UserInstruction {
        content: instruction.to_string(),
    }];
    let mut applied_actions = 0;
    let mut iterations = 0;
    let mut stop_reason = None;

    for step in 1..=session.max_steps {
        iterations = step;
        tracing::info!(step, max_steps = session.max_steps, "reasoning step");
        session.send(RunEvent::StepUpdate {
            step,
            max_steps: session.max_steps,
        });

        let decision = session.reasoner.decide(instruction, &history, mode).await;
        tracing::info!(step, action = decision.action.tool_name(), artifact = ?decision.action.target(), thought = %decision.thought, "decision");
        history.push(HistoryEntry::Reason {
            thought: decision.thought.clone(),
            step,
        });
        session.send(RunEvent::Decision {
            thought: decision.thought.clone(),
            action: decision.action.tool_name().to_string(),
        });

        let action = decision.action;
        if let Action::Finish { final_answer, reason } = &action {
            let (final_answer, reason) = (final_answer.clone(), *reason);
            if mode == Mode::Fresh && reason != FinishReason::ServiceError {
                if let Some(note) = session.root_page_problem().await {
                    tracing::warn!(step, note = %note, "finish rejected by home page check");
                    session.send(RunEvent::GuardNote { text: note.clone() });
                    history.push(HistoryEntry::SystemNote { content: note, step });
                    continue;
                }
            }
            let reason = match reason {
                FinishReason::ServiceError => StopReason::ServiceError,
                FinishReason::Declared | FinishReason::Unparseable => StopReason::Finished,
            };
            if reason == StopReason::ServiceError {
                session.send(RunEvent::Error {
                    text: final_answer.clone(),
                });
            }
            history.push(HistoryEntry::Complete {
                final_answer,
                stop_reason: reason,
                step,
            });
            stop_reason = Some(reason);
            break;
        }

        let tool = action.tool_name().to_string();
        let params = action.params();
        session.send(RunEvent::ToolCall {
            tool: tool.clone(),
            args: params.clone(),
        });
        history.push(HistoryEntry::Act {
            tool: tool.clone(),
            params,
            step,
        });

        let observation = session.executor.dispatch(&action).await;
        session.send(RunEvent::Observation {
            tool: tool.clone(),
            success: observation.success,
            preview: observation
                .summary()
                .chars()
                .take(OBSERVATION_PREVIEW_CHARS)
                .collect(),
        });
        history.push(HistoryEntry::Observe {
            result: observation.clone(),
            step,
        });

        if !observation.success {
            let error = observation.summary().to_string();
            tracing::warn!(step, tool = %tool, error = %error, "action failed, stopping loop");
            session.send(RunEvent::Error { text: error.clone() });
            history.push(HistoryEntry::Complete {
                final_answer: error,
                stop_reason: StopReason::ActionFailed,
                step,
            });
            stop_reason = Some(StopReason::ActionFailed);
            break;
        }

        applied_actions += 1;
        if let Some(label) = action.metadata_label() {
            let details = observation
                .file_path
                .as_deref()
                .or(action.target())
                .unwrap_or_default();
            if let Err(e) = session.snapshot.record_action(label, details) {
                tracing::warn!(error = %e, "failed to update sidecar metadata");
            }
        }
    }

    let stop_reason = match stop_reason {
        Some(reason) => reason,
        None => {
            tracing::info!(iterations, "reasoning step cap reached");
            history.push(HistoryEntry::Complete {
                final_answer: format!("Reached the maximum of {} reasoning steps", session.max_steps),
                stop_reason: StopReason::IterationCap,
                step: iterations,
            });
            StopReason::IterationCap
        }
    };

    session.send(RunEvent::LoopFinished {
        iterations,
        stop_reason,
    });

    LoopOutcome {
        history,
        iterations,
        stop_reason,
        applied_actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm::ScriptedLlmClient;
    use crate::project::{ProjectLayout, PLACEHOLDER_ROOT_PAGE};
    use crate::tools::ToolRegistry;

    struct Fixture {
        _dir: tempfile::TempDir,
        reasoner: ReasoningEngine,
        executor: ToolExecutor,
        store: ArtifactStore,
        snapshot: SnapshotStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("site"), ProjectLayout::default());
        let snapshot = SnapshotStore::new(dir.path().join("snapshot.json"));
        Fixture {
            reasoner: ReasoningEngine::new(Arc::new(ScriptedLlmClient::default()), 6),
            executor: ToolExecutor::new(ToolRegistry::new(), 1),
            store,
            snapshot,
            _dir: dir,
        }
    }

    fn page_of_len(len: usize) -> String {
        let mut page = String::from("<main>");
        page.push_str(&"a".repeat(len - "<main></main>".len()));
        page.push_str("</main>");
        assert_eq!(page.len(), len);
        page
    }

    #[tokio::test]
    async fn test_missing_or_placeholder_home_page_is_rejected() {
        let f = fixture();
        let session = LoopSession::new(&f.reasoner, &f.executor, &f.store, &f.snapshot);
        assert!(session.root_page_problem().await.unwrap().contains("does not exist"));

        f.store.write_page("home", PLACEHOLDER_ROOT_PAGE).unwrap();
        assert!(session.root_page_problem().await.unwrap().contains("placeholder"));
    }

    #[tokio::test]
    async fn test_home_page_must_exceed_minimum_length() {
        let f = fixture();
        let session = LoopSession::new(&f.reasoner, &f.executor, &f.store, &f.snapshot);

        f.store.write_page("home", &page_of_len(500)).unwrap();
        let note = session.root_page_problem().await.unwrap();
        assert!(note.contains("only 500 bytes"));

        f.store.write_page("home", &page_of_len(501)).unwrap();
        assert_eq!(session.root_page_problem().await, None);
    }
}
