//! 编排器集成测试：ScriptedLlmClient 回放回复，驱动完整的 计划 / 确认 / 执行 流程

use std::sync::Arc;

use serde_json::json;
use sitesmith::config::AppConfig;
use sitesmith::context::{DiagnosticBuffer, DiagnosticFeed};
use sitesmith::core::{
    AgentError, AgentSession, AutoFixOutcome, Mode, Orchestrator, OrchestratorBuilder, RunPhase,
    RunRequest, RunResult, StopReason,
};
use sitesmith::llm::ScriptedLlmClient;
use sitesmith::project::ArtifactKind;
use sitesmith::react::{HistoryEntry, RunEvent};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    llm: Arc<ScriptedLlmClient>,
    diagnostics: DiagnosticBuffer,
    orchestrator: Orchestrator,
}

fn harness_with(replies: Vec<String>, tweak: impl FnOnce(&mut AppConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    tweak(&mut cfg);
    let llm = Arc::new(ScriptedLlmClient::new(replies));
    let diagnostics = DiagnosticBuffer::new();
    let orchestrator = OrchestratorBuilder::new(cfg)
        .with_llm(llm.clone())
        .with_project_root(dir.path().join("site"))
        .with_diagnostics(Arc::new(diagnostics.clone()))
        .build();
    Harness {
        _dir: dir,
        llm,
        diagnostics,
        orchestrator,
    }
}

fn harness(replies: Vec<String>) -> Harness {
    harness_with(replies, |_| {})
}

fn write_reply(action: &str, name: &str, content: &str) -> String {
    format!(
        "Thought: {action} {name}\nAction: {action}\nParams: {}",
        json!({"name": name, "content": content})
    )
}

fn finish_reply(answer: &str) -> String {
    format!("Thought: everything is in place\nAction: finish\nFinal Answer: {answer}")
}

fn full_home_page() -> String {
    let sections = "      <section className=\"py-16 px-8\"><p>Fresh bread baked every morning.</p></section>\n".repeat(8);
    format!(
        "import Header from '../components/Header'\n\nexport default function Home() {{\n  return (\n    <main>\n      <Header />\n{sections}    </main>\n  )\n}}\n"
    )
}

fn last_complete(history: &[HistoryEntry]) -> Option<&HistoryEntry> {
    history
        .iter()
        .rev()
        .find(|e| matches!(e, HistoryEntry::Complete { .. }))
}

#[tokio::test]
async fn test_empty_instruction_is_caller_error() {
    let h = harness(vec![]);
    let err = h
        .orchestrator
        .run(RunRequest::new("   ", Mode::Fresh))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::EmptyInstruction));
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_fresh_plan_awaits_confirmation_without_touching_disk() {
    let h = harness(vec!["PROJECT PLAN\nGoal: bakery".to_string()]);
    let result = h
        .orchestrator
        .run(RunRequest::new("Build a bakery site", Mode::Fresh))
        .await
        .unwrap();

    match result {
        RunResult::AwaitingConfirmation {
            plan,
            mode,
            instruction,
            context,
            ..
        } => {
            assert!(plan.contains("bakery"));
            assert_eq!(mode, Mode::Fresh);
            assert_eq!(instruction, "Build a bakery site");
            assert!(context.is_none());
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(h.llm.call_count(), 1);
    assert!(h.llm.prompts()[0].contains("REQUEST: Build a bakery site"));
    assert!(!h.orchestrator.store().project_exists());
}

#[tokio::test]
async fn test_fresh_confirmed_discards_previous_project_and_builds() {
    let h = harness(vec![
        write_reply("createComponent", "Header", "export default function Header() { return <header>Bakery</header> }"),
        write_reply("createPage", "home", &full_home_page()),
        finish_reply("Bakery site ready"),
    ]);
    let store = h.orchestrator.store();
    store.write_component("Old", "stale").unwrap();
    store.write_page("legacy", "<p>old</p>").unwrap();

    let result = h
        .orchestrator
        .run(RunRequest::new("Build a bakery site", Mode::Fresh).confirmed())
        .await
        .unwrap();

    let RunResult::Complete {
        history,
        iterations,
        stop_reason,
        applied_actions,
        context,
        ..
    } = result
    else {
        panic!("expected COMPLETE");
    };
    assert_eq!(stop_reason, StopReason::Finished);
    assert_eq!(iterations, 3);
    assert_eq!(applied_actions, 2);
    assert!(matches!(history.first(), Some(HistoryEntry::UserInstruction { .. })));

    assert!(!store.exists(ArtifactKind::Component, "Old"));
    assert!(!store.exists(ArtifactKind::Page, "legacy"));
    assert_eq!(store.read(ArtifactKind::Page, "home").unwrap(), full_home_page());
    assert!(store.root().join("package.json").is_file());

    let context = context.expect("context rebuilt after apply");
    assert_eq!(context.page_names(), vec!["home"]);
    assert_eq!(context.component_names(), vec!["Header"]);
    assert_eq!(context.metadata.total_iterations, 2);
    assert_eq!(context.metadata.last_action.as_deref(), Some("page_created"));
}

#[tokio::test]
async fn test_fresh_finish_over_placeholder_does_not_end_run() {
    let h = harness(vec![
        finish_reply("done already"),
        write_reply("createPage", "home", &full_home_page()),
        finish_reply("now really done"),
    ]);
    let result = h
        .orchestrator
        .run(RunRequest::new("Build a bakery site", Mode::Fresh).confirmed())
        .await
        .unwrap();

    let RunResult::Complete {
        history,
        iterations,
        stop_reason,
        ..
    } = result
    else {
        panic!("expected COMPLETE");
    };
    assert_eq!(iterations, 3);
    assert_eq!(stop_reason, StopReason::Finished);
    let notes: Vec<_> = history
        .iter()
        .filter(|e| matches!(e, HistoryEntry::SystemNote { .. }))
        .collect();
    assert_eq!(notes.len(), 1);
    match last_complete(&history) {
        Some(HistoryEntry::Complete { final_answer, .. }) => assert_eq!(final_answer, "now really done"),
        other => panic!("unexpected {other:?}"),
    }
    // 第二次推理的提示词里能看到纠正提示
    assert!(h.llm.prompts()[1].contains("Note: Home page still has placeholder"));
}

#[tokio::test]
async fn test_service_error_stops_without_guard() {
    let h = harness(vec![]);
    let result = h
        .orchestrator
        .run(RunRequest::new("Build a bakery site", Mode::Fresh).confirmed())
        .await
        .unwrap();

    let RunResult::Complete {
        iterations,
        stop_reason,
        context,
        ..
    } = result
    else {
        panic!("expected COMPLETE");
    };
    assert_eq!(stop_reason, StopReason::ServiceError);
    assert_eq!(iterations, 1);
    assert!(context.is_none());
}

#[tokio::test]
async fn test_modify_at_cap_makes_no_completion_call() {
    let h = harness(vec!["never used".to_string()]);
    let result = h
        .orchestrator
        .run(RunRequest::new("add pricing", Mode::Modify).with_iteration_count(5))
        .await
        .unwrap();
    assert_eq!(
        result,
        RunResult::CapReached {
            error: "Maximum iterations (5) reached. Consider regenerating the project.".into(),
            suggest_regenerate: true,
        }
    );
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_modify_without_project_needs_new_project() {
    let h = harness(vec!["never used".to_string()]);
    let result = h
        .orchestrator
        .run(RunRequest::new("add pricing", Mode::Modify))
        .await
        .unwrap();
    assert!(matches!(
        result,
        RunResult::Failed {
            needs_new_project: true,
            ..
        }
    ));
    assert_eq!(result.phase(), RunPhase::Failed);
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_modify_plan_is_seeded_with_context() {
    let h = harness(vec!["PLAN\nGoal: pricing".to_string()]);
    h.orchestrator.store().write_page("home", "<div>A</div>").unwrap();
    h.orchestrator
        .store()
        .write_component("Hero", "export default function Hero() {}")
        .unwrap();

    let result = h
        .orchestrator
        .run(RunRequest::new("add pricing", Mode::Modify).with_iteration_count(1))
        .await
        .unwrap();
    match result {
        RunResult::AwaitingConfirmation {
            iteration_count,
            context,
            ..
        } => {
            assert_eq!(iteration_count, 1);
            assert_eq!(context.unwrap().page_names(), vec!["home"]);
        }
        other => panic!("unexpected result {other:?}"),
    }
    let prompt = &h.llm.prompts()[0];
    assert!(prompt.contains("- Pages: home"));
    assert!(prompt.contains("- Components: Hero"));
}

#[tokio::test]
async fn test_failed_action_halts_loop() {
    let h = harness(vec![
        "Thought: add pricing\nAction: updatePage\nParams: {\"name\": \"pricing\", \"section\": \"<p/>\"}".to_string(),
        finish_reply("unreachable"),
    ]);
    h.orchestrator.store().write_page("home", "<div>A</div>").unwrap();

    let result = h
        .orchestrator
        .run(RunRequest::new("add pricing", Mode::Modify).confirmed())
        .await
        .unwrap();
    let RunResult::Complete {
        history,
        stop_reason,
        applied_actions,
        context,
        ..
    } = result
    else {
        panic!("expected COMPLETE");
    };
    assert_eq!(stop_reason, StopReason::ActionFailed);
    assert_eq!(applied_actions, 0);
    assert!(context.is_none());
    assert_eq!(h.llm.call_count(), 1);
    match history.iter().find(|e| matches!(e, HistoryEntry::Observe { .. })) {
        Some(HistoryEntry::Observe { result, .. }) => {
            assert!(!result.success);
            assert!(result.summary().contains("Use createPage instead"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_reasoning_cap_counts_as_success() {
    let h = harness_with(
        vec![
            write_reply("createComponent", "Hero", "export default function Hero() {}"),
            write_reply("createComponent", "Footer", "export default function Footer() {}"),
            finish_reply("unreachable"),
        ],
        |cfg| cfg.agent.max_reasoning_steps = 2,
    );
    h.orchestrator.store().write_page("home", "<div>A</div>").unwrap();

    let result = h
        .orchestrator
        .run(RunRequest::new("add hero and footer", Mode::Modify).auto_fix())
        .await
        .unwrap();
    let RunResult::Complete {
        history,
        iterations,
        stop_reason,
        applied_actions,
        context,
        ..
    } = result
    else {
        panic!("expected COMPLETE");
    };
    assert_eq!(iterations, 2);
    assert_eq!(stop_reason, StopReason::IterationCap);
    assert_eq!(applied_actions, 2);
    assert_eq!(context.unwrap().component_names(), vec!["Footer", "Hero"]);
    assert!(matches!(
        last_complete(&history),
        Some(HistoryEntry::Complete {
            stop_reason: StopReason::IterationCap,
            ..
        })
    ));
}

#[tokio::test]
async fn test_session_confirm_cancel_and_counter() {
    let h = harness(vec![
        "PLAN\nGoal: cta".to_string(),
        "Thought: add cta\nAction: updatePage\nParams: {\"name\": \"home\", \"section\": \"<section>X</section>\", \"position\": \"before_closing\"}".to_string(),
        finish_reply("cta added"),
        "PLAN\nGoal: something else".to_string(),
    ]);
    h.orchestrator.store().write_page("home", "<div>A</div>").unwrap();
    let mut session = AgentSession::new(h.orchestrator);

    assert!(matches!(session.confirm().await, Err(AgentError::NoPendingPlan)));

    let planned = session.submit("add a call to action", Mode::Modify).await.unwrap();
    assert_eq!(planned.phase(), RunPhase::AwaitingConfirmation);
    assert!(session.pending().is_some());

    let done = session.confirm().await.unwrap();
    assert!(matches!(
        done,
        RunResult::Complete {
            stop_reason: StopReason::Finished,
            applied_actions: 1,
            ..
        }
    ));
    assert_eq!(session.iteration_count(), 1);
    assert!(session.pending().is_none());

    let home = session
        .orchestrator()
        .store()
        .read(ArtifactKind::Page, "home")
        .unwrap();
    assert!(home.find('X').unwrap() < home.rfind("</div>").unwrap());

    session.submit("something else", Mode::Modify).await.unwrap();
    let cancelled = session.cancel().unwrap();
    assert_eq!(cancelled.iteration_count, 1);
    assert!(matches!(session.confirm().await, Err(AgentError::NoPendingPlan)));

    // 计划可以序列化保存后再恢复
    let saved = serde_json::to_string(&cancelled).unwrap();
    session.restore(serde_json::from_str(&saved).unwrap());
    assert_eq!(session.pending().unwrap().instruction, "something else");
}

#[tokio::test]
async fn test_fresh_completion_resets_counter() {
    let h = harness(vec![
        "PROJECT PLAN".to_string(),
        write_reply("createPage", "home", &full_home_page()),
        finish_reply("done"),
    ]);
    let mut session = AgentSession::new(h.orchestrator);
    session.set_iteration_count(3);
    session.submit("bakery", Mode::Fresh).await.unwrap();
    session.confirm().await.unwrap();
    assert_eq!(session.iteration_count(), 0);
}

#[tokio::test]
async fn test_auto_fix_outcomes() {
    let h = harness(vec![
        write_reply("createComponent", "Hero", "export default function Hero() {}"),
        finish_reply("fixed"),
    ]);
    assert_eq!(h.orchestrator.auto_fix(0).await.unwrap(), AutoFixOutcome::NoProject);

    h.orchestrator.store().write_page("home", "<div>A</div>").unwrap();
    assert_eq!(h.orchestrator.auto_fix(0).await.unwrap(), AutoFixOutcome::NoErrors);

    h.diagnostics
        .push("ReferenceError: Hero is not defined".to_string());
    let outcome = h.orchestrator.auto_fix(0).await.unwrap();
    let AutoFixOutcome::Ran { result } = outcome else {
        panic!("expected auto-fix to run");
    };
    assert!(matches!(
        result,
        RunResult::Complete {
            stop_reason: StopReason::Finished,
            ..
        }
    ));
    assert!(h.llm.prompts()[0].contains("Fix the following errors:"));
    assert!(h.llm.prompts()[0].contains("Missing components: 1 issues"));
    assert!(h.diagnostics.snapshot().is_empty());
}

#[tokio::test]
async fn test_phase_events_are_emitted() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let orchestrator = OrchestratorBuilder::new(AppConfig::default())
        .with_llm(Arc::new(ScriptedLlmClient::new(["PLAN"])))
        .with_project_root(dir.path().join("site"))
        .with_event_sender(tx)
        .build();
    orchestrator
        .run(RunRequest::new("bakery", Mode::Fresh))
        .await
        .unwrap();

    let mut phases = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if let RunEvent::Phase { phase, .. } = ev {
            phases.push(phase);
        }
    }
    assert_eq!(phases, vec![RunPhase::Planning, RunPhase::AwaitingConfirmation]);
}
