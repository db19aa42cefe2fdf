//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，dispatch(action) 在超时内调用对应工具，
//! 结果（成功 / 失败 / 超时）统一转为 Observation；每次调用输出一行结构化审计日志（JSON）。
//! 超时的调用仍会被等待到结束，dispatch 返回时不存在未完成的存储操作。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::react::{Action, Observation};
use crate::tools::ToolRegistry;

/// 工具执行器：对每次调用施加超时
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行动作对应的工具；永不返回 Err，失败以 Observation::failed 表示
    pub async fn dispatch(&self, action: &Action) -> Observation {
        let tool_name = action.tool_name();
        let args = action.params();
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let call = self.registry.execute(tool_name, args);
        tokio::pin!(call);
        let result = match timeout(self.timeout, &mut call).await {
            Ok(r) => Ok(r),
            Err(elapsed) => {
                // 超时后仍等待进行中的存储操作落定，dispatch 返回后不留后台写入
                tracing::warn!(tool = tool_name, "tool timed out, waiting for the in-flight operation");
                let late = call.await;
                tracing::warn!(tool = tool_name, settled_ok = late.is_ok(), "timed-out tool settled");
                Err(elapsed)
            }
        };

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(output)) => Observation::ok(output.message, output.file_path),
            Ok(Err(e)) => Observation::failed(e),
            Err(_) => Observation::failed(format!(
                "Tool {} timed out after {}s",
                tool_name,
                self.timeout.as_secs()
            )),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
