//! sitesmith CLI
//!
//! 计划生成后在 stdin 上询问 y/N，`--yes` 跳过确认。结果以 JSON 打印到 stdout；
//! `--events` 把运行事件以 JSON 行输出到 stderr。

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sitesmith::config::{load_config, AppConfig};
use sitesmith::context::{DiagnosticBuffer, DiagnosticFeed};
use sitesmith::core::{AgentSession, Mode, OrchestratorBuilder, RunResult};
use sitesmith::observability;

#[derive(Debug, Parser)]
#[command(
    name = "sitesmith",
    version,
    about = "Plan-then-confirm website generation agent"
)]
struct Cli {
    /// Extra config file layered over config/default.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Generated project root (overrides app.project_root).
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Print run events to stderr as JSON lines.
    #[arg(long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discard the current project and build a new one.
    Fresh {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Modify the existing project.
    Modify {
        #[command(flatten)]
        run: RunArgs,
        /// Applied iterations so far.
        #[arg(long, default_value_t = 0)]
        iteration: usize,
    },
    /// Fix the errors found in a diagnostics log.
    AutoFix {
        #[arg(long, default_value_t = 0)]
        iteration: usize,
        /// Build / preview output to categorize.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Print the project tree.
    Tree,
    /// Print the categorized diagnostics.
    Errors {
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Natural-language instruction.
    #[arg(required = true, num_args = 1..)]
    instruction: Vec<String>,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    yes: bool,
}

impl RunArgs {
    fn instruction(&self) -> String {
        self.instruction.join(" ")
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn confirm_on_stdin() -> anyhow::Result<bool> {
    print!("Proceed with this plan? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn load_diagnostics(log: Option<&PathBuf>) -> anyhow::Result<DiagnosticBuffer> {
    let diagnostics = DiagnosticBuffer::new();
    if let Some(log) = log {
        let text = std::fs::read_to_string(log)
            .with_context(|| format!("Failed to read diagnostics log {}", log.display()))?;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            diagnostics.push(line.to_string());
        }
    }
    Ok(diagnostics)
}

async fn plan_and_run(mut session: AgentSession, run: &RunArgs, mode: Mode) -> anyhow::Result<()> {
    let planned = session.submit(&run.instruction(), mode).await?;
    let RunResult::AwaitingConfirmation { plan, .. } = &planned else {
        return print_json(&planned);
    };
    println!("{plan}\n");
    if !run.yes && !confirm_on_stdin()? {
        session.cancel();
        println!("Cancelled.");
        return Ok(());
    }
    let result = session.confirm().await.context("Run failed")?;
    print_json(&result)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let log = match &cli.command {
        Command::AutoFix { log, .. } | Command::Errors { log } => log.as_ref(),
        _ => None,
    };
    let diagnostics = load_diagnostics(log)?;

    let mut builder = OrchestratorBuilder::new(cfg).with_diagnostics(Arc::new(diagnostics));
    if let Some(root) = &cli.project {
        builder = builder.with_project_root(root);
    }
    if cli.events {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        builder = builder.with_event_sender(tx);
        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&ev) {
                    eprintln!("{line}");
                }
            }
        });
    }
    let orchestrator = builder.build();

    match &cli.command {
        Command::Fresh { run } => plan_and_run(AgentSession::new(orchestrator), run, Mode::Fresh).await,
        Command::Modify { run, iteration } => {
            let mut session = AgentSession::new(orchestrator);
            session.set_iteration_count(*iteration);
            plan_and_run(session, run, Mode::Modify).await
        }
        Command::AutoFix { iteration, .. } => {
            let mut session = AgentSession::new(orchestrator);
            session.set_iteration_count(*iteration);
            let outcome = session.auto_fix().await.context("Auto-fix failed")?;
            print_json(&outcome)
        }
        Command::Tree => print_json(&orchestrator.store().project_tree()?),
        Command::Errors { .. } => print_json(&orchestrator.analyzer().detected_errors()),
    }
}
