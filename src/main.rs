//! Hive - 命令行驱动
//!
//! 用法：hive [session-id] [config.toml]
//! 逐行读取用户输入并流式打印回复；运行挂起时逐个展示待审批动作并读取决定；
//! /history 打印会话历史，/quit 退出；Ctrl+C 取消当前调用。

use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use hive::approval::{edit_template, parse_decision, ApprovalRequest, Decision, DecisionKind, ParsedInput};
use hive::config::{load_config, UnparsableInput};
use hive::memory::{Role, ToolCallRequest};
use hive::{build_supervisor, AgentError, RunOutcome, Supervisor, TurnEvent};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

type InputLines = Lines<BufReader<Stdin>>;

fn render_event(ev: &TurnEvent) {
    match ev {
        TurnEvent::TextDelta { text } => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        TurnEvent::ToolCall { tool, args } => println!("\n[tool] {} {}", tool, args),
        TurnEvent::Observation { tool, preview } => println!("[observation] {}: {}", tool, preview),
        TurnEvent::ToolFailure { tool, reason } => println!("[tool failed] {}: {}", tool, reason),
        TurnEvent::Compacted { removed } => println!("[history compacted: {} messages]", removed),
        TurnEvent::Error { text } => println!("\n[error] {}", text),
        TurnEvent::TurnStarted { .. }
        | TurnEvent::ReasoningDelta { .. }
        | TurnEvent::ApprovalRequired { .. }
        | TurnEvent::MessageDone { .. } => {}
    }
}

/// 运行一次驱动调用：事件边到边打印，Ctrl+C 取消
async fn streamed<F, Fut>(supervisor: &Supervisor, session_id: &str, call: F) -> Result<RunOutcome, AgentError>
where
    F: FnOnce(mpsc::UnboundedSender<TurnEvent>) -> Fut,
    Fut: Future<Output = Result<RunOutcome, AgentError>>,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            render_event(&ev);
        }
    });
    let fut = call(tx);
    tokio::pin!(fut);
    let result = loop {
        tokio::select! {
            r = &mut fut => break r,
            _ = tokio::signal::ctrl_c() => {
                supervisor.cancel(session_id);
            }
        }
    };
    let _ = printer.await;
    println!();
    result
}

fn print_action_prompt(index: usize, total: usize, req: &ApprovalRequest) {
    let action = &req.actions[index];
    println!("\n=== Approval required ({}/{}) ===", index + 1, total);
    println!("{}", action.description);
    let allowed: Vec<&str> = action.allowed_decisions.iter().map(DecisionKind::as_str).collect();
    println!("Allowed: {}", allowed.join(" | "));
    if action.allowed_decisions.contains(&DecisionKind::Edit) {
        println!("Edit template: edit {} {}", action.name, edit_template(&as_call(action)));
    }
}

fn as_call(action: &hive::approval::ActionDescription) -> ToolCallRequest {
    ToolCallRequest::new(action.tool_call_id.clone(), action.name.clone(), action.args.clone())
}

/// 为批次中的每个动作读取一个决定
async fn collect_decisions(
    req: &ApprovalRequest,
    lines: &mut InputLines,
    policy: UnparsableInput,
) -> anyhow::Result<Option<HashMap<String, Decision>>> {
    let mut decisions = HashMap::new();
    let total = req.actions.len();
    for (i, action) in req.actions.iter().enumerate() {
        print_action_prompt(i, total, req);
        let call = as_call(action);
        loop {
            print!("decision> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                return Ok(None);
            };
            match parse_decision(&line, &call, policy) {
                ParsedInput::Decided(d) => {
                    decisions.insert(action.tool_call_id.clone(), d);
                    break;
                }
                ParsedInput::Reprompt(hint) => println!("{}", hint),
            }
        }
    }
    Ok(Some(decisions))
}

async fn print_history(supervisor: &Supervisor, session_id: &str) -> anyhow::Result<()> {
    for msg in supervisor.history(session_id).await? {
        match msg.role {
            Role::Tool => println!(
                "[tool:{}] {}",
                msg.tool_call_id.as_deref().unwrap_or("?"),
                msg.content
            ),
            role => {
                println!("[{}] {}", role.as_str(), msg.content);
                for call in &msg.tool_calls {
                    println!("    -> {}({}) id={}", call.name, call.args_value(), call.id);
                }
            }
        }
    }
    Ok(())
}

/// 处理运行结果：挂起时收集决定并恢复，直到完成或出错
async fn settle(
    supervisor: &Supervisor,
    session_id: &str,
    mut outcome: Result<RunOutcome, AgentError>,
    lines: &mut InputLines,
    policy: UnparsableInput,
) -> anyhow::Result<bool> {
    loop {
        match outcome {
            Ok(RunOutcome::Completed { .. }) => return Ok(true),
            Ok(RunOutcome::PendingApproval(req)) => {
                let Some(decisions) = collect_decisions(&req, lines, policy).await? else {
                    return Ok(false);
                };
                outcome = streamed(supervisor, session_id, |tx| {
                    supervisor.submit_decisions_stream(session_id, &req.request_id, decisions, tx)
                })
                .await;
            }
            Err(e) => {
                eprintln!("error: {}", e);
                return Ok(true);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let mut args = std::env::args().skip(1);
    let session_id = args.next().unwrap_or_else(|| "default".to_string());
    let config_path = args.next().map(PathBuf::from);

    let cfg = load_config(config_path).context("Failed to load config")?;
    let policy = cfg.approval.unparsable_input;
    let supervisor = build_supervisor(&cfg).context("Failed to build supervisor")?;

    println!("hive session '{}' (/history, /quit)", session_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // 上次退出时仍挂起的审批
    if let Some(req) = supervisor.pending_approval(&session_id).await? {
        println!("Session has a pending approval.");
        if !settle(&supervisor, &session_id, Ok(RunOutcome::PendingApproval(req)), &mut lines, policy).await? {
            return Ok(());
        }
    }

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                print_history(&supervisor, &session_id).await?;
                continue;
            }
            _ => {}
        }
        let outcome = streamed(&supervisor, &session_id, |tx| {
            supervisor.start_or_continue_stream(&session_id, input, tx)
        })
        .await;
        if !settle(&supervisor, &session_id, outcome, &mut lines, policy).await? {
            break;
        }
    }
    Ok(())
}
