//! 轮次执行器与运行循环
//!
//! 单轮：Drafting（历史 + 工具目录 -> 后端，流式增量只进累积器）-> Normalizing（规范化后追加 assistant 消息）
//! -> Dispatching（按序执行未受审批的调用，受审批的收集成批）-> Completed | Suspended。
//! 运行循环：草拟前按策略压缩；每轮结束校验引用完整性并保存；无工具调用时完成；挂起时返回审批请求；
//! 超过 max_turns 时返回说明上限的完成结果。
//! 工具失败是数据：写成带结构化错误描述的 tool 消息，不越过这一层。

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::approval::{validate_decisions, ApprovalGate, ApprovalRequest, AutoApprove, Decision, PendingApproval};
use crate::core::AgentError;
use crate::llm::{Delta, DraftAccumulator, LlmClient, ProviderProfile, RawOutput, Segment, ToolResultFormat};
use crate::memory::{Message, ToolCallRequest, TrimPolicy};
use crate::react::normalizer::{find_duplicate_id, flatten_to_text, normalize_with};
use crate::react::TurnEvent;
use crate::session::{Checkpointer, Session};
use crate::tools::{ToolError, ToolExecutor};

/// 单次运行内最大草拟轮数，防止死循环
const MAX_TURNS: usize = 20;
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一次驱动调用的上下文：取消令牌、可选事件通道、可选检查点
pub struct TurnContext<'a> {
    pub cancel_token: CancellationToken,
    pub event_tx: Option<&'a UnboundedSender<TurnEvent>>,
    pub checkpointer: Option<&'a dyn Checkpointer>,
}

impl<'a> TurnContext<'a> {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            event_tx: None,
            checkpointer: None,
        }
    }

    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<TurnEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: &'a dyn Checkpointer) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    fn send(&self, ev: TurnEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }

    async fn save(&self, session: &mut Session) -> Result<(), AgentError> {
        session.touch();
        if let Some(cp) = self.checkpointer {
            cp.save(session).await?;
        }
        Ok(())
    }
}

/// 单轮结果
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// 回复不含工具调用
    Completed(String),
    /// 工具调用都已执行，需要下一轮
    Dispatched,
    /// 受审批调用成批挂起
    Suspended(ApprovalRequest),
}

/// 一次运行（直到完成或挂起）的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { final_text: String },
    PendingApproval(ApprovalRequest),
}

/// 绑定角色提示词、后端、工具子集与审批策略的智能体
pub struct Agent {
    name: String,
    role_prompt: String,
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    gate: Arc<dyn ApprovalGate>,
    profile: ProviderProfile,
    trim: TrimPolicy,
    max_turns: usize,
}

impl Agent {
    /// 最小配置：不拦截任何工具，默认策略与压缩阈值
    pub fn new(
        name: impl Into<String>,
        role_prompt: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            role_prompt: role_prompt.into(),
            llm,
            executor,
            gate: Arc::new(AutoApprove),
            profile: ProviderProfile::default(),
            trim: TrimPolicy::default(),
            max_turns: MAX_TURNS,
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_trim_policy(mut self, trim: TrimPolicy) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gate(&self) -> &dyn ApprovalGate {
        self.gate.as_ref()
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// 会话前言（首条消息）
    pub fn preamble(&self) -> Message {
        Message::system(self.role_prompt.clone())
    }

    /// 未决审批的展示形式
    pub fn describe_pending(&self, session: &Session) -> Option<ApprovalRequest> {
        session
            .pending
            .as_ref()
            .map(|p| ApprovalRequest::from_pending(&session.id, p, self.gate.as_ref()))
    }

    /// 追加用户输入后运行；有未决审批时拒绝新输入
    pub async fn start(
        &self,
        session: &mut Session,
        user_text: &str,
        ctx: &TurnContext<'_>,
    ) -> Result<RunOutcome, AgentError> {
        if let Some(p) = &session.pending {
            return Err(AgentError::AwaitingApproval {
                session_id: session.id.clone(),
                request_id: p.request_id.clone(),
            });
        }
        if session.messages.is_empty() {
            session.messages.append(self.preamble());
        }
        session.messages.append(Message::user(user_text));
        self.run(session, ctx).await
    }

    /// 一次性任务：临时会话跑到完成，返回最终文本（委派给 Worker 时使用）
    pub async fn run_task(&self, task: &str) -> Result<String, AgentError> {
        let mut session = Session::new(format!("{}-{}", self.name, uuid::Uuid::new_v4().simple()));
        let ctx = TurnContext::new(CancellationToken::new());
        match self.start(&mut session, task, &ctx).await? {
            RunOutcome::Completed { final_text } => Ok(final_text),
            RunOutcome::PendingApproval(req) => Err(AgentError::AwaitingApproval {
                session_id: req.session_id,
                request_id: req.request_id,
            }),
        }
    }

    /// 运行循环：turn -> 可能挂起 -> ... -> 无工具调用的最终回复
    pub async fn run(&self, session: &mut Session, ctx: &TurnContext<'_>) -> Result<RunOutcome, AgentError> {
        if let Some(p) = &session.pending {
            return Err(AgentError::AwaitingApproval {
                session_id: session.id.clone(),
                request_id: p.request_id.clone(),
            });
        }

        for turn in 1..=self.max_turns {
            ctx.send(TurnEvent::TurnStarted {
                turn,
                max_turns: self.max_turns,
            });
            if ctx.cancel_token.is_cancelled() {
                ctx.send(TurnEvent::Error {
                    text: "Cancelled".to_string(),
                });
                return Err(AgentError::Cancelled);
            }

            let removed = session.messages.compact(&self.trim);
            if removed > 0 {
                tracing::info!(session_id = %session.id, removed, "history compacted");
                ctx.send(TurnEvent::Compacted { removed });
            }

            let outcome = match self.run_turn(session, ctx).await {
                Ok(o) => o,
                Err(e) => {
                    tracing::warn!(session_id = %session.id, agent = %self.name, turn, error = %e, "turn failed");
                    ctx.send(TurnEvent::Error { text: e.to_string() });
                    return Err(e);
                }
            };
            session.validate()?;
            ctx.save(session).await?;

            match outcome {
                TurnOutcome::Completed(text) => {
                    tracing::info!(session_id = %session.id, agent = %self.name, turn, "run completed");
                    ctx.send(TurnEvent::MessageDone { text: text.clone() });
                    return Ok(RunOutcome::Completed { final_text: text });
                }
                TurnOutcome::Suspended(request) => {
                    tracing::info!(
                        session_id = %session.id,
                        request_id = %request.request_id,
                        actions = request.actions.len(),
                        "run suspended for approval"
                    );
                    ctx.send(TurnEvent::ApprovalRequired {
                        request: request.clone(),
                    });
                    return Ok(RunOutcome::PendingApproval(request));
                }
                TurnOutcome::Dispatched => {}
            }
        }

        tracing::warn!(session_id = %session.id, max_turns = self.max_turns, "turn limit reached");
        let text = format!(
            "Reached the turn limit ({}) without a final answer.",
            self.max_turns
        );
        ctx.send(TurnEvent::MessageDone { text: text.clone() });
        Ok(RunOutcome::Completed { final_text: text })
    }

    /// 单轮：草拟 -> 规范化 -> 分发
    pub async fn run_turn(&self, session: &mut Session, ctx: &TurnContext<'_>) -> Result<TurnOutcome, AgentError> {
        let raw = self.draft(session, ctx).await?;

        let normalized = normalize_with(&raw, self.profile.normalizer);
        if let Some(id) = find_duplicate_id(&normalized.tool_calls) {
            return Err(AgentError::MalformedOutput(format!("duplicate tool call id '{}'", id)));
        }
        let text = normalized.text;
        let calls = normalized.tool_calls;
        session
            .messages
            .append(Message::assistant_with_calls(text.clone(), calls.clone()));
        if calls.is_empty() {
            return Ok(TurnOutcome::Completed(text));
        }

        let mut batch: Vec<ToolCallRequest> = Vec::new();
        for call in calls {
            if self.gate.should_gate(&call.name) {
                tracing::debug!(tool = %call.name, tool_call_id = %call.id, "tool call gated");
                batch.push(call);
                continue;
            }
            let msg = self.invoke(&call.id, &call.name, call.args_value(), ctx).await;
            session.messages.append(msg);
        }

        if batch.is_empty() {
            return Ok(TurnOutcome::Dispatched);
        }
        let pending = PendingApproval::new(batch);
        let request = ApprovalRequest::from_pending(&session.id, &pending, self.gate.as_ref());
        session.pending = Some(pending);
        Ok(TurnOutcome::Suspended(request))
    }

    /// 按决定解决未决审批，保存后继续运行。校验失败时不修改会话。
    pub async fn resume(
        &self,
        session: &mut Session,
        request_id: &str,
        decisions: &HashMap<String, Decision>,
        ctx: &TurnContext<'_>,
    ) -> Result<RunOutcome, AgentError> {
        let pending = session
            .pending
            .clone()
            .ok_or_else(|| AgentError::NoPendingApproval(session.id.clone()))?;
        validate_decisions(&pending, request_id, decisions, self.gate.as_ref(), |name| {
            self.executor.has_tool(name)
        })?;
        let resolved: Vec<(&ToolCallRequest, &Decision)> = pending
            .action_requests
            .iter()
            .filter_map(|action| decisions.get(&action.id).map(|d| (action, d)))
            .collect();

        for (action, decision) in resolved {
            tracing::info!(
                session_id = %session.id,
                tool_call_id = %action.id,
                decision = decision.kind().as_str(),
                "applying decision"
            );
            let msg = match decision {
                Decision::Approve => self.invoke(&action.id, &action.name, action.args_value(), ctx).await,
                Decision::Reject { reason } => Message::tool(&action.id, rejection_text(action, reason.as_deref())),
                Decision::Edit { name, args } => {
                    self.invoke(&action.id, name, Value::Object(args.clone()), ctx).await
                }
            };
            session.messages.append(msg);
        }
        session.pending = None;
        session.validate()?;
        ctx.save(session).await?;

        self.run(session, ctx).await
    }

    /// 草拟：增量只进入累积器并推送事件；取消时整段丢弃
    async fn draft(&self, session: &Session, ctx: &TurnContext<'_>) -> Result<RawOutput, AgentError> {
        let history = session.messages.snapshot();
        let catalog = self.executor.catalog();
        let mut stream = tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => return Err(AgentError::Cancelled),
            r = self.llm.generate(&history, &catalog) => r?,
        };

        let mut acc = DraftAccumulator::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancel_token.cancelled() => return Err(AgentError::Cancelled),
                n = stream.next() => n,
            };
            let Some(delta) = next else { break };
            let delta = delta?;
            match &delta {
                Delta::Text(t) | Delta::Segment(Segment::Text { text: t }) => {
                    ctx.send(TurnEvent::TextDelta { text: t.clone() })
                }
                Delta::Segment(Segment::Reasoning { text }) => {
                    ctx.send(TurnEvent::ReasoningDelta { text: text.clone() })
                }
                Delta::Segment(_) => {}
            }
            acc.push(delta);
        }
        Ok(acc.finish())
    }

    /// 执行一个工具调用并生成回答它的 tool 消息（失败折叠为结构化错误）
    async fn invoke(&self, call_id: &str, tool: &str, args: Value, ctx: &TurnContext<'_>) -> Message {
        ctx.send(TurnEvent::ToolCall {
            tool: tool.to_string(),
            args: args.clone(),
        });
        let content = match self.executor.execute(tool, args).await {
            Ok(value) => {
                let content = self.format_result(&value);
                ctx.send(TurnEvent::Observation {
                    tool: tool.to_string(),
                    preview: preview(&content),
                });
                content
            }
            Err(e) => {
                tracing::warn!(tool = %tool, tool_call_id = %call_id, error = %e, "tool failed");
                ctx.send(TurnEvent::ToolFailure {
                    tool: tool.to_string(),
                    reason: e.to_string(),
                });
                self.format_result(&tool_error_payload(tool, &e))
            }
        };
        Message::tool(call_id, content)
    }

    fn format_result(&self, value: &Value) -> String {
        match self.profile.tool_results {
            ToolResultFormat::Structured => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            ToolResultFormat::TextOnly => flatten_to_text(value),
        }
    }
}

/// 工具失败的结构化描述
pub fn tool_error_payload(tool: &str, err: &ToolError) -> Value {
    serde_json::json!({
        "error": {
            "tool": tool,
            "kind": err.kind(),
            "message": err.to_string(),
        }
    })
}

fn rejection_text(action: &ToolCallRequest, reason: Option<&str>) -> String {
    match reason {
        Some(r) if !r.trim().is_empty() => format!(
            "Rejected by reviewer: tool call '{}' was not executed. Reason: {}",
            action.name, r
        ),
        _ => format!("Rejected by reviewer: tool call '{}' was not executed.", action.name),
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", s.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{DecisionKind, StaticGate};
    use crate::core::ProtocolViolation;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::memory::Role;
    use crate::session::MemoryCheckpointer;
    use crate::tools::{Tool, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo args"
        }

        async fn execute(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    struct Boom;

    #[async_trait]
    impl Tool for Boom {
        fn name(&self) -> &str {
            "boom"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            Err(ToolError::Failed("disk on fire".into()))
        }
    }

    fn agent(llm: Arc<MockLlmClient>) -> Agent {
        let mut reg = ToolRegistry::new();
        reg.register(Echo);
        reg.register(Boom);
        Agent::new("test", "You are a test agent.", llm, ToolExecutor::new(reg, 5))
            .with_gate(Arc::new(StaticGate::new().gate("echo", &DecisionKind::ALL)))
    }

    #[tokio::test]
    async fn test_plain_reply_completes_immediately() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_reply(vec![Delta::text("Hel"), Delta::text("lo")]);
        let agent = agent(llm.clone());
        let mut s = Session::new("s");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let ctx = TurnContext::new(CancellationToken::new()).with_event_tx(&tx);
        let out = agent.start(&mut s, "hi", &ctx).await.unwrap();
        assert_eq!(out, RunOutcome::Completed { final_text: "Hello".into() });
        assert_eq!(s.messages.len(), 3);

        let mut deltas = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let TurnEvent::TextDelta { text } = ev {
                deltas.push(text);
            }
        }
        assert_eq!(deltas, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_tool_failure_is_folded_into_history() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_tool_call("c1", "boom", json!({}));
        llm.push_text("sorry");
        let agent = agent(llm.clone());
        let mut s = Session::new("s");
        let ctx = TurnContext::new(CancellationToken::new());
        let out = agent.start(&mut s, "do it", &ctx).await.unwrap();
        assert_eq!(out, RunOutcome::Completed { final_text: "sorry".into() });

        let tool_msg = &s.messages.messages()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
        let payload: Value = serde_json::from_str(&tool_msg.content).unwrap();
        assert_eq!(payload["error"]["kind"], "failed");
        assert_eq!(payload["error"]["tool"], "boom");
        // 第二次草拟看到了失败信息
        assert_eq!(llm.seen_histories()[1].len(), 4);
    }

    #[tokio::test]
    async fn test_gated_call_suspends_and_blocks_new_input() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_tool_call("c1", "echo", json!({"x": 1}));
        let agent = agent(llm.clone());
        let cp = MemoryCheckpointer::new();
        let mut s = Session::new("s");
        let ctx = TurnContext::new(CancellationToken::new()).with_checkpointer(&cp);
        let out = agent.start(&mut s, "go", &ctx).await.unwrap();
        let RunOutcome::PendingApproval(req) = out else {
            panic!("expected suspension");
        };
        assert_eq!(req.actions.len(), 1);
        assert_eq!(req.actions[0].name, "echo");
        assert_eq!(cp.load("s").await.unwrap().unwrap().pending.unwrap().request_id, req.request_id);

        let err = agent.start(&mut s, "again", &ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::AwaitingApproval { .. }));
        assert_eq!(llm.remaining(), 0);
        assert_eq!(llm.seen_histories().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_id_reused_across_turns_suspends() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_tool_call("call_0", "boom", json!({}));
        llm.push_tool_call("call_0", "echo", json!({"x": 2}));
        let agent = agent(llm.clone());
        let cp = MemoryCheckpointer::new();
        let mut s = Session::new("s");
        let ctx = TurnContext::new(CancellationToken::new()).with_checkpointer(&cp);

        let RunOutcome::PendingApproval(req) = agent.start(&mut s, "go", &ctx).await.unwrap() else {
            panic!("expected suspension");
        };
        assert_eq!(req.actions.len(), 1);
        assert_eq!(req.actions[0].tool_call_id, "call_0");
        assert_eq!(req.actions[0].name, "echo");
        // 第一轮的失败结果已随挂起一起保存
        let saved = cp.load("s").await.unwrap().unwrap();
        assert_eq!(saved.messages.len(), 5);
        assert_eq!(saved.validate(), Ok(()));

        llm.push_text("done");
        let decisions = HashMap::from([("call_0".to_string(), Decision::Approve)]);
        let out = agent.resume(&mut s, &req.request_id, &decisions, &ctx).await.unwrap();
        assert_eq!(out, RunOutcome::Completed { final_text: "done".into() });
        let last_tool = &s.messages.messages()[5];
        assert_eq!(last_tool.tool_call_id.as_deref(), Some("call_0"));
        assert_eq!(last_tool.content, "{\"x\":2}");
        assert_eq!(s.validate(), Ok(()));
    }

    #[tokio::test]
    async fn test_partial_decisions_do_not_mutate() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_reply(vec![
            Delta::Segment(Segment::tool_call("c1", "echo", json!({}))),
            Delta::Segment(Segment::tool_call("c2", "echo", json!({}))),
        ]);
        let agent = agent(llm);
        let mut s = Session::new("s");
        let ctx = TurnContext::new(CancellationToken::new());
        let RunOutcome::PendingApproval(req) = agent.start(&mut s, "go", &ctx).await.unwrap() else {
            panic!("expected suspension");
        };
        let before = s.clone();
        let decisions = HashMap::from([("c1".to_string(), Decision::Approve)]);
        let err = agent.resume(&mut s, &req.request_id, &decisions, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Protocol(ProtocolViolation::MissingDecision(ref id)) if id == "c2"
        ));
        assert_eq!(s, before);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_malformed_output() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_reply(vec![
            Delta::Segment(Segment::tool_call("dup", "boom", json!({}))),
            Delta::Segment(Segment::tool_call("dup", "boom", json!({}))),
        ]);
        let agent = agent(llm);
        let mut s = Session::new("s");
        let ctx = TurnContext::new(CancellationToken::new());
        let err = agent.start(&mut s, "go", &ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn test_backend_failure_is_turn_level_error() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_failure(LlmError::Unavailable("down".into()));
        let agent = agent(llm);
        let cp = MemoryCheckpointer::new();
        let mut s = Session::new("s");
        let ctx = TurnContext::new(CancellationToken::new()).with_checkpointer(&cp);
        let err = agent.start(&mut s, "go", &ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::Backend(LlmError::Unavailable(_))));
        assert!(cp.load("s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_drafting_discards_draft() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_text("never seen");
        let agent = agent(llm.clone());
        let token = CancellationToken::new();
        token.cancel();
        let mut s = Session::new("s");
        let ctx = TurnContext::new(token);
        let err = agent.start(&mut s, "go", &ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert!(s.messages.last_assistant().is_none());
        assert_eq!(llm.remaining(), 1);
    }

    #[tokio::test]
    async fn test_turn_limit_returns_completion() {
        let llm = Arc::new(MockLlmClient::new());
        for i in 0..3 {
            llm.push_tool_call(&format!("c{}", i), "boom", json!({}));
        }
        let agent = agent(llm).with_max_turns(2);
        let mut s = Session::new("s");
        let ctx = TurnContext::new(CancellationToken::new());
        let RunOutcome::Completed { final_text } = agent.start(&mut s, "loop", &ctx).await.unwrap() else {
            panic!("expected completion");
        };
        assert!(final_text.contains("turn limit (2)"));
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn test_text_only_results_are_flattened() {
        let llm = Arc::new(MockLlmClient::new());
        let agent = agent(llm).with_profile(ProviderProfile {
            tool_results: ToolResultFormat::TextOnly,
            ..ProviderProfile::default()
        });
        assert_eq!(agent.format_result(&json!({"content": ["a", "b"]})), "a\nb");
        assert_eq!(agent.format_result(&json!("plain")), "plain");
    }
}
