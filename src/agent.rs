//! 监督者与驱动层 API
//!
//! build_supervisor 按配置构建：research / ops 两个 Worker（各自固定工具子集、自动放行），
//! 监督者持有原生工具（计算、时间）与两个委派工具，受审批策略来自 [approval]。
//! Supervisor 对外提供 start_or_continue / submit_decisions（及流式版本）、pending_approval、history、cancel；
//! 每个会话串行执行，会话状态每次调用都从检查点重新加载，最后一次成功保存即为事实。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::approval::{ApprovalRequest, Decision, StaticGate};
use crate::config::{load_prompts, AppConfig, StoreKind, StoreSection};
use crate::core::{AgentError, SessionSupervisor};
use crate::llm::{create_llm_from_config, LlmClient, ProviderProfile};
use crate::memory::{Message, TrimPolicy};
use crate::react::{Agent, RunOutcome, TurnContext, TurnEvent};
use crate::session::{Checkpointer, FileCheckpointer, MemoryCheckpointer, Session, SqliteCheckpointer};
use crate::tools::{
    CalcTool, DelegateTool, FilesListTool, FilesReadTool, FilesWriteTool, SafeFs, TimeNowRiyadhTool,
    TimeNowTool, ToolExecutor, ToolRegistry, WebOpenTool, WebSearchTool,
};

/// 驱动调用的一步
enum Step<'a> {
    Start(&'a str),
    Resume {
        request_id: &'a str,
        decisions: &'a HashMap<String, Decision>,
    },
}

/// 顶层入口：监督者智能体 + 检查点 + 会话监管
pub struct Supervisor {
    agent: Arc<Agent>,
    checkpointer: Arc<dyn Checkpointer>,
    sessions: SessionSupervisor,
}

impl Supervisor {
    pub fn new(agent: Agent, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            agent: Arc::new(agent),
            checkpointer,
            sessions: SessionSupervisor::new(),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// 当前登记的会话锁数量（空闲的锁在调用结束后回收）
    pub fn tracked_sessions(&self) -> usize {
        self.sessions.tracked_locks()
    }

    /// 新的用户输入：会话不存在则创建；有未决审批时返回 AwaitingApproval
    pub async fn start_or_continue(&self, session_id: &str, user_text: &str) -> Result<RunOutcome, AgentError> {
        self.drive(session_id, Step::Start(user_text), None).await
    }

    /// 流式版本：通过 event_tx 推送 TextDelta / ToolCall / Observation / ApprovalRequired / MessageDone
    pub async fn start_or_continue_stream(
        &self,
        session_id: &str,
        user_text: &str,
        event_tx: mpsc::UnboundedSender<TurnEvent>,
    ) -> Result<RunOutcome, AgentError> {
        self.drive(session_id, Step::Start(user_text), Some(&event_tx)).await
    }

    /// 提交对未决审批的决定（按 tool call id 索引），然后继续运行
    pub async fn submit_decisions(
        &self,
        session_id: &str,
        request_id: &str,
        decisions: HashMap<String, Decision>,
    ) -> Result<RunOutcome, AgentError> {
        let step = Step::Resume {
            request_id,
            decisions: &decisions,
        };
        self.drive(session_id, step, None).await
    }

    pub async fn submit_decisions_stream(
        &self,
        session_id: &str,
        request_id: &str,
        decisions: HashMap<String, Decision>,
        event_tx: mpsc::UnboundedSender<TurnEvent>,
    ) -> Result<RunOutcome, AgentError> {
        let step = Step::Resume {
            request_id,
            decisions: &decisions,
        };
        self.drive(session_id, step, Some(&event_tx)).await
    }

    /// 会话当前的未决审批（无会话或无审批时为 None）
    pub async fn pending_approval(&self, session_id: &str) -> Result<Option<ApprovalRequest>, AgentError> {
        let session = self.checkpointer.load(session_id).await?;
        Ok(session.and_then(|s| self.agent.describe_pending(&s)))
    }

    /// 已保存的消息历史
    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>, AgentError> {
        let session = self.checkpointer.load(session_id).await?;
        Ok(session.map(|s| s.messages.snapshot()).unwrap_or_default())
    }

    pub async fn sessions(&self) -> Result<Vec<String>, AgentError> {
        Ok(self.checkpointer.list().await?)
    }

    /// 取消会话正在运行的调用；会话处于挂起状态时什么也不做
    pub fn cancel(&self, session_id: &str) -> bool {
        let cancelled = self.sessions.cancel(session_id);
        tracing::info!(session_id = %session_id, cancelled, "cancel requested");
        cancelled
    }

    async fn drive(
        &self,
        session_id: &str,
        step: Step<'_>,
        event_tx: Option<&mpsc::UnboundedSender<TurnEvent>>,
    ) -> Result<RunOutcome, AgentError> {
        let lock = self.sessions.lock_for(session_id);
        let result = {
            let _guard = lock.lock().await;
            let token = self.sessions.begin(session_id);

            let mut ctx = TurnContext::new(token).with_checkpointer(self.checkpointer.as_ref());
            if let Some(tx) = event_tx {
                ctx = ctx.with_event_tx(tx);
            }
            let result = self.drive_locked(session_id, step, &ctx).await;
            self.sessions.finish(session_id);
            result
        };
        drop(lock);
        self.sessions.release(session_id);
        result
    }

    async fn drive_locked(
        &self,
        session_id: &str,
        step: Step<'_>,
        ctx: &TurnContext<'_>,
    ) -> Result<RunOutcome, AgentError> {
        let loaded = self.checkpointer.load(session_id).await?;
        match step {
            Step::Start(text) => {
                let mut session = loaded.unwrap_or_else(|| {
                    tracing::info!(session_id = %session_id, "new session");
                    Session::new(session_id)
                });
                self.agent.start(&mut session, text, ctx).await
            }
            Step::Resume {
                request_id,
                decisions,
            } => {
                let mut session = loaded.ok_or_else(|| AgentError::NoPendingApproval(session_id.to_string()))?;
                self.agent.resume(&mut session, request_id, decisions, ctx).await
            }
        }
    }
}

/// 按 [app.store] 创建检查点
pub fn create_checkpointer(store: &StoreSection) -> Result<Arc<dyn Checkpointer>, AgentError> {
    let cp: Arc<dyn Checkpointer> = match store.kind {
        StoreKind::Memory => Arc::new(MemoryCheckpointer::new()),
        StoreKind::File => {
            let dir = store.path.clone().unwrap_or_else(|| PathBuf::from("sessions"));
            Arc::new(FileCheckpointer::new(dir)?)
        }
        StoreKind::Sqlite => {
            let path = store.path.clone().unwrap_or_else(|| PathBuf::from("sessions.db"));
            Arc::new(SqliteCheckpointer::open(&path)?)
        }
    };
    Ok(cp)
}

/// 按配置构建监督者（后端与检查点也由配置决定）
pub fn build_supervisor(cfg: &AppConfig) -> Result<Supervisor, AgentError> {
    let llm = create_llm_from_config(cfg)?;
    let checkpointer = create_checkpointer(&cfg.app.store)?;
    build_supervisor_with(cfg, llm, checkpointer)
}

/// 以给定的后端与检查点构建监督者
pub fn build_supervisor_with(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    checkpointer: Arc<dyn Checkpointer>,
) -> Result<Supervisor, AgentError> {
    let prompts = load_prompts(&cfg.prompts).map_err(|e| AgentError::ConfigError(e.to_string()))?;
    let profile = ProviderProfile::resolve(&cfg.llm.provider);
    let trim = TrimPolicy::new(cfg.app.compact_threshold);
    let timeout = cfg.tools.tool_timeout_secs;

    let workspace = cfg
        .tools
        .workspace_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("workspace"));
    let fs = SafeFs::new(&workspace);

    let mut research_tools = ToolRegistry::new();
    let web_err = |e: crate::tools::ToolError| AgentError::ConfigError(format!("[tools.web]: {}", e));
    research_tools.register(WebSearchTool::new(&cfg.tools.web).map_err(web_err)?);
    research_tools.register(WebOpenTool::new(&cfg.tools.web).map_err(web_err)?);
    let research = Agent::new("research", prompts.research, llm.clone(), ToolExecutor::new(research_tools, timeout))
        .with_profile(profile)
        .with_trim_policy(trim)
        .with_max_turns(cfg.app.max_turns);

    let mut ops_tools = ToolRegistry::new();
    ops_tools.register(FilesListTool::new(fs.clone()));
    ops_tools.register(FilesReadTool::new(fs.clone()));
    ops_tools.register(FilesWriteTool::new(fs));
    let ops = Agent::new("ops", prompts.ops, llm.clone(), ToolExecutor::new(ops_tools, timeout))
        .with_profile(profile)
        .with_trim_policy(trim)
        .with_max_turns(cfg.app.max_turns);

    let mut tools = ToolRegistry::new();
    tools.register(CalcTool);
    tools.register(TimeNowTool);
    tools.register(TimeNowRiyadhTool);
    tools.register(DelegateTool::new(
        "research_web",
        "Delegate a web research task to the research specialist. Args: {\"task\": \"what to find out\"}",
        Arc::new(research),
    ));
    tools.register(DelegateTool::new(
        "ops_files",
        "Delegate a workspace file task (list, read, write) to the file operations specialist. \
         Args: {\"task\": \"what to do\"}",
        Arc::new(ops),
    ));
    tracing::info!(
        provider = %cfg.llm.provider,
        tools = ?tools.tool_names(),
        workspace = %workspace.display(),
        "supervisor built"
    );

    // 委派工具的整体超时要覆盖 Worker 的多轮运行
    let delegate_timeout = timeout.saturating_mul(cfg.app.max_turns.max(1) as u64);
    let supervisor = Agent::new("supervisor", prompts.supervisor, llm, ToolExecutor::new(tools, delegate_timeout))
        .with_gate(Arc::new(StaticGate::from_config(&cfg.approval)))
        .with_profile(profile)
        .with_trim_policy(trim)
        .with_max_turns(cfg.app.max_turns);

    Ok(Supervisor::new(supervisor, checkpointer))
}
