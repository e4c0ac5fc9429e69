//! 编排引擎错误类型
//!
//! 按层划分：后端失败（LlmError）整轮上抛、不在核心内重试；工具失败不会出现在这里（折叠进对话历史）；
//! 协议违规（ProtocolViolation）同步拒绝且不修改状态；持久化失败（CheckpointError）对当前调用致命。

use thiserror::Error;

use crate::llm::LlmError;
use crate::session::CheckpointError;

/// 驱动层调用可能得到的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Backend failure: {0}")]
    Backend(#[from] LlmError),

    /// 后端输出无法规范化（如同一轮内重复的 tool call id）
    #[error("Malformed backend output: {0}")]
    MalformedOutput(String),

    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] CheckpointError),

    /// 会话有未决审批，拒绝新的用户输入
    #[error("Session {session_id} is awaiting approval {request_id}")]
    AwaitingApproval {
        session_id: String,
        request_id: String,
    },

    #[error("Session {0} has no pending approval")]
    NoPendingApproval(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// 审批协议 / 消息图违规；在任何状态修改之前检出
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("unknown approval request {0}")]
    UnknownRequest(String),

    #[error("missing decision for action {0}")]
    MissingDecision(String),

    #[error("decision for unknown action {0}")]
    UnknownAction(String),

    #[error("decision '{decision}' not allowed for tool {tool}")]
    DecisionNotAllowed { tool: String, decision: String },

    #[error("edit targets unknown tool {0}")]
    UnknownEditTarget(String),

    #[error("tool message at index {index} has no tool_call_id")]
    MissingToolCallId { index: usize },

    #[error("tool message references unknown tool call {0}")]
    DanglingToolCallId(String),

    #[error("pending approval does not match unanswered tool calls")]
    PendingMismatch,
}
