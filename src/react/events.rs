//! 运行过程事件：流式展示草拟增量、工具调用、观察、审批请求与最终回复

use serde::Serialize;

use crate::approval::ApprovalRequest;

/// 单个事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// 开始第几轮草拟
    TurnStarted { turn: usize, max_turns: usize },
    /// 草拟中的文本增量（尚未写入历史）
    TextDelta { text: String },
    /// 推理增量
    ReasoningDelta { text: String },
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览）
    Observation { tool: String, preview: String },
    ToolFailure { tool: String, reason: String },
    /// 运行挂起，等待人工决定
    ApprovalRequired { request: ApprovalRequest },
    /// 本次运行的最终回复
    MessageDone { text: String },
    /// 草拟前压缩了历史
    Compacted { removed: usize },
    Error { text: String },
}
