//! 会话历史：按角色标记的消息日志
//!
//! 只追加；唯一的破坏性操作是整段压缩（compact），保留首条消息（会话前言）与最近的偶数长度尾部。
//! tool 消息必须引用此前某条 assistant 消息里的 tool call id（引用完整性）。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ProtocolViolation;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// assistant 发出的单个工具调用请求；id 在一轮内唯一
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// 参数以 JSON 值的形式返回（交给 ToolRegistry）
    pub fn args_value(&self) -> Value {
        Value::Object(self.args.clone())
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// 带工具调用的 assistant 消息
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// 回答某个 tool call 的 tool 消息
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// 压缩策略：消息数超过 threshold 时，保留首条 + 最近的偶数长度尾部
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrimPolicy {
    pub threshold: usize,
}

impl TrimPolicy {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// 尾部长度：不超过阈值的最大偶数（至少 2）
    pub fn tail_len(&self) -> usize {
        (self.threshold & !1).max(2)
    }
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self::new(8)
    }
}

/// 会话消息存储
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 当前历史的拷贝（草拟时发给后端）
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// 按策略压缩，返回被丢弃的消息条数。
    ///
    /// 切点落在 tool 消息上时（其 assistant 会被丢掉），切点每次前移 2 条，
    /// 尾部保持偶数长度且不留下孤立的 tool 消息。
    pub fn compact(&mut self, policy: &TrimPolicy) -> usize {
        let len = self.messages.len();
        if len <= policy.threshold || len < 2 {
            return 0;
        }
        let mut cut = len.saturating_sub(policy.tail_len()).max(1);
        while cut > 1 && self.messages[cut].role == Role::Tool {
            cut = cut.saturating_sub(2).max(1);
        }
        if cut <= 1 {
            return 0;
        }
        self.messages.drain(1..cut).count()
    }

    /// 引用完整性：每条 tool 消息的 tool_call_id 必须出现在它之前最近一条 assistant 的 tool_calls 中
    ///
    /// id 只要求在一轮内唯一，所以按 assistant 分段匹配，不跨轮查找。
    pub fn check_integrity(&self) -> Result<(), ProtocolViolation> {
        let mut current: HashSet<&str> = HashSet::new();
        for (index, msg) in self.messages.iter().enumerate() {
            match msg.role {
                Role::Assistant => {
                    current = msg.tool_calls.iter().map(|c| c.id.as_str()).collect();
                }
                Role::Tool => {
                    let id = msg
                        .tool_call_id
                        .as_deref()
                        .ok_or(ProtocolViolation::MissingToolCallId { index })?;
                    if !current.contains(id) {
                        return Err(ProtocolViolation::DanglingToolCallId(id.to_string()));
                    }
                }
                Role::System | Role::User => {}
            }
        }
        Ok(())
    }

    /// 尚无 tool 消息回答的工具调用（按出现顺序）
    ///
    /// 每条 assistant 的调用只与其后、下一条 assistant 之前的 tool 消息匹配。
    pub fn unanswered_tool_calls(&self) -> Vec<&ToolCallRequest> {
        let mut out = Vec::new();
        for (i, msg) in self.messages.iter().enumerate() {
            if msg.role != Role::Assistant || msg.tool_calls.is_empty() {
                continue;
            }
            let answered: HashSet<&str> = self.messages[i + 1..]
                .iter()
                .take_while(|m| m.role != Role::Assistant)
                .filter(|m| m.role == Role::Tool)
                .filter_map(|m| m.tool_call_id.as_deref())
                .collect();
            out.extend(msg.tool_calls.iter().filter(|c| !answered.contains(c.id.as_str())));
        }
        out
    }
}
