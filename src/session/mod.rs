//! 会话状态与检查点
//!
//! Session = 消息日志 + 至多一个未决审批；检查点每次保存整份文档，消息与审批不会出现分歧。

pub mod checkpoint;
pub mod file;
pub mod sqlite;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approval::PendingApproval;
use crate::core::ProtocolViolation;
use crate::memory::ConversationStore;

pub use checkpoint::{CheckpointError, Checkpointer, MemoryCheckpointer};
pub use file::FileCheckpointer;
pub use sqlite::SqliteCheckpointer;

/// 单个会话的持久状态
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub messages: ConversationStore,
    #[serde(default)]
    pub pending: Option<PendingApproval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: ConversationStore::new(),
            pending: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// 引用完整性 + 未决审批恰好对应尚未回答的工具调用
    pub fn validate(&self) -> Result<(), ProtocolViolation> {
        self.messages.check_integrity()?;
        let unanswered: HashSet<&str> = self
            .messages
            .unanswered_tool_calls()
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        let pending: HashSet<&str> = self
            .pending
            .as_ref()
            .map(|p| p.action_ids())
            .unwrap_or_default();
        if unanswered != pending {
            return Err(ProtocolViolation::PendingMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Message, ToolCallRequest};
    use serde_json::Map;

    #[test]
    fn test_validate_pending_must_match_unanswered() {
        let call = ToolCallRequest::new("c1", "files_write", Map::new());
        let mut s = Session::new("s1");
        s.messages.append(Message::system("sys"));
        s.messages.append(Message::assistant_with_calls("", vec![call.clone()]));
        assert_eq!(s.validate(), Err(ProtocolViolation::PendingMismatch));

        s.pending = Some(PendingApproval::new(vec![call]));
        assert_eq!(s.validate(), Ok(()));

        s.messages.append(Message::tool("c1", "done"));
        assert_eq!(s.validate(), Err(ProtocolViolation::PendingMismatch));
        s.pending = None;
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn test_session_serde_roundtrip_keeps_pending() {
        let mut s = Session::new("s1");
        s.pending = Some(PendingApproval::new(vec![ToolCallRequest::new("c1", "x", Map::new())]));
        let json = serde_json::to_string(&s).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
