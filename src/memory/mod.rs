//! 记忆层：会话消息日志与压缩策略

pub mod conversation;

pub use conversation::{ConversationStore, Message, Role, ToolCallRequest, TrimPolicy};
