//! Mock 后端（用于测试与离线运行，无需 API）
//!
//! 按脚本回放：每次 generate 弹出一组增量；脚本用完后回显最后一条 User 消息。
//! 记录每次收到的历史，便于断言「下一轮草拟时历史里包含了拒绝信息」之类的行为。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use crate::llm::{Delta, DeltaStream, LlmClient, LlmError, Segment};
use crate::memory::{Message, Role};
use crate::tools::ToolSpec;

/// 单次草拟的脚本：若干增量，或一个后端错误
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Deltas(Vec<Delta>),
    Fail(LlmError),
}

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<ScriptedReply>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次回复（增量序列）
    pub fn push_reply(&self, deltas: Vec<Delta>) -> &Self {
        self.lock_script().push_back(ScriptedReply::Deltas(deltas));
        self
    }

    /// 追加一次纯文本回复
    pub fn push_text(&self, text: &str) -> &Self {
        self.push_reply(vec![Delta::text(text)])
    }

    /// 追加一次只含工具调用的回复
    pub fn push_tool_call(&self, id: &str, name: &str, args: serde_json::Value) -> &Self {
        self.push_reply(vec![Delta::Segment(Segment::tool_call(id, name, args))])
    }

    /// 追加一次后端失败
    pub fn push_failure(&self, err: LlmError) -> &Self {
        self.lock_script().push_back(ScriptedReply::Fail(err));
        self
    }

    /// 每次 generate 收到的历史
    pub fn seen_histories(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.lock_script().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<ScriptedReply>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn generate(&self, history: &[Message], _tools: &[ToolSpec]) -> Result<DeltaStream, LlmError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(history.to_vec());
        }
        let next = self.lock_script().pop_front();
        let deltas = match next {
            Some(ScriptedReply::Deltas(d)) => d,
            Some(ScriptedReply::Fail(e)) => return Err(e),
            None => {
                let last_user = history
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                vec![Delta::text(format!("Echo from Mock: {last_user}"))]
            }
        };
        Ok(Box::pin(stream::iter(deltas.into_iter().map(Ok))))
    }
}
