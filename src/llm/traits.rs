//! 生成后端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mistral / Mock）实现 LlmClient：
//! 给定消息历史与工具目录，返回一个惰性、有限、每轮可重新开始的增量流。
//! 重试策略属于具体后端适配器，核心不做自动重试。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use thiserror::Error;

use crate::llm::Delta;
use crate::memory::Message;
use crate::tools::ToolSpec;

/// 后端失败（传输、鉴权、限流、输出无法解析）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited (retry after {retry_after_ms} ms)")]
    RateLimited { retry_after_ms: u64 },

    #[error("Request timed out")]
    Timeout,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 增量流
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta, LlmError>> + Send>>;

/// 生成后端
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 后端标识（用于选择 ProviderProfile 与日志）
    fn provider(&self) -> &str;

    /// 发送历史与工具目录，返回增量流
    async fn generate(&self, history: &[Message], tools: &[ToolSpec]) -> Result<DeltaStream, LlmError>;
}
