//! 后端层：输出形态、客户端抽象、策略表与实现（OpenAI 兼容 / Mock）

pub mod content;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod traits;

pub use content::{Delta, DraftAccumulator, RawOutput, Segment};
pub use mock::{MockLlmClient, ScriptedReply};
pub use openai::OpenAiCompatClient;
pub use provider::{create_llm_from_config, ProviderProfile, ToolResultFormat};
pub use traits::{DeltaStream, LlmClient, LlmError};
