//! 执行层：内容规范化、轮次执行器与运行循环、过程事件

pub mod events;
pub mod loop_;
pub mod normalizer;

pub use events::TurnEvent;
pub use loop_::{tool_error_payload, Agent, RunOutcome, TurnContext, TurnOutcome};
pub use normalizer::{find_duplicate_id, flatten_to_text, normalize, normalize_with, Normalized, NormalizerVariant};
