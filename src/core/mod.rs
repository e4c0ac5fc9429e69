//! 核心层：错误类型与会话监管（串行锁、取消）

pub mod error;
pub mod session_supervisor;

pub use error::{AgentError, ProtocolViolation};
pub use session_supervisor::{KeyedLocks, SessionSupervisor};
