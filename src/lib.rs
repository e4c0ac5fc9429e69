//! Hive - Rust 多智能体工具编排引擎
//!
//! 模块划分：
//! - **agent**: 监督者构建与驱动层 API（start_or_continue / submit_decisions / 流式版本）
//! - **approval**: 审批策略、挂起/恢复协议、人工输入解析
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话串行化与取消
//! - **llm**: 后端抽象、输出形态、策略表与实现（OpenAI 兼容 / Mock）
//! - **memory**: 会话消息日志与压缩策略
//! - **observability**: 日志初始化
//! - **react**: 内容规范化、轮次执行器与运行循环
//! - **session**: 会话状态与检查点（内存 / 文件 / SQLite）
//! - **tools**: 工具注册表、执行器、内置工具与委派

pub mod agent;
pub mod approval;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod session;
pub mod tools;

pub use agent::{build_supervisor, build_supervisor_with, create_checkpointer, Supervisor};
pub use core::AgentError;
pub use react::{Agent, RunOutcome, TurnEvent};
