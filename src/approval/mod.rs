//! 审批层：审批策略、挂起/恢复协议数据与校验、人工输入解析

pub mod gate;
pub mod parse;
pub mod pending;

pub use gate::{ApprovalGate, AutoApprove, DecisionKind, StaticGate};
pub use parse::{edit_template, parse_decision, ParsedInput};
pub use pending::{validate_decisions, ActionDescription, ApprovalRequest, Decision, PendingApproval};
