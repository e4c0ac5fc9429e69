//! 审批门：哪些工具需要人工审批、允许哪些决定、如何向人描述待执行的动作
//!
//! 以策略对象的形式在构建智能体时注入（StaticGate 按配置，AutoApprove 用于 Worker）。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::ApprovalSection;
use crate::memory::ToolCallRequest;

/// 决定种类（用于允许列表）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Edit,
    Reject,
}

impl DecisionKind {
    pub const ALL: [DecisionKind; 3] = [DecisionKind::Approve, DecisionKind::Edit, DecisionKind::Reject];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Approve => "approve",
            DecisionKind::Edit => "edit",
            DecisionKind::Reject => "reject",
        }
    }
}

/// 审批策略
pub trait ApprovalGate: Send + Sync {
    /// 该工具调用前是否需要人工审批
    fn should_gate(&self, tool_name: &str) -> bool;

    /// 该工具允许的决定
    fn allowed_decisions(&self, _tool_name: &str) -> Vec<DecisionKind> {
        DecisionKind::ALL.to_vec()
    }

    /// 展示给人的动作描述
    fn describe(&self, call: &ToolCallRequest) -> String {
        let args = serde_json::to_string_pretty(&call.args).unwrap_or_else(|_| "{}".to_string());
        format!("Tool execution requires approval\n\nTool: {}\nArgs: {}", call.name, args)
    }
}

/// 静态策略：工具名 -> 允许的决定
#[derive(Debug, Clone, Default)]
pub struct StaticGate {
    gated: HashMap<String, Vec<DecisionKind>>,
}

impl StaticGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(mut self, tool_name: impl Into<String>, allowed: &[DecisionKind]) -> Self {
        self.gated.insert(tool_name.into(), allowed.to_vec());
        self
    }

    pub fn from_config(section: &ApprovalSection) -> Self {
        let gated = section
            .gated
            .iter()
            .map(|(name, allowed)| {
                let mut kinds = Vec::new();
                if allowed.approve {
                    kinds.push(DecisionKind::Approve);
                }
                if allowed.edit {
                    kinds.push(DecisionKind::Edit);
                }
                if allowed.reject {
                    kinds.push(DecisionKind::Reject);
                }
                (name.clone(), kinds)
            })
            .collect();
        Self { gated }
    }
}

impl ApprovalGate for StaticGate {
    fn should_gate(&self, tool_name: &str) -> bool {
        self.gated.contains_key(tool_name)
    }

    fn allowed_decisions(&self, tool_name: &str) -> Vec<DecisionKind> {
        self.gated
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| DecisionKind::ALL.to_vec())
    }
}

/// 不拦截任何工具（Worker 在委派边界之内运行，审批发生在监督者一侧）
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ApprovalGate for AutoApprove {
    fn should_gate(&self, _tool_name: &str) -> bool {
        false
    }
}
