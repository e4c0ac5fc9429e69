//! 挂起/恢复协议的数据：未决审批批次、人工决定、展示给驱动层的审批请求
//!
//! 一轮内所有受审批调用合成一个批次；恢复时必须为批次中每个动作给出恰好一个决定，
//! 校验在任何状态修改之前完成。

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::approval::{ApprovalGate, DecisionKind};
use crate::core::ProtocolViolation;
use crate::memory::ToolCallRequest;

/// 未决审批：阻塞会话的后续所有轮次，直到整批解决
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub request_id: String,
    pub action_requests: Vec<ToolCallRequest>,
    pub created_at: DateTime<Utc>,
}

impl PendingApproval {
    pub fn new(action_requests: Vec<ToolCallRequest>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            action_requests,
            created_at: Utc::now(),
        }
    }

    pub fn action_ids(&self) -> HashSet<&str> {
        self.action_requests.iter().map(|a| a.id.as_str()).collect()
    }
}

/// 人对单个动作的决定（按 tool call id 索引）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// 以新的工具名/参数替代原调用；结果仍记在原 tool call id 下
    Edit {
        #[serde(alias = "new_name")]
        name: String,
        #[serde(alias = "new_args", default)]
        args: Map<String, Value>,
    },
}

impl Decision {
    pub fn reject(reason: impl Into<String>) -> Self {
        Decision::Reject {
            reason: Some(reason.into()),
        }
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Approve => DecisionKind::Approve,
            Decision::Reject { .. } => DecisionKind::Reject,
            Decision::Edit { .. } => DecisionKind::Edit,
        }
    }
}

/// 单个待审批动作的展示信息
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionDescription {
    pub tool_call_id: String,
    pub name: String,
    pub args: Map<String, Value>,
    pub description: String,
    pub allowed_decisions: Vec<DecisionKind>,
}

/// 挂起时返回给驱动层的审批请求
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApprovalRequest {
    pub session_id: String,
    pub request_id: String,
    pub actions: Vec<ActionDescription>,
}

impl ApprovalRequest {
    pub fn from_pending(session_id: &str, pending: &PendingApproval, gate: &dyn ApprovalGate) -> Self {
        let actions = pending
            .action_requests
            .iter()
            .map(|call| ActionDescription {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                args: call.args.clone(),
                description: gate.describe(call),
                allowed_decisions: gate.allowed_decisions(&call.name),
            })
            .collect();
        Self {
            session_id: session_id.to_string(),
            request_id: pending.request_id.clone(),
            actions,
        }
    }
}

/// 校验一组决定：请求 id 匹配、恰好覆盖每个动作、决定种类被允许、编辑目标是已知工具
pub fn validate_decisions(
    pending: &PendingApproval,
    request_id: &str,
    decisions: &HashMap<String, Decision>,
    gate: &dyn ApprovalGate,
    is_known_tool: impl Fn(&str) -> bool,
) -> Result<(), ProtocolViolation> {
    if pending.request_id != request_id {
        return Err(ProtocolViolation::UnknownRequest(request_id.to_string()));
    }
    let ids = pending.action_ids();
    let mut extra: Vec<&String> = decisions.keys().filter(|k| !ids.contains(k.as_str())).collect();
    extra.sort();
    if let Some(id) = extra.first() {
        return Err(ProtocolViolation::UnknownAction((*id).clone()));
    }
    for action in &pending.action_requests {
        let decision = decisions
            .get(&action.id)
            .ok_or_else(|| ProtocolViolation::MissingDecision(action.id.clone()))?;
        let kind = decision.kind();
        if !gate.allowed_decisions(&action.name).contains(&kind) {
            return Err(ProtocolViolation::DecisionNotAllowed {
                tool: action.name.clone(),
                decision: kind.as_str().to_string(),
            });
        }
        if let Decision::Edit { name, .. } = decision {
            if !is_known_tool(name) {
                return Err(ProtocolViolation::UnknownEditTarget(name.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::StaticGate;

    fn pending() -> PendingApproval {
        PendingApproval::new(vec![
            ToolCallRequest::new("c1", "files_write", Map::new()),
            ToolCallRequest::new("c2", "ops_files", Map::new()),
        ])
    }

    fn gate() -> StaticGate {
        StaticGate::new()
            .gate("files_write", &DecisionKind::ALL)
            .gate("ops_files", &[DecisionKind::Approve, DecisionKind::Reject])
    }

    fn known(name: &str) -> bool {
        matches!(name, "files_write" | "ops_files")
    }

    #[test]
    fn test_full_decision_set_is_valid() {
        let p = pending();
        let decisions = HashMap::from([
            ("c1".to_string(), Decision::Approve),
            ("c2".to_string(), Decision::reject("not now")),
        ]);
        assert_eq!(validate_decisions(&p, &p.request_id, &decisions, &gate(), known), Ok(()));
    }

    #[test]
    fn test_partial_decision_set_rejected() {
        let p = pending();
        let decisions = HashMap::from([("c1".to_string(), Decision::Approve)]);
        assert_eq!(
            validate_decisions(&p, &p.request_id, &decisions, &gate(), known),
            Err(ProtocolViolation::MissingDecision("c2".into()))
        );
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let p = pending();
        let decisions = HashMap::from([
            ("c1".to_string(), Decision::Approve),
            ("c2".to_string(), Decision::Approve),
            ("zz".to_string(), Decision::Approve),
        ]);
        assert_eq!(
            validate_decisions(&p, &p.request_id, &decisions, &gate(), known),
            Err(ProtocolViolation::UnknownAction("zz".into()))
        );
        assert_eq!(
            validate_decisions(&p, "other", &HashMap::new(), &gate(), known),
            Err(ProtocolViolation::UnknownRequest("other".into()))
        );
    }

    #[test]
    fn test_disallowed_decision_and_edit_target() {
        let p = pending();
        let edit_ops = HashMap::from([
            ("c1".to_string(), Decision::Approve),
            (
                "c2".to_string(),
                Decision::Edit {
                    name: "ops_files".into(),
                    args: Map::new(),
                },
            ),
        ]);
        assert!(matches!(
            validate_decisions(&p, &p.request_id, &edit_ops, &gate(), known),
            Err(ProtocolViolation::DecisionNotAllowed { .. })
        ));

        let edit_unknown = HashMap::from([
            (
                "c1".to_string(),
                Decision::Edit {
                    name: "rm_rf".into(),
                    args: Map::new(),
                },
            ),
            ("c2".to_string(), Decision::Approve),
        ]);
        assert_eq!(
            validate_decisions(&p, &p.request_id, &edit_unknown, &gate(), known),
            Err(ProtocolViolation::UnknownEditTarget("rm_rf".into()))
        );
    }

    #[test]
    fn test_decision_serde_accepts_new_name_alias() {
        let d: Decision =
            serde_json::from_str(r#"{"type":"edit","new_name":"ops_files","new_args":{"path":"x.txt"}}"#).unwrap();
        assert_eq!(d.kind(), DecisionKind::Edit);
        let r: Decision = serde_json::from_str(r#"{"type":"reject"}"#).unwrap();
        assert_eq!(r, Decision::Reject { reason: None });
    }
}
