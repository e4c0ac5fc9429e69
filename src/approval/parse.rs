//! 人工输入 -> Decision
//!
//! approve|yes|y|ok；reject [理由]|no|n；edit <tool> <json> 或 edit <json>（保留原工具名）。
//! 无法解析的输入按配置处理：视为拒绝（原文作为理由），或要求重新输入。

use serde_json::Value;

use crate::approval::Decision;
use crate::config::UnparsableInput;
use crate::memory::ToolCallRequest;

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInput {
    Decided(Decision),
    /// 需要重新输入，附带提示
    Reprompt(String),
}

fn parse_edit(rest: &str, action: &ToolCallRequest) -> Option<Decision> {
    let rest = rest.trim();
    let (name, json) = if rest.starts_with('{') {
        (action.name.clone(), rest)
    } else {
        let (name, json) = rest.split_once(char::is_whitespace)?;
        (name.to_string(), json.trim())
    };
    match serde_json::from_str::<Value>(json).ok()? {
        Value::Object(args) => Some(Decision::Edit { name, args }),
        _ => None,
    }
}

fn parse_strict(input: &str, action: &ToolCallRequest) -> Option<Decision> {
    let trimmed = input.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (trimmed, ""),
    };
    match head.to_lowercase().as_str() {
        "approve" | "yes" | "y" | "ok" => Some(Decision::Approve),
        "reject" | "no" | "n" => Some(Decision::Reject {
            reason: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        "edit" => parse_edit(rest, action),
        _ => None,
    }
}

/// 解析单个动作的人工输入
pub fn parse_decision(input: &str, action: &ToolCallRequest, policy: UnparsableInput) -> ParsedInput {
    if let Some(decision) = parse_strict(input, action) {
        return ParsedInput::Decided(decision);
    }
    match policy {
        UnparsableInput::Reject => {
            let raw = input.trim();
            let reason = if raw.is_empty() {
                "no decision given".to_string()
            } else {
                raw.to_string()
            };
            ParsedInput::Decided(Decision::reject(reason))
        }
        UnparsableInput::Reprompt => ParsedInput::Reprompt(
            "Please answer approve | reject [reason] | edit [tool] {json args}".to_string(),
        ),
    }
}

/// 编辑模板：原参数的 JSON，便于驱动层展示
pub fn edit_template(action: &ToolCallRequest) -> String {
    Value::Object(action.args.clone()).to_string()
}
